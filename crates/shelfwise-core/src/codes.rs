//! # Document Codes
//!
//! Formatting and parsing for human-readable document numbers.
//!
//! | Series   | Format                  | Example            |
//! |----------|-------------------------|--------------------|
//! | Order    | `PO{YYYYMM}{seq:03}`    | `PO202509007`      |
//! | Transfer | `ST{YYYYMM}{seq:04}`    | `ST2025090042`     |
//! | Invoice  | `INV{YYYYMM}{seq:04}`   | `INV2025091234`    |
//! | Batch    | `BATCH{YYYYMMDD}{pid:04}` | `BATCH202509010017` |
//!
//! The sequence itself lives in the database (`code_sequences`); this module
//! only knows how codes look.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A numbered document series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeSeries {
    Order,
    Transfer,
    Invoice,
}

impl CodeSeries {
    pub const ALL: [CodeSeries; 3] = [CodeSeries::Order, CodeSeries::Transfer, CodeSeries::Invoice];

    pub fn prefix(&self) -> &'static str {
        match self {
            CodeSeries::Order => "PO",
            CodeSeries::Transfer => "ST",
            CodeSeries::Invoice => "INV",
        }
    }

    /// Minimum zero-padded width of the sequence part.
    pub fn width(&self) -> usize {
        match self {
            CodeSeries::Order => 3,
            CodeSeries::Transfer | CodeSeries::Invoice => 4,
        }
    }

    /// Key under which the series is stored.
    pub fn key(&self) -> &'static str {
        match self {
            CodeSeries::Order => "order",
            CodeSeries::Transfer => "transfer",
            CodeSeries::Invoice => "invoice",
        }
    }

    /// `<PREFIX><YYYYMM><sequence>`.
    pub fn format(&self, date: NaiveDate, sequence: i64) -> String {
        format!(
            "{}{:04}{:02}{:0width$}",
            self.prefix(),
            date.year(),
            date.month(),
            sequence,
            width = self.width()
        )
    }

    /// Recovers the sequence from a persisted code, or `None` if the code
    /// does not belong to this series.
    ///
    /// Everything after the prefix and the six date digits is the sequence,
    /// so codes that outgrew their padding still parse.
    pub fn parse_sequence(&self, code: &str) -> Option<i64> {
        let rest = code.strip_prefix(self.prefix())?;
        if rest.len() <= 6 || !rest.is_char_boundary(6) {
            return None;
        }
        let (yyyymm, seq) = rest.split_at(6);
        if !yyyymm.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        seq.parse::<i64>().ok().filter(|n| *n >= 0)
    }
}

impl std::fmt::Display for CodeSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Warehouse batch code for a product received on `date`.
///
/// `duplicate` counts earlier receipts of the same product that day; the
/// first receipt gets the bare code and later ones a `-N` suffix.
pub fn batch_code(date: NaiveDate, product_id: i64, duplicate: u32) -> String {
    let base = format!("BATCH{}{:04}", date.format("%Y%m%d"), product_id);
    if duplicate == 0 {
        base
    } else {
        format!("{base}-{duplicate}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sept() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 14).unwrap()
    }

    #[test]
    fn test_format_each_series() {
        assert_eq!(CodeSeries::Order.format(sept(), 7), "PO202509007");
        assert_eq!(CodeSeries::Transfer.format(sept(), 42), "ST2025090042");
        assert_eq!(CodeSeries::Invoice.format(sept(), 1234), "INV2025091234");
    }

    #[test]
    fn test_parse_round_trips_and_overflow() {
        assert_eq!(CodeSeries::Order.parse_sequence("PO202509007"), Some(7));
        assert_eq!(CodeSeries::Invoice.parse_sequence("INV20250912345"), Some(12345));
        assert_eq!(CodeSeries::Order.parse_sequence("PO2025091000"), Some(1000));
    }

    #[test]
    fn test_parse_rejects_foreign_codes() {
        assert_eq!(CodeSeries::Order.parse_sequence("ST2025090042"), None);
        assert_eq!(CodeSeries::Invoice.parse_sequence("INV202509"), None);
        assert_eq!(CodeSeries::Transfer.parse_sequence("STabcdef0001"), None);
        assert_eq!(CodeSeries::Transfer.parse_sequence("ST202509x1"), None);
    }

    #[test]
    fn test_batch_code() {
        assert_eq!(batch_code(sept(), 17, 0), "BATCH202509140017");
        assert_eq!(batch_code(sept(), 17, 2), "BATCH202509140017-2");
    }
}
