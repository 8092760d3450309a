//! # Repository Module
//!
//! Database repository implementations for Shelfwise.
//!
//! ## Two Kinds of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Reads outside a transaction         Writes inside a transaction        │
//! │  ───────────────────────────         ──────────────────────────         │
//! │  db.catalog().products()             let mut tx = db.begin().await?;    │
//! │  db.aggregates().get(s, p)           batch::consume_warehouse_batch(    │
//! │  db.reports().invoice_stats(..)          &mut tx, id, qty).await?;      │
//! │       │                              aggregate::refresh(&mut tx, ..)    │
//! │       ▼                              tx.commit().await?;                │
//! │  Repository struct (holds pool)            │                            │
//! │                                            ▼                            │
//! │                              free functions taking &mut SqliteConnection│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function that mutates batches takes the caller's connection, so
//! an executor composes several of them into one all-or-nothing unit.
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Master data and shelf layouts
//! - [`batch::BatchRepository`] - Warehouse and shelf batches
//! - [`aggregate::AggregateRepository`] - Shelf aggregates and their refresh
//! - [`sequence::SequenceRepository`] - Durable document number sequences
//! - [`order::OrderRepository`] - Purchase orders
//! - [`transfer::TransferRepository`] - Stock transfers
//! - [`invoice::InvoiceRepository`] - Sales invoices
//! - [`customer::CustomerRepository`] - Loyalty members
//! - [`discount::DiscountRuleRepository`] - Markdown rules
//! - [`report::ReportRepository`] - Run summary queries
//! - [`maintenance::MaintenanceRepository`] - Clearing simulation data

pub mod aggregate;
pub mod batch;
pub mod catalog;
pub mod customer;
pub mod discount;
pub mod invoice;
pub mod maintenance;
pub mod order;
pub mod report;
pub mod sequence;
pub mod transfer;
