//! # Repository Module
//!
//! Database access organized by aggregate.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Repository Layout                               │
//! │                                                                     │
//! │  Database (pool.rs)                                                 │
//! │  ├── products()  → ProductRepository   catalog + stock ledger       │
//! │  ├── sales()     → SaleRepository      sale builder + queries       │
//! │  ├── payments()  → PaymentRepository   payment reconciler           │
//! │  └── reports()   → ReportRepository    read-only aggregations       │
//! │                                                                     │
//! │  The sale builder and payment reconciler are the only write paths   │
//! │  that touch money or stock; each runs as a single transaction.      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

pub mod payment;
pub mod product;
pub mod report;
pub mod sale;

pub use payment::{PaymentFilter, PaymentRepository};
pub use product::{ProductFilter, ProductRepository};
pub use report::{InventoryFilter, ReportFilter, ReportRepository};
pub use sale::{SaleDetailsUpdate, SaleFilter, SaleRepository};
