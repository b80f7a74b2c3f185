//! # Tradepost Database Layer
//!
//! SQLite persistence for Tradepost: the transactional engines (sale
//! builder, payment reconciler), the product catalog with its stock
//! ledger, and the reporting aggregations.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          tradepost-db                               │
//! │                                                                     │
//! │  ┌──────────┐    ┌──────────────────────────────────────────┐       │
//! │  │ Database │───►│ repositories                             │       │
//! │  │ (pool)   │    │  products   catalog + stock ledger       │       │
//! │  └────┬─────┘    │  sales      sale builder + queries       │       │
//! │       │          │  payments   payment reconciler           │       │
//! │       ▼          │  reports    read-only aggregations       │       │
//! │  migrations      └──────────────────────────────────────────┘       │
//! │  (embedded)                        │                                │
//! │                                    ▼                                │
//! │                       tradepost-core (pure rules:                   │
//! │                       derive_status, policy, validation)            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use tradepost_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./tradepost.db")).await?;
//! let sale = db.sales().create_sale(&principal, request).await?;
//! let (payment, updated) = db.payments().apply_payment(&admin, pay).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types at crate root
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{
    InventoryFilter, PaymentFilter, PaymentRepository, ProductFilter, ProductRepository,
    ReportFilter, ReportRepository, SaleDetailsUpdate, SaleFilter, SaleRepository,
};
pub use repository::report::{
    ComprehensiveReport, DashboardStats, InventoryReport, PaymentSummary, SalesReport,
};
