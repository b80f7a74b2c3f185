//! # Domain Types
//!
//! Core domain types used throughout Tradepost.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐          │
//! │  │   Product     │   │     Sale      │   │   Payment     │          │
//! │  │  ───────────  │   │  ───────────  │   │  ───────────  │          │
//! │  │  id (UUID)    │   │  id (UUID)    │   │  id (UUID)    │          │
//! │  │  sku (biz id) │   │  total        │   │  sale_id (FK) │          │
//! │  │  price        │   │  paid/balance │   │  amount       │          │
//! │  │  stock        │   │  status       │   │  status       │          │
//! │  └───────────────┘   └───────┬───────┘   └───────────────┘          │
//! │                              │ owns                                 │
//! │                      ┌───────┴───────┐                              │
//! │                      │   SaleItem    │  snapshot of product         │
//! │                      │  (sale, prod) │  at time of sale             │
//! │                      └───────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Products carry both an `id` (UUID v4, immutable, used for relations)
//! and a business identifier (`sku`, human-readable, unique).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::status::derive_status;

// =============================================================================
// Principal & Role
// =============================================================================

/// Role of an authenticated principal.
///
/// Supplied by the auth collaborator; the core never authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access: catalog management, payments, global reporting.
    Admin,
    /// Restricted visibility: sees only their own sales.
    Salesperson,
}

/// An authenticated caller, as handed over by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    /// Display name, snapshotted onto sales and payments.
    pub name: String,
    pub role: Role,
}

impl Principal {
    /// Checks if the principal has the admin role.
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// =============================================================================
// Product
// =============================================================================

/// Stock-status bucket for a product, derived from its quantity.
///
/// Thresholds: 0 is out of stock, 1-10 is low, above 10 is in stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

/// Low-stock threshold (inclusive upper bound of the low bucket).
pub const LOW_STOCK_THRESHOLD: i64 = 10;

impl StockStatus {
    /// Buckets a stock quantity.
    pub const fn from_quantity(quantity: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= LOW_STOCK_THRESHOLD {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - unique business identifier.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Optional description.
    pub description: Option<String>,

    /// Unit price; always positive.
    pub price: Money,

    /// Current stock level; never negative.
    pub stock_quantity: i64,

    /// Optional category for catalog filtering and reporting.
    pub category: Option<String>,

    /// Whether product is active (soft delete).
    ///
    /// Products are never hard-deleted because historical sale items
    /// reference them.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the stock-status bucket for this product.
    #[inline]
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::from_quantity(self.stock_quantity)
    }

    /// Checks whether `quantity` units can be sold from current stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && self.stock_quantity >= quantity
    }
}

// =============================================================================
// Payment Method & Status
// =============================================================================

/// How a sale (or individual payment) was settled.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    /// Sale on credit; settled later via recorded payments.
    Credit,
    MobileMoney,
    BankTransfer,
}

/// Payment status of a sale; always derived, never set directly by callers
/// (except through the restricted mark-fully-paid operation).
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Fully settled: paid covers the total.
    Paid,
    /// Some, but not all, of the total has been paid.
    Partial,
    /// Nothing paid yet.
    Unpaid,
}

/// Status of an individual payment record.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    /// Only completed payments count toward a sale's amount paid.
    Completed,
    Failed,
    Refunded,
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale transaction.
///
/// The triple (total, paid, balance) plus `payment_status` is kept
/// consistent by running every mutation through [`derive_status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,

    /// Salesperson who made the sale; immutable after creation.
    pub salesperson_id: String,

    /// Snapshot of the salesperson's name at time of sale.
    pub salesperson_name: String,

    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,

    /// Sum of item subtotals; at least one cent.
    pub total: Money,

    /// Accumulated completed payments (plus any initial down payment).
    pub paid: Money,

    /// Derived: `max(total - paid, 0)`.
    pub balance: Money,

    /// Primary payment method for the sale.
    pub payment_method: PaymentMethod,

    /// Derived from (total, paid); see [`derive_status`].
    pub payment_status: PaymentStatus,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Checks if the sale is fully settled.
    #[inline]
    pub fn is_fully_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Re-derives `balance` and `payment_status` from (total, paid).
    ///
    /// Call at the end of every mutating operation that touches the
    /// financial fields.
    pub fn reconcile(&mut self) {
        let (status, balance) = derive_status(self.total, self.paid);
        self.payment_status = status;
        self.balance = balance;
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
///
/// Uses the snapshot pattern to freeze product data at time of sale:
/// later edits to the product never change sale history. A product may
/// appear at most once per sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,

    /// Product name at time of sale (frozen).
    pub product_name: String,

    /// Product SKU at time of sale (frozen).
    pub product_sku: String,

    /// Quantity sold; at least 1.
    pub quantity: i64,

    /// Unit price at time of sale (frozen).
    pub price_at_sale: Money,

    /// Derived: `quantity × price_at_sale`.
    pub subtotal: Money,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment recorded against a sale.
///
/// Used for credit sales settled in installments. A completed payment
/// increases its sale's paid amount by exactly `amount`, exactly once,
/// at the moment it is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub sale_id: String,

    /// Payment amount; always positive.
    pub amount: Money,

    pub payment_method: PaymentMethod,
    pub status: PaymentState,

    /// Admin principal who recorded the payment.
    pub recorded_by_id: String,
    pub recorded_by_name: String,

    /// External reference (transaction ID, teller slip, etc.).
    pub reference: Option<String>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Operation Inputs
// =============================================================================

/// One requested line of a new sale: which product and how many.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub quantity: i64,
}

/// Input for creating a sale.
///
/// Totals are never caller-supplied; they are computed from the line
/// items against current product prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_method: PaymentMethod,
    pub line_items: Vec<LineItem>,
    /// Amount handed over up front; defaults to zero for credit sales.
    #[serde(default)]
    pub amount_paid: Money,
    pub notes: Option<String>,
}

/// Input for recording a payment against a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub sale_id: String,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
