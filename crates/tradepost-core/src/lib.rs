//! # tradepost-core: Pure Business Logic for Tradepost
//!
//! This crate is the **heart** of Tradepost, a role-gated sales and
//! inventory backend. It contains all business logic as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Tradepost Architecture                         │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │            Caller boundary (HTTP/auth, external)            │    │
//! │  │   supplies a Principal {id, name, role} per operation       │    │
//! │  └─────────────────────────────┬───────────────────────────────┘    │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼───────────────────────────────┐    │
//! │  │              ★ tradepost-core (THIS CRATE) ★                │    │
//! │  │                                                             │    │
//! │  │  ┌─────────┐ ┌────────┐ ┌────────┐ ┌────────┐ ┌──────────┐  │    │
//! │  │  │  types  │ │ money  │ │ status │ │ policy │ │validation│  │    │
//! │  │  │ Product │ │ Money  │ │ derive │ │ scope  │ │  rules   │  │    │
//! │  │  │  Sale   │ │ cents  │ │ status │ │ admin  │ │  checks  │  │    │
//! │  │  └─────────┘ └────────┘ └────────┘ └────────┘ └──────────┘  │    │
//! │  │                                                             │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS        │    │
//! │  └─────────────────────────────┬───────────────────────────────┘    │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼───────────────────────────────┐    │
//! │  │              tradepost-db (Database Layer)                  │    │
//! │  │       SQLite transactions, repositories, reporting          │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, SaleItem, Payment, Principal)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`status`] - The payment status derivation, one pure function
//! - [`policy`] - Role visibility policy shared by every read path
//! - [`validation`] - Business rule validation
//! - [`receipt`] - Plain receipt record for the external PDF renderer
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, always
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all amounts are cents (i64) to avoid float errors
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use tradepost_core::money::Money;
//! use tradepost_core::status::derive_status;
//! use tradepost_core::types::PaymentStatus;
//!
//! // A ₦200.00 sale with ₦100.00 paid is Partial with ₦100.00 owing
//! let (status, balance) =
//!     derive_status(Money::from_cents(20000), Money::from_cents(10000));
//! assert_eq!(status, PaymentStatus::Partial);
//! assert_eq!(balance.cents(), 10000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod policy;
pub mod receipt;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tradepost_core::Money` instead of
// `use tradepost_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use policy::{require_admin, visible_sales, SaleScope};
pub use receipt::{ReceiptData, ReceiptLine};
pub use status::derive_status;
pub use types::*;
