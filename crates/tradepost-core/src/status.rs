//! # Payment Status Derivation
//!
//! The single source of truth for the sale reconciliation invariant:
//! `balance` and `payment_status` are always a pure function of
//! `(total, paid)`.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                                                                     │
//! │   Unpaid ──(payment applied, 0 < balance < total)──► Partial        │
//! │     │                                                   │           │
//! │     │ (full payment in one shot)                        │           │
//! │     ▼                                                   ▼           │
//! │   Paid ◄──────────(payment applied, balance ≤ 0)────────┘           │
//! │     ▲                                                               │
//! │     └── any state ──(mark_fully_paid override)── idempotent         │
//! │                                                                     │
//! │   No transition ever decreases `paid` automatically.                │
//! │   Refunds are out of scope for this core.                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutating operation (sale creation, payment application, the
//! mark-paid override) ends by calling [`derive_status`]; there are no
//! hidden save hooks.

use crate::money::Money;
use crate::types::PaymentStatus;

/// Derives `(payment_status, balance)` from a sale's total and paid amounts.
///
/// ## Rules
/// - `paid >= total`  → `Paid`, balance 0 (overpayment floors at zero)
/// - `0 < paid < total` → `Partial`, balance = total - paid
/// - `paid == 0`      → `Unpaid`, balance = total
///
/// ## Example
/// ```rust
/// use tradepost_core::money::Money;
/// use tradepost_core::status::derive_status;
/// use tradepost_core::types::PaymentStatus;
///
/// let (status, balance) =
///     derive_status(Money::from_cents(20000), Money::from_cents(10000));
/// assert_eq!(status, PaymentStatus::Partial);
/// assert_eq!(balance, Money::from_cents(10000));
/// ```
pub fn derive_status(total: Money, paid: Money) -> (PaymentStatus, Money) {
    let balance = total.saturating_minus(paid);

    let status = if balance.is_zero() {
        PaymentStatus::Paid
    } else if paid.is_positive() {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Unpaid
    };

    (status, balance)
}

// =============================================================================
// Unit Tests
// =============================================================================
