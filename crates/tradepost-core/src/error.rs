//! # Error Types
//!
//! Domain-specific error types for tradepost-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  tradepost-core errors (this file)                                  │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  tradepost-db errors (separate crate)                               │
//! │  └── DbError          - Database operation failures                 │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → caller boundary                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, amounts, etc.)
//! 3. Errors are enum variants, never String
//! 4. A rejected operation leaves all state exactly as it was

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations produced at the point of
/// detection inside the sale builder or payment reconciler and surfaced
/// unchanged to the caller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced entity is missing or soft-deleted.
    ///
    /// ## When This Occurs
    /// - Sale or product ID doesn't exist
    /// - Product was deactivated (soft delete) and a sale references it
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Insufficient stock to complete a sale line.
    ///
    /// Carries both quantities so the caller can report
    /// "Only 3 COKE-330 in stock" style messages.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Payment amount exceeds the sale's remaining balance.
    ///
    /// The reconciler rejects rather than clamps: the sale is left untouched.
    #[error("Payment of {amount_cents} exceeds sale balance of {balance_cents}")]
    ExceedsBalance { amount_cents: i64, balance_cents: i64 },

    /// Principal's role does not permit the operation.
    ///
    /// ## When This Occurs
    /// - Non-admin records a payment (checked again inside the reconciler
    ///   even though the caller boundary also enforces it)
    /// - Non-admin deletes a sale or marks one fully paid
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Concurrent mutation detected and retries exhausted.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when input doesn't meet requirements, before any business
/// logic runs or any state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A collection that must not be empty was empty.
    #[error("{field} must contain at least one entry")]
    Empty { field: String },

    /// Duplicate value (e.g., duplicate SKU, repeated product in one sale).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
