//! # Validation Module
//!
//! Input validation utilities for Tradepost.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: Caller boundary (HTTP framework, external)                │
//! │  └── Shape checks (deserialization)                                 │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: THIS MODULE - business rule validation                    │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (SQLite)                                         │
//! │  ├── NOT NULL / CHECK constraints                                   │
//! │  ├── UNIQUE constraints                                             │
//! │  └── Foreign key constraints                                        │
//! │                                                                     │
//! │  Defense in depth: multiple layers catch different errors           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{NewPayment, NewSale, Product};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum quantity of a single item in one sale.
///
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 100 characters
/// - Must contain only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use tradepost_core::validation::validate_sku;
///
/// assert!(validate_sku("COKE-330").is_ok());
/// assert!(validate_sku("").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 100,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 255 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 255,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line-item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a product price.
///
/// ## Rules
/// - Must be strictly positive; free items are not part of the catalog
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a stock quantity (absolute value, not a delta).
pub fn validate_stock_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: "stock_quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a payment amount.
///
/// ## Rules
/// - Must be positive (> 0); zero or negative payments are rejected
///   before any state is touched
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates a product draft before insert/update.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_sku(&product.sku)?;
    validate_product_name(&product.name)?;
    validate_price(product.price)?;
    validate_stock_quantity(product.stock_quantity)?;
    Ok(())
}

/// Validates a new-sale request before the builder touches any state.
///
/// ## Rules
/// - Line items must be non-empty
/// - Every quantity must pass [`validate_quantity`]
/// - A product may appear at most once (items are unique per sale)
/// - The initial amount paid must not be negative
pub fn validate_new_sale(sale: &NewSale) -> ValidationResult<()> {
    if sale.line_items.is_empty() {
        return Err(ValidationError::Empty {
            field: "line_items".to_string(),
        });
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for item in &sale.line_items {
        validate_quantity(item.quantity)?;
        if !seen.insert(item.product_id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "product_id".to_string(),
                value: item.product_id.clone(),
            });
        }
    }

    if sale.amount_paid.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: "amount_paid".to_string(),
        });
    }

    Ok(())
}

/// Validates a new-payment request.
pub fn validate_new_payment(payment: &NewPayment) -> ValidationResult<()> {
    validate_payment_amount(payment.amount)
}

// =============================================================================
// Unit Tests
// =============================================================================
