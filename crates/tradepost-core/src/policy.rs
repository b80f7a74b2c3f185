//! # Role Visibility Policy
//!
//! Single policy function for role-based sale visibility, reused by every
//! read path instead of per-endpoint conditional filters.
//!
//! ## Who Sees What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Admin        ──► all sales, all payments, global reports           │
//! │  Salesperson  ──► only sales where salesperson_id == principal.id   │
//! │                                                                     │
//! │  Visibility restricts READS; ownership semantics are unchanged.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{Principal, Role, Sale};

/// The set of sales a principal may read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleScope {
    /// Every sale (admin).
    All,
    /// Only sales made by the given salesperson.
    Salesperson(String),
}

impl SaleScope {
    /// Checks whether a concrete sale falls inside this scope.
    pub fn allows(&self, sale: &Sale) -> bool {
        match self {
            SaleScope::All => true,
            SaleScope::Salesperson(id) => &sale.salesperson_id == id,
        }
    }
}

/// Returns the sale-visibility scope for a principal.
///
/// Every read path (listing, detail lookup, dashboard, reports) goes
/// through this one function.
pub fn visible_sales(principal: &Principal) -> SaleScope {
    match principal.role {
        Role::Admin => SaleScope::All,
        Role::Salesperson => SaleScope::Salesperson(principal.id.clone()),
    }
}

/// Asserts that the principal holds the admin role.
///
/// Used as defense in depth inside the payment reconciler and other
/// admin-only operations; the caller boundary enforces it too.
pub fn require_admin(principal: &Principal, operation: &str) -> CoreResult<()> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "{} requires the admin role",
            operation
        )))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{PaymentMethod, PaymentStatus};
    use chrono::Utc;

    fn principal(id: &str, role: Role) -> Principal {
        Principal {
            id: id.to_string(),
            name: "Test".to_string(),
            role,
        }
    }

    fn sale_by(salesperson_id: &str) -> Sale {
        let now = Utc::now();
        Sale {
            id: "s1".to_string(),
            salesperson_id: salesperson_id.to_string(),
            salesperson_name: "Sam".to_string(),
            customer_name: None,
            customer_phone: None,
            total: Money::from_cents(100),
            paid: Money::zero(),
            balance: Money::from_cents(100),
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Unpaid,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_admin_sees_all() {
        let scope = visible_sales(&principal("a1", Role::Admin));
        assert_eq!(scope, SaleScope::All);
        assert!(scope.allows(&sale_by("someone-else")));
    }

    #[test]
    fn test_salesperson_sees_only_own() {
        let scope = visible_sales(&principal("u2", Role::Salesperson));
        assert!(scope.allows(&sale_by("u2")));
        assert!(!scope.allows(&sale_by("u3")));
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&principal("a1", Role::Admin), "apply_payment").is_ok());

        let err = require_admin(&principal("u2", Role::Salesperson), "apply_payment")
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }
}
