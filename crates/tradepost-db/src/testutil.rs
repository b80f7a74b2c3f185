//! Shared helpers for repository tests.
//!
//! Everything here builds against an in-memory database so tests stay
//! isolated and need no filesystem.

use chrono::Utc;
use uuid::Uuid;

use crate::pool::{Database, DbConfig};
use tradepost_core::{Money, Principal, Product, Role};

/// Fresh in-memory database with migrations applied.
///
/// Set RUST_LOG to see repository tracing during a test run.
pub async fn test_db() -> Database {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database should initialize")
}

/// An admin principal.
pub fn admin() -> Principal {
    Principal {
        id: "admin-1".to_string(),
        name: "Ada Obi".to_string(),
        role: Role::Admin,
    }
}

/// A salesperson principal.
pub fn seller() -> Principal {
    Principal {
        id: "seller-1".to_string(),
        name: "Sam Eze".to_string(),
        role: Role::Salesperson,
    }
}

/// A second salesperson, for visibility tests.
pub fn other_seller() -> Principal {
    Principal {
        id: "seller-2".to_string(),
        name: "Tunde Alade".to_string(),
        role: Role::Salesperson,
    }
}

/// A product draft ready for insert.
pub fn new_product(sku: &str, price_cents: i64, stock: i64) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4().to_string(),
        sku: sku.to_string(),
        name: format!("Test {}", sku),
        description: None,
        price: Money::from_cents(price_cents),
        stock_quantity: stock,
        category: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
