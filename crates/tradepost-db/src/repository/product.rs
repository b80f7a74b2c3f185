//! # Product Repository
//!
//! Catalog CRUD plus the stock ledger.
//!
//! ## Stock Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   Guarded Stock Mutation                            │
//! │                                                                     │
//! │  ❌ WRONG: read stock, check in Rust, write back                    │
//! │     Two concurrent sales can both pass the check and drive          │
//! │     stock negative.                                                 │
//! │                                                                     │
//! │  ✅ CORRECT: guarded decrement (compare-and-swap)                   │
//! │     UPDATE products SET stock_quantity = stock_quantity - ?         │
//! │     WHERE id = ? AND is_active = 1 AND stock_quantity >= ?          │
//! │                                                                     │
//! │     rows_affected = 0 means the guard failed; a follow-up read      │
//! │     distinguishes InsufficientStock from NotFound.                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `reserve_stock`/`restore_stock` take a connection rather than the pool
//! so they run inside the caller's transaction: a failed sale never
//! partially decrements stock.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tradepost_core::{validation, CoreError, Product, StockStatus};

/// Filters for catalog listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring match on category.
    pub category: Option<String>,
    /// Restrict to a stock-status bucket.
    pub stock_status: Option<StockStatus>,
    /// Case-insensitive substring match on name or SKU.
    pub search: Option<String>,
    /// Include soft-deleted products (default: active only).
    pub include_inactive: bool,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

const PRODUCT_COLUMNS: &str = "id, sku, name, description, price, stock_quantity, \
     category, is_active, created_at, updated_at";

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its SKU (the business identifier).
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    /// * `Err(DbError::Domain(Validation))` - bad price/SKU/quantity
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        validation::validate_product(product)?;

        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            "INSERT INTO products (
                id, sku, name, description, price, stock_quantity,
                category, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock_quantity)
        .bind(&product.category)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an existing product's catalog fields.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validation::validate_product(product)?;

        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET
                sku = ?2,
                name = ?3,
                description = ?4,
                price = ?5,
                stock_quantity = ?6,
                category = ?7,
                is_active = ?8,
                updated_at = ?9
            WHERE id = ?1",
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock_quantity)
        .bind(&product.category)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// ## Why Soft Delete?
    /// Historical sale items still reference this product, so rows are
    /// never removed; the product simply stops being sellable.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Lists products matching the filter, ordered by name.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE 1 = 1"
        ));

        if !filter.include_inactive {
            qb.push(" AND is_active = 1");
        }

        if let Some(category) = &filter.category {
            qb.push(" AND category LIKE ")
                .push_bind(format!("%{}%", category));
        }

        match filter.stock_status {
            Some(StockStatus::OutOfStock) => {
                qb.push(" AND stock_quantity = 0");
            }
            Some(StockStatus::LowStock) => {
                qb.push(" AND stock_quantity > 0 AND stock_quantity <= 10");
            }
            Some(StockStatus::InStock) => {
                qb.push(" AND stock_quantity > 10");
            }
            None => {}
        }

        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR sku LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb.push(" ORDER BY name");

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Counts active products.
    pub async fn count_active(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Stock Ledger
    // =========================================================================

    /// Reserves (decrements) stock for an active product.
    ///
    /// Runs inside the caller's transaction; the guarded UPDATE makes the
    /// check-and-decrement atomic so a race can never drive stock negative.
    ///
    /// ## Errors
    /// * `InsufficientStock { sku, available, requested }` - guard failed
    ///   on quantity
    /// * `NotFound` - product missing or inactive
    pub async fn reserve_stock(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, quantity = %quantity, "Reserving stock");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products
             SET stock_quantity = stock_quantity - ?1, updated_at = ?2
             WHERE id = ?3 AND is_active = 1 AND stock_quantity >= ?1",
        )
        .bind(quantity)
        .bind(now)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            // Guard failed: figure out which way
            let row: Option<(String, i64, bool)> = sqlx::query_as(
                "SELECT sku, stock_quantity, is_active FROM products WHERE id = ?1",
            )
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

            return match row {
                Some((sku, available, true)) => Err(CoreError::InsufficientStock {
                    sku,
                    available,
                    requested: quantity,
                }
                .into()),
                _ => Err(CoreError::not_found("Product", product_id).into()),
            };
        }

        Ok(())
    }

    /// Restores (increments) stock unconditionally.
    ///
    /// Used when a sale is deleted or cancelled. Works on inactive
    /// products too: a deactivated product still gets its units back.
    pub async fn restore_stock(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, quantity = %quantity, "Restoring stock");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products
             SET stock_quantity = stock_quantity + ?1, updated_at = ?2
             WHERE id = ?3",
        )
        .bind(quantity)
        .bind(now)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
