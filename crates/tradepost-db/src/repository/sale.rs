//! # Sale Repository
//!
//! The sale builder plus scoped sale queries.
//!
//! ## Sale Builder Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     create_sale (one transaction)                   │
//! │                                                                     │
//! │  1. Validate request (empty items, quantities, duplicates)          │
//! │  2. Sort line items by product_id (stable lock ordering)            │
//! │  3. For each line:                                                  │
//! │     a. Guarded stock decrement (reserve_stock)                      │
//! │     b. Snapshot name / SKU / unit price onto the item               │
//! │  4. total = Σ subtotals; derive (status, balance) from              │
//! │     (total, amount_paid)                                            │
//! │  5. INSERT sale + items                                             │
//! │  6. COMMIT                                                          │
//! │                                                                     │
//! │  Any failure rolls back the whole transaction: no partial           │
//! │  decrements, no orphaned items.                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads are scoped through the visibility policy: a salesperson's
//! queries never see another salesperson's sales.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::ProductRepository;
use tradepost_core::{
    derive_status, validation, visible_sales, CoreError, Money, NewSale, PaymentMethod,
    PaymentStatus, Principal, ReceiptData, Sale, SaleItem, SaleScope,
};

/// Bounded retries for lock contention before surfacing a conflict.
const MAX_BUSY_RETRIES: u32 = 3;

/// Filters for sale listing. All fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    /// Inclusive lower bound on created_at.
    pub date_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on created_at.
    pub date_to: Option<DateTime<Utc>>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
    /// Admin-side filter; intersected with the caller's scope.
    pub salesperson_id: Option<String>,
}

/// Non-financial fields an admin may edit after creation.
///
/// Partial update: every `None` field keeps its current value, only
/// `Some` fields are written. Totals, paid amounts, and line items are
/// never editable; corrections go through payments or
/// delete-and-recreate.
#[derive(Debug, Clone, Default)]
pub struct SaleDetailsUpdate {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

const SALE_COLUMNS: &str = "id, salesperson_id, salesperson_name, customer_name, \
     customer_phone, total, paid, balance, payment_method, payment_status, \
     notes, created_at, updated_at";

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Sale Builder
    // =========================================================================

    /// Creates a sale atomically: reserves stock, snapshots product data,
    /// computes the total, and derives the initial payment status.
    ///
    /// The sale is attributed to `principal`; salespeople and admins may
    /// both sell.
    ///
    /// ## Errors
    /// * `Domain(Validation)` - empty items, bad quantity, duplicate product
    /// * `Domain(InsufficientStock)` - any line exceeds available stock
    /// * `Domain(NotFound)` - a product is missing or inactive
    /// * `Domain(Conflict)` - lock contention persisted through retries
    pub async fn create_sale(&self, principal: &Principal, request: NewSale) -> DbResult<Sale> {
        validation::validate_new_sale(&request)?;

        let mut attempt = 0;
        loop {
            match self.try_create(principal, &request).await {
                Err(err) if err.is_busy() && attempt < MAX_BUSY_RETRIES => {
                    attempt += 1;
                    warn!(attempt, "Sale creation hit lock contention, retrying");
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                }
                Err(err) if err.is_busy() => {
                    return Err(CoreError::Conflict(
                        "sale creation retries exhausted".to_string(),
                    )
                    .into());
                }
                other => return other,
            }
        }
    }

    async fn try_create(&self, principal: &Principal, request: &NewSale) -> DbResult<Sale> {
        // Stable ordering keeps concurrent multi-line sales from
        // reserving the same products in opposite order.
        let mut lines = request.line_items.clone();
        lines.sort_by(|a, b| a.product_id.cmp(&b.product_id));

        let sale_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let mut items = Vec::with_capacity(lines.len());
        let mut total = Money::zero();

        for line in &lines {
            ProductRepository::reserve_stock(&mut tx, &line.product_id, line.quantity).await?;

            // Snapshot: later catalog edits never change sale history.
            let (name, sku, price): (String, String, Money) =
                sqlx::query_as("SELECT name, sku, price FROM products WHERE id = ?1")
                    .bind(&line.product_id)
                    .fetch_one(&mut *tx)
                    .await?;

            let subtotal = price.multiply_quantity(line.quantity);
            total += subtotal;

            items.push(SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id: line.product_id.clone(),
                product_name: name,
                product_sku: sku,
                quantity: line.quantity,
                price_at_sale: price,
                subtotal,
            });
        }

        let paid = request.amount_paid;
        let (payment_status, balance) = derive_status(total, paid);

        sqlx::query(
            "INSERT INTO sales (
                id, salesperson_id, salesperson_name, customer_name, customer_phone,
                total, paid, balance, payment_method, payment_status, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(&sale_id)
        .bind(&principal.id)
        .bind(&principal.name)
        .bind(&request.customer_name)
        .bind(&request.customer_phone)
        .bind(total)
        .bind(paid)
        .bind(balance)
        .bind(request.payment_method)
        .bind(payment_status)
        .bind(&request.notes)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for item in &items {
            sqlx::query(
                "INSERT INTO sale_items (
                    id, sale_id, product_id, product_name, product_sku,
                    quantity, price_at_sale, subtotal
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(&item.product_sku)
            .bind(item.quantity)
            .bind(item.price_at_sale)
            .bind(item.subtotal)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            salesperson = %principal.name,
            total = %total,
            status = ?payment_status,
            "Sale created"
        );

        Ok(Sale {
            id: sale_id,
            salesperson_id: principal.id.clone(),
            salesperson_name: principal.name.clone(),
            customer_name: request.customer_name.clone(),
            customer_phone: request.customer_phone.clone(),
            total,
            paid,
            balance,
            payment_method: request.payment_method,
            payment_status,
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    // =========================================================================
    // Scoped Reads
    // =========================================================================

    /// Gets a sale by ID, respecting the caller's visibility scope.
    ///
    /// A sale outside the caller's scope is reported as absent rather
    /// than forbidden, so existence is not leaked.
    pub async fn get_by_id(&self, principal: &Principal, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let scope = visible_sales(principal);
        Ok(sale.filter(|s| scope.allows(s)))
    }

    /// Lists sales matching the filter within the caller's scope,
    /// newest first.
    pub async fn list(&self, principal: &Principal, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {SALE_COLUMNS} FROM sales WHERE 1 = 1"));

        if let SaleScope::Salesperson(id) = visible_sales(principal) {
            qb.push(" AND salesperson_id = ").push_bind(id);
        }

        if let Some(id) = &filter.salesperson_id {
            qb.push(" AND salesperson_id = ").push_bind(id.clone());
        }

        if let Some(from) = filter.date_from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.date_to {
            qb.push(" AND created_at < ").push_bind(to);
        }

        if let Some(status) = filter.payment_status {
            qb.push(" AND payment_status = ").push_bind(status);
        }
        if let Some(method) = filter.payment_method {
            qb.push(" AND payment_method = ").push_bind(method);
        }

        qb.push(" ORDER BY created_at DESC");

        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;

        debug!(count = sales.len(), "Listed sales");
        Ok(sales)
    }

    /// Gets the line items of a sale, in insertion order.
    pub async fn items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT id, sale_id, product_id, product_name, product_sku,
                    quantity, price_at_sale, subtotal
             FROM sale_items WHERE sale_id = ?1
             ORDER BY product_id",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    // =========================================================================
    // Admin Mutations
    // =========================================================================

    /// Updates a sale's non-financial details (admin only).
    pub async fn update_details(
        &self,
        principal: &Principal,
        sale_id: &str,
        update: SaleDetailsUpdate,
    ) -> DbResult<Sale> {
        tradepost_core::require_admin(principal, "update_sale_details")?;

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE sales SET
                customer_name = COALESCE(?2, customer_name),
                customer_phone = COALESCE(?3, customer_phone),
                notes = COALESCE(?4, notes),
                payment_method = COALESCE(?5, payment_method),
                updated_at = ?6
            WHERE id = ?1",
        )
        .bind(sale_id)
        .bind(&update.customer_name)
        .bind(&update.customer_phone)
        .bind(&update.notes)
        .bind(update.payment_method)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Sale", sale_id).into());
        }

        self.get_by_id(principal, sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))
    }

    /// Deletes a sale (admin only), restoring reserved stock.
    ///
    /// Line items and payments cascade via foreign keys. Stock restore
    /// and the delete run in one transaction: the sale either fully
    /// disappears with its units returned, or nothing changes.
    pub async fn delete_sale(&self, principal: &Principal, sale_id: &str) -> DbResult<()> {
        tradepost_core::require_admin(principal, "delete_sale")?;

        let mut tx = self.pool.begin().await?;

        let items: Vec<(String, i64)> =
            sqlx::query_as("SELECT product_id, quantity FROM sale_items WHERE sale_id = ?1")
                .bind(sale_id)
                .fetch_all(&mut *tx)
                .await?;

        for (product_id, quantity) in &items {
            ProductRepository::restore_stock(&mut tx, product_id, *quantity).await?;
        }

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Sale", sale_id).into());
        }

        tx.commit().await?;

        info!(sale_id = %sale_id, restored_lines = items.len(), "Sale deleted");
        Ok(())
    }

    // =========================================================================
    // Receipt
    // =========================================================================

    /// Builds the receipt record for a sale, respecting visibility scope.
    pub async fn receipt_data(&self, principal: &Principal, sale_id: &str) -> DbResult<ReceiptData> {
        let sale = self
            .get_by_id(principal, sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        let items = self.items(sale_id).await?;

        Ok(ReceiptData::from_sale(&sale, &items))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{admin, new_product, other_seller, seller, test_db};
    use tradepost_core::LineItem;

    fn request(lines: Vec<LineItem>, method: PaymentMethod, paid_cents: i64) -> NewSale {
        NewSale {
            customer_name: Some("Chidi".to_string()),
            customer_phone: None,
            payment_method: method,
            line_items: lines,
            amount_paid: Money::from_cents(paid_cents),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_sale_computes_totals_and_snapshots() {
        let db = test_db().await;
        let coke = new_product("COKE-330", 29900, 20);
        let rice = new_product("RICE-5KG", 550000, 10);
        db.products().insert(&coke).await.unwrap();
        db.products().insert(&rice).await.unwrap();

        let sale = db
            .sales()
            .create_sale(
                &seller(),
                request(
                    vec![
                        LineItem {
                            product_id: coke.id.clone(),
                            quantity: 3,
                        },
                        LineItem {
                            product_id: rice.id.clone(),
                            quantity: 1,
                        },
                    ],
                    PaymentMethod::Cash,
                    639700,
                ),
            )
            .await
            .unwrap();

        // 3 × 29900 + 1 × 550000 = 639700
        assert_eq!(sale.total, Money::from_cents(639700));
        assert_eq!(sale.payment_status, PaymentStatus::Paid);
        assert!(sale.balance.is_zero());
        assert_eq!(sale.salesperson_id, "seller-1");

        // Stock decremented
        let coke_after = db.products().get_by_id(&coke.id).await.unwrap().unwrap();
        assert_eq!(coke_after.stock_quantity, 17);

        // Items snapshot product data
        let items = db.sales().items(&sale.id).await.unwrap();
        assert_eq!(items.len(), 2);
        let coke_item = items.iter().find(|i| i.product_sku == "COKE-330").unwrap();
        assert_eq!(coke_item.price_at_sale, Money::from_cents(29900));
        assert_eq!(coke_item.subtotal, Money::from_cents(89700));
    }

    #[tokio::test]
    async fn test_create_credit_sale_starts_unpaid() {
        let db = test_db().await;
        let coke = new_product("COKE-330", 29900, 20);
        db.products().insert(&coke).await.unwrap();

        let sale = db
            .sales()
            .create_sale(
                &seller(),
                request(
                    vec![LineItem {
                        product_id: coke.id.clone(),
                        quantity: 2,
                    }],
                    PaymentMethod::Credit,
                    0,
                ),
            )
            .await
            .unwrap();

        assert_eq!(sale.payment_status, PaymentStatus::Unpaid);
        assert_eq!(sale.balance, Money::from_cents(59800));
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_everything() {
        let db = test_db().await;
        let coke = new_product("COKE-330", 29900, 20);
        let rice = new_product("RICE-5KG", 550000, 2);
        db.products().insert(&coke).await.unwrap();
        db.products().insert(&rice).await.unwrap();

        let err = db
            .sales()
            .create_sale(
                &seller(),
                request(
                    vec![
                        LineItem {
                            product_id: coke.id.clone(),
                            quantity: 5,
                        },
                        LineItem {
                            product_id: rice.id.clone(),
                            quantity: 3, // only 2 in stock
                        },
                    ],
                    PaymentMethod::Cash,
                    0,
                ),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));

        // First line's decrement must have been rolled back too
        let coke_after = db.products().get_by_id(&coke.id).await.unwrap().unwrap();
        assert_eq!(coke_after.stock_quantity, 20);

        let sales = db.sales().list(&admin(), &SaleFilter::default()).await.unwrap();
        assert!(sales.is_empty());
    }

    #[tokio::test]
    async fn test_visibility_scope_on_reads() {
        let db = test_db().await;
        let coke = new_product("COKE-330", 29900, 20);
        db.products().insert(&coke).await.unwrap();

        let line = || {
            vec![LineItem {
                product_id: coke.id.clone(),
                quantity: 1,
            }]
        };

        let mine = db
            .sales()
            .create_sale(&seller(), request(line(), PaymentMethod::Cash, 29900))
            .await
            .unwrap();
        db.sales()
            .create_sale(&other_seller(), request(line(), PaymentMethod::Cash, 29900))
            .await
            .unwrap();

        // Admin sees both; each seller sees only their own
        let all = db.sales().list(&admin(), &SaleFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let own = db.sales().list(&seller(), &SaleFilter::default()).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id, mine.id);

        // Out-of-scope detail lookup reads as absent
        let hidden = db.sales().get_by_id(&other_seller(), &mine.id).await.unwrap();
        assert!(hidden.is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let db = test_db().await;
        let coke = new_product("COKE-330", 29900, 20);
        db.products().insert(&coke).await.unwrap();

        let line = || {
            vec![LineItem {
                product_id: coke.id.clone(),
                quantity: 1,
            }]
        };

        db.sales()
            .create_sale(&seller(), request(line(), PaymentMethod::Cash, 29900))
            .await
            .unwrap();
        db.sales()
            .create_sale(&seller(), request(line(), PaymentMethod::Credit, 0))
            .await
            .unwrap();

        let unpaid = db
            .sales()
            .list(
                &admin(),
                &SaleFilter {
                    payment_status: Some(PaymentStatus::Unpaid),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(unpaid.len(), 1);
        assert_eq!(unpaid[0].payment_method, PaymentMethod::Credit);
    }

    #[tokio::test]
    async fn test_delete_sale_restores_stock_and_requires_admin() {
        let db = test_db().await;
        let coke = new_product("COKE-330", 29900, 20);
        db.products().insert(&coke).await.unwrap();

        let sale = db
            .sales()
            .create_sale(
                &seller(),
                request(
                    vec![LineItem {
                        product_id: coke.id.clone(),
                        quantity: 4,
                    }],
                    PaymentMethod::Cash,
                    0,
                ),
            )
            .await
            .unwrap();

        let err = db.sales().delete_sale(&seller(), &sale.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Forbidden(_))));

        db.sales().delete_sale(&admin(), &sale.id).await.unwrap();

        let coke_after = db.products().get_by_id(&coke.id).await.unwrap().unwrap();
        assert_eq!(coke_after.stock_quantity, 20);

        assert!(db.sales().get_by_id(&admin(), &sale.id).await.unwrap().is_none());
        assert!(db.sales().items(&sale.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_restores_each_line_quantity() {
        let db = test_db().await;
        let coke = new_product("COKE-330", 29900, 10);
        let rice = new_product("RICE-5KG", 550000, 10);
        db.products().insert(&coke).await.unwrap();
        db.products().insert(&rice).await.unwrap();

        let sale = db
            .sales()
            .create_sale(
                &seller(),
                request(
                    vec![
                        LineItem {
                            product_id: coke.id.clone(),
                            quantity: 3,
                        },
                        LineItem {
                            product_id: rice.id.clone(),
                            quantity: 2,
                        },
                    ],
                    PaymentMethod::Cash,
                    0,
                ),
            )
            .await
            .unwrap();

        let coke_held = db.products().get_by_id(&coke.id).await.unwrap().unwrap();
        let rice_held = db.products().get_by_id(&rice.id).await.unwrap().unwrap();
        assert_eq!(coke_held.stock_quantity, 7);
        assert_eq!(rice_held.stock_quantity, 8);

        db.sales().delete_sale(&admin(), &sale.id).await.unwrap();

        // Each line gives back exactly its own quantity
        let coke_after = db.products().get_by_id(&coke.id).await.unwrap().unwrap();
        let rice_after = db.products().get_by_id(&rice.id).await.unwrap().unwrap();
        assert_eq!(coke_after.stock_quantity, 10);
        assert_eq!(rice_after.stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_update_details_leaves_financials_untouched() {
        let db = test_db().await;
        let coke = new_product("COKE-330", 29900, 20);
        db.products().insert(&coke).await.unwrap();

        let sale = db
            .sales()
            .create_sale(
                &seller(),
                request(
                    vec![LineItem {
                        product_id: coke.id.clone(),
                        quantity: 1,
                    }],
                    PaymentMethod::Cash,
                    10000,
                ),
            )
            .await
            .unwrap();

        let updated = db
            .sales()
            .update_details(
                &admin(),
                &sale.id,
                SaleDetailsUpdate {
                    customer_name: Some("Ngozi".to_string()),
                    customer_phone: Some("0801".to_string()),
                    notes: Some("walk-in".to_string()),
                    payment_method: Some(PaymentMethod::BankTransfer),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.customer_name.as_deref(), Some("Ngozi"));
        assert_eq!(updated.payment_method, PaymentMethod::BankTransfer);
        assert_eq!(updated.total, sale.total);
        assert_eq!(updated.paid, sale.paid);
        assert_eq!(updated.payment_status, sale.payment_status);

        // A second partial update: None fields keep their values
        let again = db
            .sales()
            .update_details(
                &admin(),
                &sale.id,
                SaleDetailsUpdate {
                    customer_phone: Some("0802".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(again.customer_name.as_deref(), Some("Ngozi"));
        assert_eq!(again.customer_phone.as_deref(), Some("0802"));
        assert_eq!(again.notes.as_deref(), Some("walk-in"));
        assert_eq!(again.payment_method, PaymentMethod::BankTransfer);
    }

    #[tokio::test]
    async fn test_receipt_data() {
        let db = test_db().await;
        let coke = new_product("COKE-330", 29900, 20);
        db.products().insert(&coke).await.unwrap();

        let sale = db
            .sales()
            .create_sale(
                &seller(),
                request(
                    vec![LineItem {
                        product_id: coke.id.clone(),
                        quantity: 2,
                    }],
                    PaymentMethod::Cash,
                    59800,
                ),
            )
            .await
            .unwrap();

        let receipt = db.sales().receipt_data(&seller(), &sale.id).await.unwrap();
        assert_eq!(receipt.id, sale.id);
        assert_eq!(receipt.items.len(), 1);
        assert_eq!(receipt.total_amount, Money::from_cents(59800));
        assert!(receipt.balance.is_zero());
        assert_eq!(receipt.salesperson_name, "Sam Eze");
    }
}
