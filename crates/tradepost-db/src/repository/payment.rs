//! # Payment Repository
//!
//! The payment reconciler: records installments against credit sales and
//! keeps the sale's (paid, balance, status) triple consistent.
//!
//! ## Reconciler Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  apply_payment (one transaction)                    │
//! │                                                                     │
//! │  1. Admin check + amount validation (no state touched)              │
//! │  2. SELECT the sale (snapshot)                                      │
//! │  3. amount > balance?  → reject, roll back, sale untouched          │
//! │  4. INSERT payment (status = completed)                             │
//! │  5. Guarded UPDATE:                                                 │
//! │       SET paid/balance/status = <derived from snapshot + amount>    │
//! │       WHERE id = ? AND paid = <snapshot paid>                       │
//! │     0 rows → another writer moved paid; retry from step 2           │
//! │  6. COMMIT                                                          │
//! │                                                                     │
//! │  The compare-and-swap on `paid` guarantees each completed payment   │
//! │  increases the sale's paid amount by exactly its amount, exactly    │
//! │  once, no matter how payments interleave.                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tradepost_core::{
    derive_status, require_admin, validation, visible_sales, CoreError, NewPayment, Payment,
    PaymentState, Principal, Sale, SaleScope,
};

/// Bounded retries when the compare-and-swap loses a race.
const MAX_CAS_RETRIES: u32 = 3;

/// Filters for payment listing. All fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub sale_id: Option<String>,
    pub status: Option<PaymentState>,
    /// Inclusive lower bound on created_at.
    pub date_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on created_at.
    pub date_to: Option<DateTime<Utc>>,
}

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

const PAYMENT_COLUMNS: &str = "p.id, p.sale_id, p.amount, p.payment_method, p.status, \
     p.recorded_by_id, p.recorded_by_name, p.reference, p.notes, p.created_at, p.updated_at";

const SALE_COLUMNS: &str = "id, salesperson_id, salesperson_name, customer_name, \
     customer_phone, total, paid, balance, payment_method, payment_status, \
     notes, created_at, updated_at";

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    // =========================================================================
    // Payment Reconciler
    // =========================================================================

    /// Records a completed payment against a sale and reconciles the
    /// sale's paid amount, balance, and status, all in one transaction.
    ///
    /// Returns the payment together with the updated sale.
    ///
    /// ## Errors
    /// * `Domain(Forbidden)` - caller is not an admin
    /// * `Domain(Validation)` - amount is zero or negative
    /// * `Domain(NotFound)` - sale does not exist
    /// * `Domain(ExceedsBalance)` - amount exceeds the remaining balance
    /// * `Domain(Conflict)` - races persisted through retries
    pub async fn apply_payment(
        &self,
        principal: &Principal,
        request: NewPayment,
    ) -> DbResult<(Payment, Sale)> {
        // Checked again here even though the caller boundary enforces it
        require_admin(principal, "apply_payment")?;
        validation::validate_new_payment(&request)?;

        let mut attempt = 0;
        loop {
            match self.try_apply(principal, &request).await {
                Err(err) if err.is_busy() && attempt < MAX_CAS_RETRIES => {
                    attempt += 1;
                    warn!(
                        attempt,
                        sale_id = %request.sale_id,
                        "Payment reconciliation lost a race, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                }
                Err(err) if err.is_busy() => {
                    return Err(CoreError::Conflict(
                        "payment reconciliation retries exhausted".to_string(),
                    )
                    .into());
                }
                other => return other,
            }
        }
    }

    async fn try_apply(
        &self,
        principal: &Principal,
        request: &NewPayment,
    ) -> DbResult<(Payment, Sale)> {
        let mut tx = self.pool.begin().await?;

        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(&request.sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::not_found("Sale", &request.sale_id))?;

        // Reject, never clamp: an overpayment leaves the sale untouched.
        if request.amount > sale.balance {
            return Err(CoreError::ExceedsBalance {
                amount_cents: request.amount.cents(),
                balance_cents: sale.balance.cents(),
            }
            .into());
        }

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            amount: request.amount,
            payment_method: request.payment_method,
            status: PaymentState::Completed,
            recorded_by_id: principal.id.clone(),
            recorded_by_name: principal.name.clone(),
            reference: request.reference.clone(),
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO payments (
                id, sale_id, amount, payment_method, status,
                recorded_by_id, recorded_by_name, reference, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&payment.id)
        .bind(&payment.sale_id)
        .bind(payment.amount)
        .bind(payment.payment_method)
        .bind(payment.status)
        .bind(&payment.recorded_by_id)
        .bind(&payment.recorded_by_name)
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *tx)
        .await?;

        let new_paid = sale.paid + payment.amount;
        let (status, balance) = derive_status(sale.total, new_paid);

        // CAS on the snapshot's paid amount: a concurrent payment that
        // committed in between makes this a 0-row update and we retry.
        let result = sqlx::query(
            "UPDATE sales SET
                paid = ?2, balance = ?3, payment_status = ?4, updated_at = ?5
            WHERE id = ?1 AND paid = ?6",
        )
        .bind(&sale.id)
        .bind(new_paid)
        .bind(balance)
        .bind(status)
        .bind(now)
        .bind(sale.paid)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Busy(
                "sale paid amount moved during reconciliation".to_string(),
            ));
        }

        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            sale_id = %sale.id,
            amount = %payment.amount,
            new_status = ?status,
            "Payment recorded"
        );

        let mut updated = sale;
        updated.paid = new_paid;
        updated.balance = balance;
        updated.payment_status = status;
        updated.updated_at = now;

        Ok((payment, updated))
    }

    /// Forces a sale to fully-paid without recording a payment (admin only).
    ///
    /// Idempotent: marking an already-paid sale is a no-op. No payment
    /// row is written, so the audit trail has a gap; the warning makes
    /// that visible in the logs.
    ///
    /// Races against concurrent payments are retried like
    /// [`apply_payment`](Self::apply_payment) and surface as `Conflict`
    /// when exhausted.
    pub async fn mark_fully_paid(&self, principal: &Principal, sale_id: &str) -> DbResult<Sale> {
        require_admin(principal, "mark_fully_paid")?;

        let mut attempt = 0;
        loop {
            match self.try_mark_fully_paid(principal, sale_id).await {
                Err(err) if err.is_busy() && attempt < MAX_CAS_RETRIES => {
                    attempt += 1;
                    warn!(attempt, sale_id = %sale_id, "Mark-paid lost a race, retrying");
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                }
                Err(err) if err.is_busy() => {
                    return Err(CoreError::Conflict(
                        "mark_fully_paid retries exhausted".to_string(),
                    )
                    .into());
                }
                other => return other,
            }
        }
    }

    async fn try_mark_fully_paid(&self, principal: &Principal, sale_id: &str) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;

        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        if sale.is_fully_paid() {
            return Ok(sale);
        }

        let now = Utc::now();
        let (status, balance) = derive_status(sale.total, sale.total);

        let result = sqlx::query(
            "UPDATE sales SET
                paid = total, balance = ?2, payment_status = ?3, updated_at = ?4
            WHERE id = ?1 AND paid = ?5",
        )
        .bind(sale_id)
        .bind(balance)
        .bind(status)
        .bind(now)
        .bind(sale.paid)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Busy(
                "sale paid amount moved during mark_fully_paid".to_string(),
            ));
        }

        tx.commit().await?;

        warn!(
            sale_id = %sale_id,
            forgiven = %sale.balance,
            by = %principal.name,
            "Sale marked fully paid without a payment record"
        );

        let mut updated = sale;
        updated.paid = updated.total;
        updated.balance = balance;
        updated.payment_status = status;
        updated.updated_at = now;

        Ok(updated)
    }

    // =========================================================================
    // Scoped Reads
    // =========================================================================

    /// Gets a payment by ID, respecting the caller's sale visibility.
    pub async fn get_by_id(&self, principal: &Principal, id: &str) -> DbResult<Option<Payment>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PAYMENT_COLUMNS} FROM payments p"));

        if let SaleScope::Salesperson(sid) = visible_sales(principal) {
            qb.push(" JOIN sales s ON s.id = p.sale_id AND s.salesperson_id = ")
                .push_bind(sid);
        }

        qb.push(" WHERE p.id = ").push_bind(id.to_string());

        let payment = qb
            .build_query_as::<Payment>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    /// Lists payments matching the filter within the caller's sale
    /// visibility, newest first.
    pub async fn list(
        &self,
        principal: &Principal,
        filter: &PaymentFilter,
    ) -> DbResult<Vec<Payment>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PAYMENT_COLUMNS} FROM payments p"));

        if let SaleScope::Salesperson(sid) = visible_sales(principal) {
            qb.push(" JOIN sales s ON s.id = p.sale_id AND s.salesperson_id = ")
                .push_bind(sid);
        }

        qb.push(" WHERE 1 = 1");

        if let Some(sale_id) = &filter.sale_id {
            qb.push(" AND p.sale_id = ").push_bind(sale_id.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND p.status = ").push_bind(status);
        }
        if let Some(from) = filter.date_from {
            qb.push(" AND p.created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.date_to {
            qb.push(" AND p.created_at < ").push_bind(to);
        }

        qb.push(" ORDER BY p.created_at DESC");

        let payments = qb.build_query_as::<Payment>().fetch_all(&self.pool).await?;

        debug!(count = payments.len(), "Listed payments");
        Ok(payments)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{admin, new_product, other_seller, seller, test_db};
    use tradepost_core::{LineItem, Money, NewSale, PaymentMethod, PaymentStatus};
    use uuid::Uuid;

    async fn credit_sale(db: &crate::pool::Database, total_cents: i64) -> Sale {
        let product = new_product(
            &format!("SKU-{}", Uuid::new_v4().simple()),
            total_cents,
            10,
        );
        db.products().insert(&product).await.unwrap();

        db.sales()
            .create_sale(
                &seller(),
                NewSale {
                    customer_name: Some("Chidi".to_string()),
                    customer_phone: None,
                    payment_method: PaymentMethod::Credit,
                    line_items: vec![LineItem {
                        product_id: product.id,
                        quantity: 1,
                    }],
                    amount_paid: Money::zero(),
                    notes: None,
                },
            )
            .await
            .unwrap()
    }

    fn payment_req(sale_id: &str, cents: i64) -> NewPayment {
        NewPayment {
            sale_id: sale_id.to_string(),
            amount: Money::from_cents(cents),
            payment_method: PaymentMethod::Cash,
            reference: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_partial_then_final_payment() {
        let db = test_db().await;
        let sale = credit_sale(&db, 100000).await;
        assert_eq!(sale.payment_status, PaymentStatus::Unpaid);

        let (p1, after1) = db
            .payments()
            .apply_payment(&admin(), payment_req(&sale.id, 40000))
            .await
            .unwrap();
        assert_eq!(p1.status, PaymentState::Completed);
        assert_eq!(after1.payment_status, PaymentStatus::Partial);
        assert_eq!(after1.balance, Money::from_cents(60000));

        let (_, after2) = db
            .payments()
            .apply_payment(&admin(), payment_req(&sale.id, 60000))
            .await
            .unwrap();
        assert_eq!(after2.payment_status, PaymentStatus::Paid);
        assert!(after2.balance.is_zero());
        assert_eq!(after2.paid, Money::from_cents(100000));

        // Persisted state matches the returned snapshot
        let stored = db.sales().get_by_id(&admin(), &sale.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert_eq!(stored.paid, Money::from_cents(100000));
    }

    #[tokio::test]
    async fn test_overpayment_rejected_and_nothing_recorded() {
        let db = test_db().await;
        let sale = credit_sale(&db, 100000).await;

        db.payments()
            .apply_payment(&admin(), payment_req(&sale.id, 70000))
            .await
            .unwrap();

        let err = db
            .payments()
            .apply_payment(&admin(), payment_req(&sale.id, 30001))
            .await
            .unwrap_err();

        match err {
            DbError::Domain(CoreError::ExceedsBalance {
                amount_cents,
                balance_cents,
            }) => {
                assert_eq!(amount_cents, 30001);
                assert_eq!(balance_cents, 30000);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Sale untouched, no phantom payment row
        let stored = db.sales().get_by_id(&admin(), &sale.id).await.unwrap().unwrap();
        assert_eq!(stored.paid, Money::from_cents(70000));

        let payments = db
            .payments()
            .list(
                &admin(),
                &PaymentFilter {
                    sale_id: Some(sale.id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(payments.len(), 1);
    }

    #[tokio::test]
    async fn test_non_admin_cannot_record_payment() {
        let db = test_db().await;
        let sale = credit_sale(&db, 100000).await;

        let err = db
            .payments()
            .apply_payment(&seller(), payment_req(&sale.id, 10000))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_zero_amount_rejected_before_lookup() {
        let db = test_db().await;

        let err = db
            .payments()
            .apply_payment(&admin(), payment_req("no-such-sale", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_payment_on_unknown_sale() {
        let db = test_db().await;

        let err = db
            .payments()
            .apply_payment(&admin(), payment_req("no-such-sale", 1000))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_mark_fully_paid_is_idempotent() {
        let db = test_db().await;
        let sale = credit_sale(&db, 100000).await;

        let settled = db.payments().mark_fully_paid(&admin(), &sale.id).await.unwrap();
        assert_eq!(settled.payment_status, PaymentStatus::Paid);
        assert_eq!(settled.paid, Money::from_cents(100000));
        assert!(settled.balance.is_zero());

        // Second call is a no-op
        let again = db.payments().mark_fully_paid(&admin(), &sale.id).await.unwrap();
        assert_eq!(again.payment_status, PaymentStatus::Paid);
        assert_eq!(again.paid, Money::from_cents(100000));

        // No payment rows were written
        let payments = db
            .payments()
            .list(
                &admin(),
                &PaymentFilter {
                    sale_id: Some(sale.id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(payments.is_empty());

        let err = db
            .payments()
            .mark_fully_paid(&seller(), &sale.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_competing_payments_never_overshoot() {
        let db = test_db().await;
        let sale = credit_sale(&db, 100000).await;

        // Two 60k payments against a 100k balance: whichever lands
        // second must be rejected, never accumulated.
        let payments = db.payments();
        let recorder = admin();
        let (a, b) = tokio::join!(
            payments.apply_payment(&recorder, payment_req(&sale.id, 60000)),
            payments.apply_payment(&recorder, payment_req(&sale.id, 60000)),
        );

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(
            loser.unwrap_err(),
            DbError::Domain(CoreError::ExceedsBalance { .. })
        ));

        let stored = db.sales().get_by_id(&admin(), &sale.id).await.unwrap().unwrap();
        assert_eq!(stored.paid, Money::from_cents(60000));
        assert_eq!(stored.payment_status, PaymentStatus::Partial);
    }

    #[tokio::test]
    async fn test_payment_visibility_follows_sale_scope() {
        let db = test_db().await;
        let sale = credit_sale(&db, 100000).await; // made by seller()

        let (payment, _) = db
            .payments()
            .apply_payment(&admin(), payment_req(&sale.id, 50000))
            .await
            .unwrap();

        // The selling salesperson sees the payment; another does not
        let own = db
            .payments()
            .list(&seller(), &PaymentFilter::default())
            .await
            .unwrap();
        assert_eq!(own.len(), 1);

        let other = db
            .payments()
            .list(&other_seller(), &PaymentFilter::default())
            .await
            .unwrap();
        assert!(other.is_empty());

        let hidden = db
            .payments()
            .get_by_id(&other_seller(), &payment.id)
            .await
            .unwrap();
        assert!(hidden.is_none());

        let visible = db.payments().get_by_id(&admin(), &payment.id).await.unwrap();
        assert!(visible.is_some());
    }
}
