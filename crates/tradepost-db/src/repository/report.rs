//! # Report Repository
//!
//! Read-only aggregations over sales, payments, and inventory.
//!
//! ## Aggregation Surface
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Reporting Aggregator                           │
//! │                                                                     │
//! │  dashboard_stats       today / this-month counters + stock alerts   │
//! │  sales_report          summary, per-method/status, top products     │
//! │  inventory_report      stock buckets, category rollup, alert lists  │
//! │  payment_summary       completed totals, outstanding credit split   │
//! │  comprehensive_report  daily time series over a date range          │
//! │                                                                     │
//! │  Every sale-derived number respects the caller's visibility         │
//! │  scope; inventory numbers are global. Reads reflect current         │
//! │  committed state; nothing is cached.                                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::product::ProductFilter;
use crate::repository::ProductRepository;
use tradepost_core::{
    visible_sales, Money, PaymentMethod, PaymentState, PaymentStatus, Principal, Product,
    SaleScope, StockStatus, LOW_STOCK_THRESHOLD,
};

/// A sale counts as large outstanding credit once its balance reaches
/// this amount, whether it is fully unpaid or partially settled.
pub const LARGE_CREDIT_THRESHOLD: Money = Money::from_cents(1_000_00);

/// Default window for the daily time series.
const DEFAULT_SERIES_DAYS: u64 = 30;

// =============================================================================
// Report Payloads
// =============================================================================

/// Headline counters for the landing dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub today_sales: i64,
    pub today_revenue: Money,
    pub month_sales: i64,
    pub month_revenue: Money,
    /// Sales not yet fully settled (unpaid + partial), in scope.
    pub pending_sales: i64,
    pub outstanding_balance: Money,
    pub total_products: i64,
    pub low_stock_products: i64,
    pub out_of_stock_products: i64,
}

/// Date-range filter shared by the sales and payment reports.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    /// Inclusive lower bound on created_at.
    pub date_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on created_at.
    pub date_to: Option<DateTime<Utc>>,
    /// Admin-side narrowing; intersected with the caller's scope.
    pub salesperson_id: Option<String>,
}

/// Narrowing for the inventory report.
#[derive(Debug, Clone, Default)]
pub struct InventoryFilter {
    /// Case-insensitive substring match on category.
    pub category: Option<String>,
}

/// The period a report covers, echoed back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ReportPeriod {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Roll-up totals over a set of sales.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SalesSummary {
    pub sale_count: i64,
    pub revenue: Money,
    pub paid: Money,
    pub balance: Money,
}

/// Per-payment-method slice of a sales report.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MethodBreakdown {
    pub payment_method: PaymentMethod,
    pub sale_count: i64,
    pub revenue: Money,
}

/// Per-payment-status slice of a sales report.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StatusBreakdown {
    pub payment_status: PaymentStatus,
    pub sale_count: i64,
    pub revenue: Money,
    pub balance: Money,
}

/// A best-selling product by units sold.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopProduct {
    pub product_sku: String,
    pub product_name: String,
    pub quantity_sold: i64,
    pub revenue: Money,
}

/// Full sales report.
#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub period: ReportPeriod,
    pub summary: SalesSummary,
    pub by_method: Vec<MethodBreakdown>,
    pub by_status: Vec<StatusBreakdown>,
    pub top_products: Vec<TopProduct>,
}

/// Per-category inventory rollup.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryRollup {
    pub category: Option<String>,
    pub product_count: i64,
    pub total_stock: i64,
    pub inventory_value: Money,
}

/// Inventory health report.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    pub total_products: i64,
    pub in_stock: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
    /// Σ price × stock_quantity over active products.
    pub inventory_value: Money,
    pub by_category: Vec<CategoryRollup>,
    pub low_stock_items: Vec<Product>,
    pub out_of_stock_items: Vec<Product>,
}

/// A customer ranked by what they still owe.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Debtor {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub sale_count: i64,
    pub outstanding: Money,
}

/// Payment and outstanding-credit summary.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummary {
    pub period: ReportPeriod,
    /// Completed payment records in the period.
    pub completed_count: i64,
    pub completed_total: Money,
    /// Σ sales.paid over in-scope sales in the period.
    pub sales_paid_total: Money,
    pub unpaid_count: i64,
    pub unpaid_balance: Money,
    pub partial_count: i64,
    pub partial_balance: Money,
    /// Sales with balance at or above [`LARGE_CREDIT_THRESHOLD`].
    pub large_credit_count: i64,
    pub large_credit_balance: Money,
    pub top_debtors: Vec<Debtor>,
}

/// One day of the time series.
#[derive(Debug, Clone, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub sale_count: i64,
    pub revenue: Money,
    pub paid: Money,
    pub balance: Money,
}

/// Daily time series plus totals over a range.
#[derive(Debug, Clone, Serialize)]
pub struct ComprehensiveReport {
    pub period: ReportPeriod,
    pub daily: Vec<DailyPoint>,
    pub summary: SalesSummary,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for read-only report aggregations.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Pushes the caller's scope and an optional extra salesperson
    /// filter onto a query over the `sales` table.
    fn push_sale_scope(
        qb: &mut QueryBuilder<'_, Sqlite>,
        principal: &Principal,
        salesperson_id: &Option<String>,
    ) {
        if let SaleScope::Salesperson(id) = visible_sales(principal) {
            qb.push(" AND salesperson_id = ").push_bind(id);
        }
        if let Some(id) = salesperson_id {
            qb.push(" AND salesperson_id = ").push_bind(id.clone());
        }
    }

    fn push_date_range(
        qb: &mut QueryBuilder<'_, Sqlite>,
        column: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) {
        if let Some(from) = from {
            qb.push(format!(" AND {column} >= ")).push_bind(from);
        }
        if let Some(to) = to {
            qb.push(format!(" AND {column} < ")).push_bind(to);
        }
    }

    async fn sales_summary(
        &self,
        principal: &Principal,
        filter: &ReportFilter,
    ) -> DbResult<SalesSummary> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*) AS sale_count,
                    COALESCE(SUM(total), 0) AS revenue,
                    COALESCE(SUM(paid), 0) AS paid,
                    COALESCE(SUM(balance), 0) AS balance
             FROM sales WHERE 1 = 1",
        );
        Self::push_sale_scope(&mut qb, principal, &filter.salesperson_id);
        Self::push_date_range(&mut qb, "created_at", filter.date_from, filter.date_to);

        let summary = qb
            .build_query_as::<SalesSummary>()
            .fetch_one(&self.pool)
            .await?;
        Ok(summary)
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    /// Headline counters: today and this-month sales, pending credit,
    /// and global stock alerts. Sale numbers follow the caller's scope.
    pub async fn dashboard_stats(&self, principal: &Principal) -> DbResult<DashboardStats> {
        let now = Utc::now();
        let today_start = now
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc();
        let month_start = now
            .date_naive()
            .with_day(1)
            .unwrap_or(now.date_naive())
            .and_time(NaiveTime::MIN)
            .and_utc();

        let today = self
            .sales_summary(
                principal,
                &ReportFilter {
                    date_from: Some(today_start),
                    ..Default::default()
                },
            )
            .await?;
        let month = self
            .sales_summary(
                principal,
                &ReportFilter {
                    date_from: Some(month_start),
                    ..Default::default()
                },
            )
            .await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*), COALESCE(SUM(balance), 0) FROM sales WHERE payment_status != ",
        );
        qb.push_bind(PaymentStatus::Paid);
        Self::push_sale_scope(&mut qb, principal, &None);
        let (pending_sales, outstanding_balance): (i64, Money) =
            qb.build_query_as().fetch_one(&self.pool).await?;

        let (total_products, low_stock_products, out_of_stock_products): (i64, i64, i64) =
            sqlx::query_as(
                "SELECT COUNT(*),
                        COALESCE(SUM(stock_quantity > 0 AND stock_quantity <= ?1), 0),
                        COALESCE(SUM(stock_quantity = 0), 0)
                 FROM products WHERE is_active = 1",
            )
            .bind(LOW_STOCK_THRESHOLD)
            .fetch_one(&self.pool)
            .await?;

        debug!(role = ?principal.role, "Computed dashboard stats");

        Ok(DashboardStats {
            today_sales: today.sale_count,
            today_revenue: today.revenue,
            month_sales: month.sale_count,
            month_revenue: month.revenue,
            pending_sales,
            outstanding_balance,
            total_products,
            low_stock_products,
            out_of_stock_products,
        })
    }

    // =========================================================================
    // Sales Report
    // =========================================================================

    /// Summary, per-method and per-status breakdowns, and the ten
    /// best-selling products by quantity over the period.
    pub async fn sales_report(
        &self,
        principal: &Principal,
        filter: &ReportFilter,
    ) -> DbResult<SalesReport> {
        let summary = self.sales_summary(principal, filter).await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT payment_method,
                    COUNT(*) AS sale_count,
                    COALESCE(SUM(total), 0) AS revenue
             FROM sales WHERE 1 = 1",
        );
        Self::push_sale_scope(&mut qb, principal, &filter.salesperson_id);
        Self::push_date_range(&mut qb, "created_at", filter.date_from, filter.date_to);
        qb.push(" GROUP BY payment_method ORDER BY revenue DESC");
        let by_method = qb
            .build_query_as::<MethodBreakdown>()
            .fetch_all(&self.pool)
            .await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT payment_status,
                    COUNT(*) AS sale_count,
                    COALESCE(SUM(total), 0) AS revenue,
                    COALESCE(SUM(balance), 0) AS balance
             FROM sales WHERE 1 = 1",
        );
        Self::push_sale_scope(&mut qb, principal, &filter.salesperson_id);
        Self::push_date_range(&mut qb, "created_at", filter.date_from, filter.date_to);
        qb.push(" GROUP BY payment_status ORDER BY sale_count DESC");
        let by_status = qb
            .build_query_as::<StatusBreakdown>()
            .fetch_all(&self.pool)
            .await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT i.product_sku,
                    i.product_name,
                    COALESCE(SUM(i.quantity), 0) AS quantity_sold,
                    COALESCE(SUM(i.subtotal), 0) AS revenue
             FROM sale_items i
             JOIN sales s ON s.id = i.sale_id
             WHERE 1 = 1",
        );
        if let SaleScope::Salesperson(id) = visible_sales(principal) {
            qb.push(" AND s.salesperson_id = ").push_bind(id);
        }
        if let Some(id) = &filter.salesperson_id {
            qb.push(" AND s.salesperson_id = ").push_bind(id.clone());
        }
        Self::push_date_range(&mut qb, "s.created_at", filter.date_from, filter.date_to);
        qb.push(
            " GROUP BY i.product_sku, i.product_name
              ORDER BY quantity_sold DESC LIMIT 10",
        );
        let top_products = qb
            .build_query_as::<TopProduct>()
            .fetch_all(&self.pool)
            .await?;

        Ok(SalesReport {
            period: ReportPeriod {
                from: filter.date_from,
                to: filter.date_to,
            },
            summary,
            by_method,
            by_status,
            top_products,
        })
    }

    // =========================================================================
    // Inventory Report
    // =========================================================================

    /// Stock buckets, per-category rollup, and the concrete low/out
    /// item lists. Inventory is global, not role-scoped.
    pub async fn inventory_report(&self, filter: &InventoryFilter) -> DbResult<InventoryReport> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*),
                    COALESCE(SUM(stock_quantity > ",
        );
        qb.push_bind(LOW_STOCK_THRESHOLD);
        qb.push(
            "), 0),
                    COALESCE(SUM(stock_quantity > 0 AND stock_quantity <= ",
        );
        qb.push_bind(LOW_STOCK_THRESHOLD);
        qb.push(
            "), 0),
                    COALESCE(SUM(stock_quantity = 0), 0),
                    COALESCE(SUM(price * stock_quantity), 0)
             FROM products WHERE is_active = 1",
        );
        if let Some(category) = &filter.category {
            qb.push(" AND category LIKE ")
                .push_bind(format!("%{}%", category));
        }
        let (total_products, in_stock, low_stock, out_of_stock, inventory_value): (
            i64,
            i64,
            i64,
            i64,
            Money,
        ) = qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT category,
                    COUNT(*) AS product_count,
                    COALESCE(SUM(stock_quantity), 0) AS total_stock,
                    COALESCE(SUM(price * stock_quantity), 0) AS inventory_value
             FROM products WHERE is_active = 1",
        );
        if let Some(category) = &filter.category {
            qb.push(" AND category LIKE ")
                .push_bind(format!("%{}%", category));
        }
        qb.push(" GROUP BY category ORDER BY inventory_value DESC");
        let by_category = qb
            .build_query_as::<CategoryRollup>()
            .fetch_all(&self.pool)
            .await?;

        let products = ProductRepository::new(self.pool.clone());
        let low_stock_items = products
            .list(&ProductFilter {
                stock_status: Some(StockStatus::LowStock),
                category: filter.category.clone(),
                ..Default::default()
            })
            .await?;
        let out_of_stock_items = products
            .list(&ProductFilter {
                stock_status: Some(StockStatus::OutOfStock),
                category: filter.category.clone(),
                ..Default::default()
            })
            .await?;

        Ok(InventoryReport {
            total_products,
            in_stock,
            low_stock,
            out_of_stock,
            inventory_value,
            by_category,
            low_stock_items,
            out_of_stock_items,
        })
    }

    // =========================================================================
    // Payment Summary
    // =========================================================================

    /// Completed payment totals plus the outstanding-credit picture:
    /// unpaid vs partially paid, large credits, and top debtors.
    pub async fn payment_summary(
        &self,
        principal: &Principal,
        filter: &ReportFilter,
    ) -> DbResult<PaymentSummary> {
        // Completed payment records in the period
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*), COALESCE(SUM(p.amount), 0)
             FROM payments p JOIN sales s ON s.id = p.sale_id
             WHERE p.status = ",
        );
        qb.push_bind(PaymentState::Completed);
        if let SaleScope::Salesperson(id) = visible_sales(principal) {
            qb.push(" AND s.salesperson_id = ").push_bind(id);
        }
        Self::push_date_range(&mut qb, "p.created_at", filter.date_from, filter.date_to);
        let (completed_count, completed_total): (i64, Money) =
            qb.build_query_as().fetch_one(&self.pool).await?;

        // Σ paid across in-scope sales (includes down payments, which
        // have no payment record of their own)
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COALESCE(SUM(paid), 0) FROM sales WHERE 1 = 1");
        Self::push_sale_scope(&mut qb, principal, &filter.salesperson_id);
        Self::push_date_range(&mut qb, "created_at", filter.date_from, filter.date_to);
        let (sales_paid_total,): (Money,) = qb.build_query_as().fetch_one(&self.pool).await?;

        // Outstanding credit split by status; large credits count both
        // unpaid and partial sales once the balance crosses the line
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT payment_status, COUNT(*) AS sale_count,
                    COALESCE(SUM(total), 0) AS revenue,
                    COALESCE(SUM(balance), 0) AS balance
             FROM sales WHERE payment_status != ",
        );
        qb.push_bind(PaymentStatus::Paid);
        Self::push_sale_scope(&mut qb, principal, &filter.salesperson_id);
        Self::push_date_range(&mut qb, "created_at", filter.date_from, filter.date_to);
        qb.push(" GROUP BY payment_status");
        let outstanding = qb
            .build_query_as::<StatusBreakdown>()
            .fetch_all(&self.pool)
            .await?;

        let mut unpaid_count = 0;
        let mut unpaid_balance = Money::zero();
        let mut partial_count = 0;
        let mut partial_balance = Money::zero();
        for row in outstanding {
            match row.payment_status {
                PaymentStatus::Unpaid => {
                    unpaid_count = row.sale_count;
                    unpaid_balance = row.balance;
                }
                PaymentStatus::Partial => {
                    partial_count = row.sale_count;
                    partial_balance = row.balance;
                }
                PaymentStatus::Paid => {}
            }
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*), COALESCE(SUM(balance), 0) FROM sales WHERE balance >= ",
        );
        qb.push_bind(LARGE_CREDIT_THRESHOLD);
        Self::push_sale_scope(&mut qb, principal, &filter.salesperson_id);
        Self::push_date_range(&mut qb, "created_at", filter.date_from, filter.date_to);
        let (large_credit_count, large_credit_balance): (i64, Money) =
            qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT customer_name, customer_phone,
                    COUNT(*) AS sale_count,
                    COALESCE(SUM(balance), 0) AS outstanding
             FROM sales WHERE balance > 0",
        );
        Self::push_sale_scope(&mut qb, principal, &filter.salesperson_id);
        Self::push_date_range(&mut qb, "created_at", filter.date_from, filter.date_to);
        qb.push(
            " GROUP BY customer_name, customer_phone
              ORDER BY outstanding DESC LIMIT 10",
        );
        let top_debtors = qb.build_query_as::<Debtor>().fetch_all(&self.pool).await?;

        Ok(PaymentSummary {
            period: ReportPeriod {
                from: filter.date_from,
                to: filter.date_to,
            },
            completed_count,
            completed_total,
            sales_paid_total,
            unpaid_count,
            unpaid_balance,
            partial_count,
            partial_balance,
            large_credit_count,
            large_credit_balance,
            top_debtors,
        })
    }

    // =========================================================================
    // Comprehensive Report
    // =========================================================================

    /// Daily time series over the range (default: the last 30 days),
    /// with days that saw no sales filled in as zeros.
    pub async fn comprehensive_report(
        &self,
        principal: &Principal,
        filter: &ReportFilter,
    ) -> DbResult<ComprehensiveReport> {
        let now = Utc::now();
        let to = filter.date_to.unwrap_or(now);
        let from = filter.date_from.unwrap_or_else(|| {
            to.date_naive()
                .checked_sub_days(Days::new(DEFAULT_SERIES_DAYS - 1))
                .unwrap_or(to.date_naive())
                .and_time(NaiveTime::MIN)
                .and_utc()
        });

        let effective = ReportFilter {
            date_from: Some(from),
            date_to: Some(to),
            salesperson_id: filter.salesperson_id.clone(),
        };

        let summary = self.sales_summary(principal, &effective).await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT date(created_at) AS day,
                    COUNT(*) AS sale_count,
                    COALESCE(SUM(total), 0) AS revenue,
                    COALESCE(SUM(paid), 0) AS paid,
                    COALESCE(SUM(balance), 0) AS balance
             FROM sales WHERE 1 = 1",
        );
        Self::push_sale_scope(&mut qb, principal, &effective.salesperson_id);
        Self::push_date_range(&mut qb, "created_at", effective.date_from, effective.date_to);
        qb.push(" GROUP BY day ORDER BY day");

        let rows: Vec<(String, i64, Money, Money, Money)> =
            qb.build_query_as().fetch_all(&self.pool).await?;

        // Fill the gaps: the chart wants every day present
        let mut by_day = std::collections::HashMap::new();
        for (day, sale_count, revenue, paid, balance) in rows {
            if let Ok(date) = NaiveDate::parse_from_str(&day, "%Y-%m-%d") {
                by_day.insert(date, (sale_count, revenue, paid, balance));
            }
        }

        let mut daily = Vec::new();
        let mut cursor = from.date_naive();
        let last = to.date_naive();
        while cursor <= last {
            let (sale_count, revenue, paid, balance) = by_day
                .get(&cursor)
                .copied()
                .unwrap_or((0, Money::zero(), Money::zero(), Money::zero()));
            daily.push(DailyPoint {
                date: cursor,
                sale_count,
                revenue,
                paid,
                balance,
            });
            match cursor.checked_add_days(Days::new(1)) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        Ok(ComprehensiveReport {
            period: ReportPeriod {
                from: Some(from),
                to: Some(to),
            },
            daily,
            summary,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{admin, new_product, other_seller, seller, test_db};
    use tradepost_core::{LineItem, NewPayment, NewSale};

    async fn seed_sale(
        db: &crate::pool::Database,
        principal: &Principal,
        product: &Product,
        quantity: i64,
        method: PaymentMethod,
        paid_cents: i64,
    ) {
        db.sales()
            .create_sale(
                principal,
                NewSale {
                    customer_name: Some(format!("Customer of {}", principal.name)),
                    customer_phone: None,
                    payment_method: method,
                    line_items: vec![LineItem {
                        product_id: product.id.clone(),
                        quantity,
                    }],
                    amount_paid: Money::from_cents(paid_cents),
                    notes: None,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dashboard_stats_scoped_by_role() {
        let db = test_db().await;
        let coke = new_product("COKE-330", 10000, 100);
        let empty = new_product("EMPTY-1", 5000, 0);
        db.products().insert(&coke).await.unwrap();
        db.products().insert(&empty).await.unwrap();

        seed_sale(&db, &seller(), &coke, 2, PaymentMethod::Cash, 20000).await;
        seed_sale(&db, &other_seller(), &coke, 3, PaymentMethod::Credit, 0).await;

        let global = db.reports().dashboard_stats(&admin()).await.unwrap();
        assert_eq!(global.today_sales, 2);
        assert_eq!(global.today_revenue, Money::from_cents(50000));
        assert_eq!(global.pending_sales, 1);
        assert_eq!(global.outstanding_balance, Money::from_cents(30000));
        assert_eq!(global.total_products, 2);
        assert_eq!(global.out_of_stock_products, 1);

        let own = db.reports().dashboard_stats(&seller()).await.unwrap();
        assert_eq!(own.today_sales, 1);
        assert_eq!(own.today_revenue, Money::from_cents(20000));
        assert_eq!(own.pending_sales, 0);
        // Stock alerts stay global
        assert_eq!(own.total_products, 2);
    }

    #[tokio::test]
    async fn test_sales_report_breakdowns_and_top_products() {
        let db = test_db().await;
        let coke = new_product("COKE-330", 10000, 100);
        let rice = new_product("RICE-5KG", 50000, 100);
        db.products().insert(&coke).await.unwrap();
        db.products().insert(&rice).await.unwrap();

        seed_sale(&db, &seller(), &coke, 5, PaymentMethod::Cash, 50000).await;
        seed_sale(&db, &seller(), &rice, 2, PaymentMethod::Credit, 0).await;

        let report = db
            .reports()
            .sales_report(&admin(), &ReportFilter::default())
            .await
            .unwrap();

        assert_eq!(report.summary.sale_count, 2);
        assert_eq!(report.summary.revenue, Money::from_cents(150000));
        assert_eq!(report.summary.paid, Money::from_cents(50000));
        assert_eq!(report.summary.balance, Money::from_cents(100000));

        assert_eq!(report.by_method.len(), 2);
        let cash = report
            .by_method
            .iter()
            .find(|m| m.payment_method == PaymentMethod::Cash)
            .unwrap();
        assert_eq!(cash.sale_count, 1);
        assert_eq!(cash.revenue, Money::from_cents(50000));

        let statuses: Vec<_> = report.by_status.iter().map(|s| s.payment_status).collect();
        assert!(statuses.contains(&PaymentStatus::Paid));
        assert!(statuses.contains(&PaymentStatus::Unpaid));

        // Coke sold 5 units, rice 2
        assert_eq!(report.top_products[0].product_sku, "COKE-330");
        assert_eq!(report.top_products[0].quantity_sold, 5);
    }

    #[tokio::test]
    async fn test_inventory_report_buckets_and_value() {
        let db = test_db().await;
        let mut plenty = new_product("PLENTY-1", 1000, 50);
        plenty.category = Some("Drinks".to_string());
        let mut low = new_product("LOW-1", 2000, 3);
        low.category = Some("Drinks".to_string());
        let gone = new_product("GONE-1", 3000, 0);
        db.products().insert(&plenty).await.unwrap();
        db.products().insert(&low).await.unwrap();
        db.products().insert(&gone).await.unwrap();

        let report = db
            .reports()
            .inventory_report(&InventoryFilter::default())
            .await
            .unwrap();

        assert_eq!(report.total_products, 3);
        assert_eq!(report.in_stock, 1);
        assert_eq!(report.low_stock, 1);
        assert_eq!(report.out_of_stock, 1);
        // 50×1000 + 3×2000 + 0×3000
        assert_eq!(report.inventory_value, Money::from_cents(56000));

        assert_eq!(report.low_stock_items.len(), 1);
        assert_eq!(report.low_stock_items[0].sku, "LOW-1");
        assert_eq!(report.out_of_stock_items.len(), 1);
        assert_eq!(report.out_of_stock_items[0].sku, "GONE-1");

        let drinks = report
            .by_category
            .iter()
            .find(|c| c.category.as_deref() == Some("Drinks"))
            .unwrap();
        assert_eq!(drinks.product_count, 2);
        assert_eq!(drinks.total_stock, 53);
    }

    #[tokio::test]
    async fn test_payment_summary_splits_outstanding_credit() {
        let db = test_db().await;
        let item = new_product("BULK-1", 100000, 100);
        db.products().insert(&item).await.unwrap();

        // Unpaid 100k; partial 200k with 50k down; fully paid 100k
        seed_sale(&db, &seller(), &item, 1, PaymentMethod::Credit, 0).await;
        seed_sale(&db, &seller(), &item, 2, PaymentMethod::Credit, 50000).await;
        seed_sale(&db, &seller(), &item, 1, PaymentMethod::Cash, 100000).await;

        // One recorded payment of 20k against the unpaid sale
        let unpaid = db
            .sales()
            .list(
                &admin(),
                &crate::repository::sale::SaleFilter {
                    payment_status: Some(PaymentStatus::Unpaid),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        db.payments()
            .apply_payment(
                &admin(),
                NewPayment {
                    sale_id: unpaid[0].id.clone(),
                    amount: Money::from_cents(20000),
                    payment_method: PaymentMethod::Cash,
                    reference: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let summary = db
            .reports()
            .payment_summary(&admin(), &ReportFilter::default())
            .await
            .unwrap();

        assert_eq!(summary.completed_count, 1);
        assert_eq!(summary.completed_total, Money::from_cents(20000));
        // 0 + 20k + 50k + 100k across all sales
        assert_eq!(summary.sales_paid_total, Money::from_cents(170000));

        // Both open sales are now partial (80k and 150k balances)
        assert_eq!(summary.unpaid_count, 0);
        assert_eq!(summary.partial_count, 2);
        assert_eq!(summary.partial_balance, Money::from_cents(230000));

        // Large credit counts partial sales too
        assert_eq!(summary.large_credit_count, 1);
        assert_eq!(summary.large_credit_balance, Money::from_cents(150000));

        // Both open sales share one customer, so the debtor rollup
        // combines their balances
        assert_eq!(summary.top_debtors.len(), 1);
        assert_eq!(summary.top_debtors[0].sale_count, 2);
        assert_eq!(summary.top_debtors[0].outstanding, Money::from_cents(230000));
    }

    #[tokio::test]
    async fn test_comprehensive_report_fills_empty_days() {
        let db = test_db().await;
        let coke = new_product("COKE-330", 10000, 100);
        db.products().insert(&coke).await.unwrap();

        seed_sale(&db, &seller(), &coke, 1, PaymentMethod::Cash, 10000).await;

        let report = db
            .reports()
            .comprehensive_report(&admin(), &ReportFilter::default())
            .await
            .unwrap();

        // Default window: 30 daily points, today last
        assert_eq!(report.daily.len(), 30);
        let today = report.daily.last().unwrap();
        assert_eq!(today.sale_count, 1);
        assert_eq!(today.revenue, Money::from_cents(10000));

        // Earlier days exist as zeros
        assert_eq!(report.daily[0].sale_count, 0);
        assert!(report.daily[0].revenue.is_zero());

        assert_eq!(report.summary.sale_count, 1);
    }
}
