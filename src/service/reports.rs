//! Dashboard summary queries for the back office.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::product::Product;
use crate::error::StoreError;

const LOW_STOCK_THRESHOLD: i32 = 10;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub orders_completed_today: i64,
    pub revenue_today: Decimal,
    pub revenue_this_month: Decimal,
    pub pending_orders: i64,
    pub shipping_orders: i64,
    pub canceled_orders: i64,
    pub total_orders: i64,
    pub total_customers: i64,
    pub active_products: i64,
    pub low_stock: Vec<Product>,
    pub top_products: Vec<TopProduct>,
}

/// One round of dashboard figures. Revenue counts COMPLETED orders only.
pub async fn summary(db: &PgPool) -> Result<DashboardSummary, StoreError> {
    let (orders_completed_today, revenue_today): (i64, Decimal) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(total_amount), 0) FROM orders \
         WHERE status = 'COMPLETED' AND created_at >= date_trunc('day', NOW())",
    )
    .fetch_one(db)
    .await?;

    let (revenue_this_month,): (Decimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(total_amount), 0) FROM orders \
         WHERE status = 'COMPLETED' AND created_at >= date_trunc('month', NOW())",
    )
    .fetch_one(db)
    .await?;

    let (pending_orders,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders WHERE status IN ('PENDING', 'PROCESSING')",
    )
    .fetch_one(db)
    .await?;

    let (shipping_orders,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE status = 'SHIPPING'")
            .fetch_one(db)
            .await?;

    let (canceled_orders,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE status = 'CANCELED'")
            .fetch_one(db)
            .await?;

    let (total_orders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(db)
        .await?;

    let (total_customers,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers")
        .fetch_one(db)
        .await?;

    let (active_products,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM products WHERE is_active")
            .fetch_one(db)
            .await?;

    let low_stock = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE is_active AND stock <= $1 ORDER BY stock",
    )
    .bind(LOW_STOCK_THRESHOLD)
    .fetch_all(db)
    .await?;

    let top_products = sqlx::query_as::<_, TopProduct>(
        "SELECT oi.product_id, oi.product_name, \
                SUM(oi.quantity)::bigint AS total_quantity, \
                COALESCE(SUM(oi.line_total), 0) AS total_revenue \
         FROM order_items oi \
         JOIN orders o ON o.id = oi.order_id \
         WHERE o.status = 'COMPLETED' \
         GROUP BY oi.product_id, oi.product_name \
         ORDER BY total_quantity DESC LIMIT 10",
    )
    .fetch_all(db)
    .await?;

    Ok(DashboardSummary {
        orders_completed_today,
        revenue_today,
        revenue_this_month,
        pending_orders,
        shipping_orders,
        canceled_orders,
        total_orders,
        total_customers,
        active_products,
        low_stock,
        top_products,
    })
}
