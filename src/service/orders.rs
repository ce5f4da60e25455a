//! Order browsing and the admin-driven status transition.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::notification::NotificationDraft;
use crate::domain::order::{Order, OrderItem, OrderStatus};
use crate::error::{OrderUpdateError, StoreError};

#[derive(Clone, Debug, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Matched against address, phone, and buyer name.
    pub search: Option<String>,
    pub user_id: Option<Uuid>,
    pub page: u32,
    pub per_page: u32,
}

pub async fn list(db: &PgPool, filter: &OrderFilter) -> Result<(Vec<Order>, i64), StoreError> {
    let page = filter.page.max(1);
    let per_page = filter.per_page.clamp(1, 100);
    let status = filter.status.map(|s| s.as_str());

    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders \
         WHERE ($1::text IS NULL OR status = $1) \
           AND ($2::text IS NULL OR address ILIKE '%' || $2 || '%' \
                OR phone LIKE '%' || $2 || '%' OR full_name ILIKE '%' || $2 || '%') \
           AND ($3::uuid IS NULL OR user_id = $3) \
         ORDER BY created_at DESC LIMIT $4 OFFSET $5",
    )
    .bind(status)
    .bind(filter.search.as_deref())
    .bind(filter.user_id)
    .bind(per_page as i64)
    .bind(((page - 1) * per_page) as i64)
    .fetch_all(db)
    .await?;

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders \
         WHERE ($1::text IS NULL OR status = $1) \
           AND ($2::text IS NULL OR address ILIKE '%' || $2 || '%' \
                OR phone LIKE '%' || $2 || '%' OR full_name ILIKE '%' || $2 || '%') \
           AND ($3::uuid IS NULL OR user_id = $3)",
    )
    .bind(status)
    .bind(filter.search.as_deref())
    .bind(filter.user_id)
    .fetch_one(db)
    .await?;

    Ok((orders, total.0))
}

pub async fn details(
    db: &PgPool,
    id: Uuid,
) -> Result<Option<(Order, Vec<OrderItem>)>, StoreError> {
    let Some(order) = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
    else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = $1 ORDER BY product_name",
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    Ok(Some((order, items)))
}

#[derive(Debug, Serialize)]
struct StatusEvent<'a> {
    order_id: Uuid,
    order_number: &'a str,
    status: &'a str,
}

/// Applies an admin status update.
///
/// The status write and the customer notification share one transaction, so
/// an order never ends up updated without its notification. The rejection
/// reason is kept only for cancellations and cleared on every other status.
pub async fn update_status(
    db: &PgPool,
    nats: Option<&async_nats::Client>,
    id: Uuid,
    status: OrderStatus,
    reason: Option<String>,
) -> Result<Order, OrderUpdateError> {
    let reason = match status {
        OrderStatus::Canceled => reason.filter(|r| !r.trim().is_empty()),
        _ => None,
    };

    let mut tx = db.begin().await.map_err(StoreError::from)?;

    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $2, rejection_reason = $3, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(reason.as_deref())
    .fetch_optional(&mut *tx)
    .await
    .map_err(StoreError::from)?
    .ok_or(OrderUpdateError::NotFound)?;

    if let Some(user_id) = order.user_id {
        let draft =
            NotificationDraft::for_status_change(&order.order_number, status, reason.as_deref());
        sqlx::query(
            "INSERT INTO notifications (id, user_id, title, message, kind, related_id, \
                                        related_type, is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 'ORDER', FALSE, NOW())",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(&draft.title)
        .bind(&draft.message)
        .bind(draft.kind.as_str())
        .bind(order.id)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from)?;
    }

    tx.commit().await.map_err(StoreError::from)?;
    tracing::info!(order_id = %order.id, status = %status, "order status updated");

    if let Some(client) = nats {
        let event = StatusEvent {
            order_id: order.id,
            order_number: &order.order_number,
            status: status.as_str(),
        };
        match serde_json::to_vec(&event) {
            Ok(payload) => {
                if let Err(e) = client.publish("orders.status".to_string(), payload.into()).await {
                    tracing::warn!(error = %e, "failed to publish order status event");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode order status event"),
        }
    }

    Ok(order)
}
