//! Notification outbox queries, polled by the customer UI.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::notification::Notification;
use crate::error::StoreError;

pub async fn unread_count(db: &PgPool, user_id: Uuid) -> Result<i64, StoreError> {
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read")
            .bind(user_id)
            .fetch_one(db)
            .await?;
    Ok(count.0)
}

pub async fn recent(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<Notification>, StoreError> {
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit.clamp(1, 100))
    .fetch_all(db)
    .await?;
    Ok(notifications)
}

/// Marks one notification read; false when it does not exist or belongs to
/// someone else.
pub async fn mark_read(db: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE, read_at = NOW() \
         WHERE id = $1 AND user_id = $2 AND NOT is_read",
    )
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Marks every unread notification read; returns how many were touched.
pub async fn mark_all_read(db: &PgPool, user_id: Uuid) -> Result<u64, StoreError> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE, read_at = NOW() \
         WHERE user_id = $1 AND NOT is_read",
    )
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}
