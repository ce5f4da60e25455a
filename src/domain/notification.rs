//! Customer notifications emitted on order status transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::OrderStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub related_id: Option<Uuid>,
    pub related_type: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// A notification about to be persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}

impl NotificationDraft {
    /// The fixed status-to-message mapping. Total over all statuses: anything
    /// without a dedicated message falls back to a generic update notice.
    pub fn for_status_change(
        order_number: &str,
        status: OrderStatus,
        reason: Option<&str>,
    ) -> Self {
        match status {
            OrderStatus::Processing => Self {
                title: "Order confirmed".to_string(),
                message: format!(
                    "Your order {order_number} has been confirmed and is being prepared."
                ),
                kind: NotificationKind::Success,
            },
            OrderStatus::Shipping => Self {
                title: "Order on the way".to_string(),
                message: format!("Your order {order_number} is out for delivery."),
                kind: NotificationKind::Info,
            },
            OrderStatus::Completed => Self {
                title: "Order delivered".to_string(),
                message: format!(
                    "Your order {order_number} has been delivered. Thank you for shopping with us!"
                ),
                kind: NotificationKind::Success,
            },
            OrderStatus::Canceled => Self {
                title: "Order canceled".to_string(),
                message: match reason {
                    Some(reason) => {
                        format!("Your order {order_number} was canceled: {reason}")
                    }
                    None => format!("Your order {order_number} was canceled."),
                },
                kind: NotificationKind::Error,
            },
            other => Self {
                title: "Order updated".to_string(),
                message: format!(
                    "The status of your order {order_number} changed to {other}."
                ),
                kind: NotificationKind::Info,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_is_a_success_naming_the_order() {
        let draft =
            NotificationDraft::for_status_change("ORD-00001234", OrderStatus::Processing, None);
        assert_eq!(draft.kind, NotificationKind::Success);
        assert!(draft.message.contains("ORD-00001234"));
    }

    #[test]
    fn cancellation_carries_the_reason_when_present() {
        let draft = NotificationDraft::for_status_change(
            "ORD-00001234",
            OrderStatus::Canceled,
            Some("out of stock"),
        );
        assert_eq!(draft.kind, NotificationKind::Error);
        assert!(draft.message.contains("out of stock"));

        let bare = NotificationDraft::for_status_change("ORD-00001234", OrderStatus::Canceled, None);
        assert!(!bare.message.contains(':'));
    }

    #[test]
    fn every_status_maps_to_a_draft() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipping,
            OrderStatus::Completed,
            OrderStatus::Canceled,
        ] {
            let draft = NotificationDraft::for_status_change("ORD-1", status, None);
            assert!(!draft.title.is_empty());
            assert!(draft.message.contains("ORD-1"));
        }
    }
}
