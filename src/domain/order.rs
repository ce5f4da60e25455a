//! Orders and their immutable line-item snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Admin-driven order status. Wire values are the uppercase names.
///
/// Unknown strings are rejected at the API edge, but no transition graph is
/// enforced beyond that: any parsed status may follow any other, matching the
/// reference behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipping,
    Completed,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Shipping => "SHIPPING",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "SHIPPING" => Some(Self::Shipping),
            "COMPLETED" => Some(Self::Completed),
            "CANCELED" => Some(Self::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub total_amount: Decimal,
    pub address: String,
    pub phone: String,
    pub status: String,
    /// Only meaningful while status is CANCELED; cleared on any other status.
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A frozen snapshot of one cart line at order time. Later product changes
/// must never alter these rows.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Human-facing order reference, e.g. `ORD-58201734`.
pub fn order_number() -> String {
    format!("ORD-{:08}", rand::random::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_wire_strings() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipping,
            OrderStatus::Completed,
            OrderStatus::Canceled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_eq!(OrderStatus::parse("REFUNDED"), None);
        assert_eq!(OrderStatus::parse("pending"), None);
        assert_eq!(OrderStatus::parse(""), None);
    }
}
