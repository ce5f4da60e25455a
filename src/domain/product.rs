//! Catalog and customer rows referenced by the cart and order core.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub short_desc: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Stock as a cart-facing quantity; negative inventory reads as zero.
    pub fn available(&self) -> u32 {
        self.stock.max(0) as u32
    }
}

/// A buyer record, keyed by phone number at checkout time.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A cart line saved to the durable store across login/logout boundaries.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserCartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
pub fn test_product(name: &str, price: Decimal, stock: i32) -> Product {
    Product {
        id: Uuid::new_v4(),
        category_id: None,
        name: name.to_string(),
        short_desc: None,
        description: None,
        price,
        image_url: None,
        stock,
        is_active: true,
        created_at: Utc::now(),
        updated_at: None,
    }
}
