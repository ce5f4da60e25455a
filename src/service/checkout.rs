//! Checkout: converts a non-empty session cart into a durable order.

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::cart::{Cart, CartLine};
use crate::domain::order::{self, Order};
use crate::error::{CheckoutError, StoreError};
use crate::service::cart::CartService;
use crate::session::SessionContext;

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(custom = "not_blank")]
    pub full_name: String,
    #[validate(custom = "not_blank")]
    pub phone: String,
    #[validate(custom = "not_blank")]
    pub address: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Confirms checkout for the session's cart.
///
/// The customer upsert, the order row, and every line item land in one
/// transaction; a failure at any step leaves the store untouched and the
/// cart intact. The cart is cleared only after commit, so the order's total
/// and line items are exactly the cart's state at the moment of confirmation.
pub async fn confirm(
    db: &PgPool,
    cart_service: &CartService,
    ctx: &SessionContext,
    req: CheckoutRequest,
) -> Result<Order, CheckoutError> {
    let user_id = ctx.user_id.ok_or(CheckoutError::NotAuthenticated)?;
    req.validate()?;

    let cart = cart_service.get(ctx).await;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    let total = cart.total();

    let mut tx = db.begin().await.map_err(StoreError::from)?;

    // Customers are keyed by phone number; a repeat phone overwrites the
    // stored name and address (last-write-wins, no merge).
    let customer_id: Uuid = sqlx::query_scalar(
        "INSERT INTO customers (id, user_id, full_name, phone, address, is_active, created_at) \
         VALUES ($1, $2, $3, $4, $5, TRUE, NOW()) \
         ON CONFLICT (phone) DO UPDATE SET full_name = EXCLUDED.full_name, address = EXCLUDED.address \
         RETURNING id",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(req.full_name.trim())
    .bind(req.phone.trim())
    .bind(req.address.trim())
    .fetch_one(&mut *tx)
    .await
    .map_err(StoreError::from)?;

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, order_number, customer_id, user_id, full_name, total_amount, \
                             address, phone, status, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'PENDING', NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(order::order_number())
    .bind(customer_id)
    .bind(user_id)
    .bind(req.full_name.trim())
    .bind(total)
    .bind(req.address.trim())
    .bind(req.phone.trim())
    .fetch_one(&mut *tx)
    .await
    .map_err(StoreError::from)?;

    for line in frozen_lines(&cart) {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, product_name, quantity, \
                                      unit_price, line_total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity as i32)
        .bind(line.unit_price)
        .bind(line.line_total())
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from)?;
    }

    tx.commit().await.map_err(StoreError::from)?;
    cart_service.clear(ctx).await;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = %total,
        "checkout confirmed"
    );
    Ok(order)
}

/// The cart lines as they will be frozen into order items, in a stable order.
fn frozen_lines(cart: &Cart) -> Vec<&CartLine> {
    let mut lines: Vec<&CartLine> = cart.lines().collect();
    lines.sort_by(|a, b| a.product_name.cmp(&b.product_name));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::QuantityPolicy;
    use crate::domain::product::test_product;
    use rust_decimal::Decimal;

    fn valid_request() -> CheckoutRequest {
        CheckoutRequest {
            full_name: "Alice".to_string(),
            phone: "0900000000".to_string(),
            address: "1 Main St".to_string(),
        }
    }

    #[test]
    fn blank_fields_fail_validation() {
        assert!(valid_request().validate().is_ok());

        let mut blank_name = valid_request();
        blank_name.full_name = "   ".to_string();
        assert!(blank_name.validate().is_err());

        let mut empty_phone = valid_request();
        empty_phone.phone = String::new();
        assert!(empty_phone.validate().is_err());
    }

    #[test]
    fn frozen_lines_preserve_the_cart_snapshot() {
        let mut cart = Cart::default();
        let a = test_product("Wildflower Honey", Decimal::new(10, 0), 10);
        let b = test_product("Beeswax Candle", Decimal::new(5, 0), 10);
        cart.add_line(&a, 2, QuantityPolicy::Clamp).unwrap();
        cart.add_line(&b, 1, QuantityPolicy::Clamp).unwrap();

        let lines = frozen_lines(&cart);
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines.iter().map(|l| l.line_total()).sum::<Decimal>(),
            cart.total()
        );
        assert_eq!(cart.total(), Decimal::new(25, 0));
        // Stable ordering by name.
        assert_eq!(lines[0].product_name, "Beeswax Candle");
        assert_eq!(lines[1].product_name, "Wildflower Honey");
    }
}
