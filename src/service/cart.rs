//! Session-backed cart store and its durable login/logout synchronization.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::cart::{Cart, QuantityPolicy};
use crate::domain::product::{Product, UserCartItem};
use crate::error::{CartError, StoreError};
use crate::session::{SessionContext, SessionStore};

const CART_KEY: &str = "cart";

/// The authoritative in-session view of what a visitor intends to buy.
///
/// Every mutation re-reads, rewrites, and re-saves the whole cart blob; the
/// session store never sees partial updates.
#[derive(Clone)]
pub struct CartService {
    sessions: Arc<dyn SessionStore>,
    policy: QuantityPolicy,
}

impl CartService {
    pub fn new(sessions: Arc<dyn SessionStore>, policy: QuantityPolicy) -> Self {
        Self { sessions, policy }
    }

    /// Reads the session cart. An absent or corrupt payload is an empty
    /// cart; corruption is never surfaced to the caller.
    pub async fn get(&self, ctx: &SessionContext) -> Cart {
        match self.sessions.get(&ctx.session_id, CART_KEY).await {
            Some(raw) => serde_json::from_slice(&raw).unwrap_or_default(),
            None => Cart::default(),
        }
    }

    /// Adds a product the caller has already resolved and validated
    /// (active, in stock, positive quantity).
    pub async fn add(
        &self,
        ctx: &SessionContext,
        product: &Product,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        let mut cart = self.get(ctx).await;
        cart.add_line(product, quantity, self.policy)?;
        self.save(ctx, &cart).await?;
        Ok(cart)
    }

    /// Sets a line's quantity; zero or negative removes the line.
    pub async fn update_quantity(
        &self,
        ctx: &SessionContext,
        product_id: Uuid,
        quantity: i64,
    ) -> Result<Cart, CartError> {
        let mut cart = self.get(ctx).await;
        if quantity <= 0 {
            cart.remove(product_id);
        } else {
            let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            cart.set_quantity(product_id, quantity, self.policy)?;
        }
        self.save(ctx, &cart).await?;
        Ok(cart)
    }

    pub async fn remove(&self, ctx: &SessionContext, product_id: Uuid) -> Result<Cart, CartError> {
        let mut cart = self.get(ctx).await;
        cart.remove(product_id);
        self.save(ctx, &cart).await?;
        Ok(cart)
    }

    /// Drops the cart key from the session entirely.
    pub async fn clear(&self, ctx: &SessionContext) {
        self.sessions.delete(&ctx.session_id, CART_KEY).await;
    }

    pub async fn item_count(&self, ctx: &SessionContext) -> u32 {
        self.get(ctx).await.item_count()
    }

    pub async fn total(&self, ctx: &SessionContext) -> Decimal {
        self.get(ctx).await.total()
    }

    /// Replaces the session cart with the user's saved cart rows, dropping
    /// anything saved for products that went inactive or out of stock.
    /// Restored quantities are clamped to current stock regardless of the
    /// configured policy; restoring is not a user action to reject.
    pub async fn restore_on_login(
        &self,
        db: &PgPool,
        ctx: &SessionContext,
    ) -> Result<Cart, CartError> {
        let Some(user_id) = ctx.user_id else {
            return Ok(self.get(ctx).await);
        };

        self.clear(ctx).await;

        let saved = sqlx::query_as::<_, UserCartItem>(
            "SELECT * FROM user_cart_items WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(db)
        .await
        .map_err(StoreError::from)?;

        let mut cart = Cart::default();
        for item in saved {
            if item.quantity <= 0 {
                continue;
            }
            let product = sqlx::query_as::<_, Product>(
                "SELECT * FROM products WHERE id = $1 AND is_active AND stock > 0",
            )
            .bind(item.product_id)
            .fetch_optional(db)
            .await
            .map_err(StoreError::from)?;

            if let Some(product) = product {
                cart.add_line(&product, item.quantity as u32, QuantityPolicy::Clamp)?;
            }
        }

        self.save(ctx, &cart).await?;
        tracing::info!(user_id = %user_id, lines = cart.distinct_products(), "restored saved cart");
        Ok(cart)
    }

    /// Replaces the user's saved cart rows with the current session cart and
    /// drops the session cart. Lines with non-positive quantities are skipped.
    pub async fn persist_on_logout(
        &self,
        db: &PgPool,
        ctx: &SessionContext,
    ) -> Result<(), CartError> {
        let Some(user_id) = ctx.user_id else {
            self.clear(ctx).await;
            return Ok(());
        };

        let cart = self.get(ctx).await;

        let mut tx = db.begin().await.map_err(StoreError::from)?;
        sqlx::query("DELETE FROM user_cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;

        for line in cart.lines().filter(|l| l.quantity > 0) {
            sqlx::query(
                "INSERT INTO user_cart_items (id, user_id, product_id, quantity, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, NOW(), NOW())",
            )
            .bind(Uuid::now_v7())
            .bind(user_id)
            .bind(line.product_id)
            .bind(line.quantity as i32)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;
        }
        tx.commit().await.map_err(StoreError::from)?;

        self.clear(ctx).await;
        tracing::info!(user_id = %user_id, "saved cart on logout");
        Ok(())
    }

    async fn save(&self, ctx: &SessionContext, cart: &Cart) -> Result<(), CartError> {
        let raw = serde_json::to_vec(cart)?;
        self.sessions.put(&ctx.session_id, CART_KEY, raw).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::test_product;
    use crate::session::MemorySessionStore;
    use std::time::Duration;

    fn service(policy: QuantityPolicy) -> CartService {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
        CartService::new(store, policy)
    }

    #[tokio::test]
    async fn add_and_read_back() {
        let cart = service(QuantityPolicy::Clamp);
        let ctx = SessionContext::anonymous("s1");
        let p = test_product("Raw Honey", Decimal::new(1050, 2), 10);

        cart.add(&ctx, &p, 2).await.unwrap();
        let read = cart.get(&ctx).await;
        assert_eq!(read.item_count(), 2);
        assert_eq!(read.total(), Decimal::new(2100, 2));
        assert_eq!(cart.item_count(&ctx).await, 2);
        assert_eq!(cart.total(&ctx).await, Decimal::new(2100, 2));
    }

    #[tokio::test]
    async fn carts_are_isolated_per_session() {
        let cart = service(QuantityPolicy::Clamp);
        let a = SessionContext::anonymous("a");
        let b = SessionContext::anonymous("b");
        let p = test_product("Honey", Decimal::new(10, 0), 10);

        cart.add(&a, &p, 1).await.unwrap();
        assert!(cart.get(&b).await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_payload_reads_as_empty_cart() {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
        let cart = CartService::new(store.clone(), QuantityPolicy::Clamp);
        let ctx = SessionContext::anonymous("s1");

        store.put("s1", "cart", b"{not json".to_vec()).await;
        assert!(cart.get(&ctx).await.is_empty());
        assert_eq!(cart.total(&ctx).await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn update_to_zero_removes_and_clear_drops_key() {
        let cart = service(QuantityPolicy::Clamp);
        let ctx = SessionContext::anonymous("s1");
        let p = test_product("Honey", Decimal::new(10, 0), 10);

        cart.add(&ctx, &p, 3).await.unwrap();
        let updated = cart.update_quantity(&ctx, p.id, 0).await.unwrap();
        assert!(updated.is_empty());

        cart.add(&ctx, &p, 3).await.unwrap();
        cart.clear(&ctx).await;
        assert!(cart.get(&ctx).await.is_empty());
    }

    #[tokio::test]
    async fn reject_policy_propagates_conflict() {
        let cart = service(QuantityPolicy::Reject);
        let ctx = SessionContext::anonymous("s1");
        let p = test_product("Honey", Decimal::new(10, 0), 3);

        let err = cart.add(&ctx, &p, 5).await.unwrap_err();
        assert!(matches!(err, CartError::StockConflict { .. }));
        // Nothing was written.
        assert!(cart.get(&ctx).await.is_empty());
    }

    #[tokio::test]
    async fn clamp_policy_caps_at_stock() {
        let cart = service(QuantityPolicy::Clamp);
        let ctx = SessionContext::anonymous("s1");
        let p = test_product("Honey", Decimal::new(10, 0), 3);

        let result = cart.add(&ctx, &p, 5).await.unwrap();
        assert_eq!(result.get(p.id).unwrap().quantity, 3);
    }
}
