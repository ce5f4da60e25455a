//! Session cart: a map of product id to a quantity/price snapshot.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::Product;
use crate::error::CartError;

/// What to do when a requested quantity exceeds the known stock.
///
/// `Clamp` is the reference behavior: the quantity is capped at the stock
/// value and the operation succeeds. `Reject` surfaces a stock conflict
/// instead. This is a product decision, so it is configurable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QuantityPolicy {
    #[default]
    Clamp,
    Reject,
}

/// One line of a cart. Name, price, and stock are snapshots taken when the
/// line was last written, not live references to the product.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub stock_at_snapshot: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A session-scoped cart. One per session, never shared.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: HashMap<Uuid, CartLine>,
}

impl Cart {
    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    pub fn get(&self, product_id: Uuid) -> Option<&CartLine> {
        self.lines.get(&product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn distinct_products(&self) -> usize {
        self.lines.len()
    }

    /// Sum of quantities across all lines.
    pub fn item_count(&self) -> u32 {
        self.lines.values().map(|l| l.quantity).sum()
    }

    /// Sum of line totals.
    pub fn total(&self) -> Decimal {
        self.lines.values().map(|l| l.line_total()).sum()
    }

    /// Adds `quantity` of `product`, merging into an existing line if one is
    /// present. The resulting quantity is bounded by the product's current
    /// stock according to `policy`; the stock snapshot is refreshed either way.
    pub fn add_line(
        &mut self,
        product: &Product,
        quantity: u32,
        policy: QuantityPolicy,
    ) -> Result<(), CartError> {
        let stock = product.available();
        let current = self.lines.get(&product.id).map_or(0, |l| l.quantity);
        let requested = current.saturating_add(quantity);
        let granted = Self::bound(product.id, requested, stock, policy)?;

        self.lines.insert(
            product.id,
            CartLine {
                product_id: product.id,
                product_name: product.name.clone(),
                image_url: product.image_url.clone(),
                unit_price: product.price,
                quantity: granted,
                stock_at_snapshot: stock,
            },
        );
        Ok(())
    }

    /// Sets the quantity of an existing line, bounded by the line's recorded
    /// stock snapshot (not re-fetched from the live product). A quantity of
    /// zero removes the line. Missing lines are a no-op.
    pub fn set_quantity(
        &mut self,
        product_id: Uuid,
        quantity: u32,
        policy: QuantityPolicy,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            self.lines.remove(&product_id);
            return Ok(());
        }
        let Some(line) = self.lines.get_mut(&product_id) else {
            return Ok(());
        };
        line.quantity = Self::bound(product_id, quantity, line.stock_at_snapshot, policy)?;
        Ok(())
    }

    /// Removes a line; returns whether it was present.
    pub fn remove(&mut self, product_id: Uuid) -> bool {
        self.lines.remove(&product_id).is_some()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    fn bound(
        product_id: Uuid,
        requested: u32,
        stock: u32,
        policy: QuantityPolicy,
    ) -> Result<u32, CartError> {
        if requested <= stock {
            return Ok(requested);
        }
        match policy {
            QuantityPolicy::Clamp => Ok(stock),
            QuantityPolicy::Reject => Err(CartError::StockConflict {
                product_id,
                available: stock,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::test_product;

    #[test]
    fn totals_track_lines() {
        let mut cart = Cart::default();
        let a = test_product("Wildflower Honey", Decimal::new(10, 0), 10);
        let b = test_product("Beeswax Candle", Decimal::new(5, 0), 10);
        cart.add_line(&a, 2, QuantityPolicy::Clamp).unwrap();
        cart.add_line(&b, 1, QuantityPolicy::Clamp).unwrap();

        assert_eq!(cart.total(), Decimal::new(25, 0));
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.distinct_products(), 2);

        cart.set_quantity(a.id, 1, QuantityPolicy::Clamp).unwrap();
        assert_eq!(cart.total(), Decimal::new(15, 0));
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn add_merges_and_clamps_to_stock() {
        let mut cart = Cart::default();
        let p = test_product("Acacia Honey", Decimal::new(12, 0), 3);
        cart.add_line(&p, 5, QuantityPolicy::Clamp).unwrap();
        assert_eq!(cart.get(p.id).unwrap().quantity, 3);

        cart.add_line(&p, 2, QuantityPolicy::Clamp).unwrap();
        // Already at stock, merge cannot push past it.
        assert_eq!(cart.get(p.id).unwrap().quantity, 3);
        assert_eq!(cart.distinct_products(), 1);
    }

    #[test]
    fn reject_policy_surfaces_conflict() {
        let mut cart = Cart::default();
        let p = test_product("Clover Honey", Decimal::new(8, 0), 2);
        cart.add_line(&p, 2, QuantityPolicy::Reject).unwrap();

        let err = cart.add_line(&p, 1, QuantityPolicy::Reject).unwrap_err();
        match err {
            CartError::StockConflict { available, .. } => assert_eq!(available, 2),
            other => panic!("unexpected error: {other}"),
        }
        // The failed add must not have touched the line.
        assert_eq!(cart.get(p.id).unwrap().quantity, 2);
    }

    #[test]
    fn zero_quantity_update_removes_line() {
        let mut cart = Cart::default();
        let p = test_product("Honeycomb", Decimal::new(20, 0), 5);
        cart.add_line(&p, 2, QuantityPolicy::Clamp).unwrap();

        cart.set_quantity(p.id, 0, QuantityPolicy::Clamp).unwrap();
        assert!(cart.is_empty());

        let mut other = Cart::default();
        other.add_line(&p, 2, QuantityPolicy::Clamp).unwrap();
        other.remove(p.id);
        assert!(other.is_empty());
    }

    #[test]
    fn update_clamps_to_recorded_snapshot() {
        let mut cart = Cart::default();
        let p = test_product("Propolis", Decimal::new(15, 0), 4);
        cart.add_line(&p, 1, QuantityPolicy::Clamp).unwrap();

        cart.set_quantity(p.id, 9, QuantityPolicy::Clamp).unwrap();
        assert_eq!(cart.get(p.id).unwrap().quantity, 4);
    }

    #[test]
    fn update_of_missing_line_is_noop() {
        let mut cart = Cart::default();
        cart.set_quantity(Uuid::new_v4(), 3, QuantityPolicy::Clamp)
            .unwrap();
        assert!(cart.is_empty());
        assert!(!cart.remove(Uuid::new_v4()));
    }
}
