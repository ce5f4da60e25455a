//! Error taxonomy for the storefront core.
//!
//! Everything that can fail at a service boundary surfaces as one of these
//! typed errors; HTTP handlers translate them to status codes at the edge.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Failures raised by the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failures raised by cart operations.
///
/// Reads never fail: an absent or corrupt session payload is treated as an
/// empty cart. Writes fail only under the `Reject` quantity policy or when
/// the session blob cannot be re-encoded.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("only {available} of product {product_id} left in stock")]
    StockConflict { product_id: Uuid, available: u32 },

    #[error("cart serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("login required")]
    NotAuthenticated,

    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid checkout fields: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum OrderUpdateError {
    #[error("order not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}
