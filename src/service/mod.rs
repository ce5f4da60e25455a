//! Service layer: session cart, checkout, order lifecycle, and read models.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod notifications;
pub mod orders;
pub mod reports;
