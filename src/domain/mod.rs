//! Domain model: cart snapshots, orders, notifications, catalog rows.

pub mod cart;
pub mod notification;
pub mod order;
pub mod product;
