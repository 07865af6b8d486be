// storefront/src/models/mod.rs

//! Row types for the order lifecycle tables.

pub mod cart_item;
pub mod discount;
pub mod order;
pub mod order_item;
pub mod product;
pub mod return_request;

pub use cart_item::{Cart, CartItem, CartLine};
pub use discount::Discount;
pub use order::{Order, OrderDetails, OrderStatus, OrderSummary, PaymentMethod, PaymentStatus};
pub use order_item::{OrderDetailItem, OrderedItem};
pub use product::Product;
pub use return_request::{ReturnItem, ReturnRequest, ReturnStatus};
