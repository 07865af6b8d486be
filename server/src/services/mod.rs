// storefront/src/services/mod.rs

//! Transaction-scoped building blocks shared by the workflows.

pub mod cart_snapshot;
pub mod discount_resolver;
pub mod stock_ledger;
