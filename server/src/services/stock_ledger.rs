// storefront/src/services/stock_ledger.rs

//! Per-product stock counts.
//!
//! Every operation locks the product row first, so the lock is held until the enclosing
//! transaction finishes and concurrent reservations on the same product serialise. Callers touching
//! several products go through the `BTreeMap` helpers, which visit products in ascending id order.

use crate::errors::{AppError, Result};
use crate::store::StoreTx;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// Sums quantities per product. A total that does not fit in an `i32` is a validation error.
pub fn aggregate(lines: impl IntoIterator<Item = (i64, i32)>) -> Result<BTreeMap<i64, i32>> {
  let mut totals: BTreeMap<i64, i32> = BTreeMap::new();
  for (product_id, quantity) in lines {
    let total = totals.entry(product_id).or_insert(0);
    *total = total
      .checked_add(quantity)
      .ok_or_else(|| AppError::Validation(format!("Quantity for product {} is too large", product_id)))?;
  }
  Ok(totals)
}

async fn locked_stock(tx: &mut dyn StoreTx, product_id: i64) -> Result<i32> {
  tx.lock_product_stock(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))
}

/// Takes `quantity` units out of stock, failing with `InsufficientStock` when fewer are available.
/// Returns the remaining stock.
#[instrument(name = "stock_ledger::reserve", skip(tx), err(Display))]
pub async fn reserve(tx: &mut dyn StoreTx, product_id: i64, quantity: i32) -> Result<i32> {
  if quantity <= 0 {
    return Err(AppError::Validation(format!(
      "Quantity for product {} must be positive",
      product_id
    )));
  }
  let available = locked_stock(tx, product_id).await?;
  if available < quantity {
    warn!(available, "Insufficient stock.");
    return Err(AppError::InsufficientStock {
      product_id,
      requested: quantity,
      available,
    });
  }
  let remaining = tx.adjust_product_stock(product_id, -quantity).await?;
  debug!(remaining, "Stock reserved.");
  Ok(remaining)
}

/// Puts `quantity` units back into stock. Returns the new stock.
#[instrument(name = "stock_ledger::restore", skip(tx), err(Display))]
pub async fn restore(tx: &mut dyn StoreTx, product_id: i64, quantity: i32) -> Result<i32> {
  if quantity < 0 {
    return Err(AppError::Internal(format!(
      "Cannot restore a negative quantity for product {}",
      product_id
    )));
  }
  locked_stock(tx, product_id).await?;
  let stock = tx.adjust_product_stock(product_id, quantity).await?;
  debug!(stock, "Stock restored.");
  Ok(stock)
}

pub async fn reserve_many(tx: &mut dyn StoreTx, quantities: &BTreeMap<i64, i32>) -> Result<()> {
  for (&product_id, &quantity) in quantities {
    reserve(tx, product_id, quantity).await?;
  }
  Ok(())
}

pub async fn restore_many(tx: &mut dyn StoreTx, quantities: &BTreeMap<i64, i32>) -> Result<()> {
  for (&product_id, &quantity) in quantities {
    restore(tx, product_id, quantity).await?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{MemoryStore, Store};
  use rust_decimal::Decimal;

  #[test]
  fn aggregate_sums_per_product_in_id_order() {
    let totals = aggregate([(9, 1), (3, 2), (9, 4)]).unwrap();
    assert_eq!(totals.into_iter().collect::<Vec<_>>(), vec![(3, 2), (9, 5)]);
  }

  #[test]
  fn aggregate_rejects_totals_past_i32() {
    assert!(matches!(aggregate([(1, i32::MAX), (1, 1)]), Err(AppError::Validation(_))));
    assert!(aggregate([(1, i32::MAX), (2, 1)]).is_ok());
  }

  #[tokio::test]
  async fn reserve_and_restore_move_stock() {
    let store = MemoryStore::new();
    let product = store.add_product("Lamp", Decimal::new(1500, 2), 3).await;

    let mut tx = store.begin().await.unwrap();
    assert_eq!(reserve(tx.as_mut(), product, 2).await.unwrap(), 1);
    let err = reserve(tx.as_mut(), product, 2).await.unwrap_err();
    assert!(matches!(
      err,
      AppError::InsufficientStock {
        requested: 2,
        available: 1,
        ..
      }
    ));
    assert_eq!(restore(tx.as_mut(), product, 2).await.unwrap(), 3);
    tx.commit().await.unwrap();

    assert_eq!(store.product_stock(product).await, Some(3));
  }

  #[tokio::test]
  async fn unknown_product_is_not_found() {
    let store = MemoryStore::new();
    let mut tx = store.begin().await.unwrap();
    assert!(matches!(reserve(tx.as_mut(), 42, 1).await, Err(AppError::NotFound(_))));
    assert!(matches!(restore(tx.as_mut(), 42, 1).await, Err(AppError::NotFound(_))));
    tx.rollback().await.unwrap();
  }
}
