// storefront/src/services/cart_snapshot.rs

//! Resolves a cart selection into priced lines, locked for the rest of the transaction.

use crate::errors::{AppError, Result};
use crate::models::CartLine;
use crate::services::stock_ledger;
use crate::store::StoreTx;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument, warn};

/// What the caller wants to check out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartSelection {
  /// Explicit cart items; all must belong to one cart of the caller.
  Items(Vec<i64>),
  /// Every item of the cart.
  Cart(i64),
}

#[derive(Debug, Clone)]
pub struct CartSnapshot {
  pub cart_id: i64,
  pub lines: Vec<CartLine>,
}

impl CartSnapshot {
  pub fn subtotal(&self) -> Decimal {
    self.lines.iter().map(CartLine::line_total).sum()
  }

  pub fn cart_item_ids(&self) -> Vec<i64> {
    self.lines.iter().map(|l| l.cart_item_id).collect()
  }

  /// Quantities per product, in ascending product id.
  pub fn quantities_by_product(&self) -> Result<BTreeMap<i64, i32>> {
    stock_ledger::aggregate(self.lines.iter().map(|l| (l.product_id, l.quantity)))
  }
}

#[instrument(name = "cart_snapshot::read", skip(tx), err(Display))]
pub async fn read(tx: &mut dyn StoreTx, user_id: i64, selection: &CartSelection) -> Result<CartSnapshot> {
  let snapshot = match selection {
    CartSelection::Items(ids) => read_items(tx, user_id, ids).await?,
    CartSelection::Cart(cart_id) => read_cart(tx, user_id, *cart_id).await?,
  };
  if snapshot.lines.is_empty() {
    return Err(AppError::EmptyCart);
  }
  debug!(cart_id = snapshot.cart_id, lines = snapshot.lines.len(), "Cart snapshot taken.");
  Ok(snapshot)
}

async fn lock_owned_cart(tx: &mut dyn StoreTx, user_id: i64, cart_id: i64) -> Result<()> {
  match tx.lock_cart(cart_id).await? {
    Some(cart) if cart.user_id == user_id => Ok(()),
    Some(_) => {
      warn!(cart_id, "Cart belongs to another user.");
      Err(AppError::CartNotFound)
    }
    None => Err(AppError::CartNotFound),
  }
}

async fn read_cart(tx: &mut dyn StoreTx, user_id: i64, cart_id: i64) -> Result<CartSnapshot> {
  lock_owned_cart(tx, user_id, cart_id).await?;
  let ids: Vec<i64> = tx.lock_items_of_cart(cart_id).await?.iter().map(|i| i.id).collect();
  if ids.is_empty() {
    return Err(AppError::EmptyCart);
  }
  let lines = tx.price_cart_items(&ids).await?;
  Ok(CartSnapshot { cart_id, lines })
}

async fn read_items(tx: &mut dyn StoreTx, user_id: i64, requested: &[i64]) -> Result<CartSnapshot> {
  let ids: Vec<i64> = requested.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
  if ids.is_empty() {
    return Err(AppError::EmptyCart);
  }

  // Unlocked lookup to find the owning cart, so the cart row is locked before its items.
  let discovered = tx.price_cart_items(&ids).await?;
  if discovered.len() != ids.len() {
    return Err(AppError::CartNotFound);
  }
  let carts: BTreeSet<i64> = discovered.iter().map(|l| l.cart_id).collect();
  let cart_id = match carts.into_iter().collect::<Vec<_>>().as_slice() {
    [only] => *only,
    _ => {
      return Err(AppError::Validation(
        "Cart items must all belong to the same cart".to_string(),
      ))
    }
  };

  lock_owned_cart(tx, user_id, cart_id).await?;
  let locked = tx.lock_cart_items(&ids).await?;
  if locked.len() != ids.len() || locked.iter().any(|item| item.cart_id != cart_id) {
    // Removed or moved between the lookup and the lock.
    return Err(AppError::CartNotFound);
  }

  let lines = tx.price_cart_items(&ids).await?;
  Ok(CartSnapshot { cart_id, lines })
}
