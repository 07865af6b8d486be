// storefront/src/services/discount_resolver.rs

use crate::errors::{AppError, Result};
use crate::store::StoreTx;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, instrument};

/// How an order names its discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountRef {
  Id(i64),
  Code(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDiscount {
  pub discount_id: Option<i64>,
  pub amount: Decimal,
}

impl ResolvedDiscount {
  pub const NONE: ResolvedDiscount = ResolvedDiscount {
    discount_id: None,
    amount: Decimal::ZERO,
  };
}

/// Rounds to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
  amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn discount_amount(subtotal: Decimal, percentage: i32) -> Decimal {
  round_money(subtotal * Decimal::from(percentage) / Decimal::ONE_HUNDRED)
}

/// Looks up the discount and prices it against `subtotal`. No reference means no discount.
#[instrument(name = "discount_resolver::resolve", skip(tx), err(Display))]
pub async fn resolve(
  tx: &mut dyn StoreTx,
  discount: Option<&DiscountRef>,
  subtotal: Decimal,
  now: DateTime<Utc>,
) -> Result<ResolvedDiscount> {
  let Some(reference) = discount else {
    return Ok(ResolvedDiscount::NONE);
  };
  let found = match reference {
    DiscountRef::Id(id) => tx.find_discount_by_id(*id).await?,
    DiscountRef::Code(code) => tx.find_discount_by_code(code.trim()).await?,
  };
  let discount = found
    .filter(|d| d.is_active_at(now) && (1..=100).contains(&d.percentage))
    .ok_or(AppError::InvalidOrExpiredDiscount)?;

  let amount = discount_amount(subtotal, discount.percentage);
  debug!(discount_id = discount.id, percentage = discount.percentage, %amount, "Discount applied.");
  Ok(ResolvedDiscount {
    discount_id: Some(discount.id),
    amount,
  })
}
