//! Discount arithmetic.
//!
//! A merchant discount stacks onto whatever markdown the variant already
//! shows. The *anchor* is the higher of the current price and the
//! compare-at price; the existing gap between anchor and current price is
//! expressed as a percentage and the merchant percentage is added to it.
//! The new price is taken off the anchor, so the storefront's "% off" badge
//! (derived from compare-at) stays truthful.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("invalid price \"{value}\": {reason}")]
    InvalidPrice { value: String, reason: String },

    #[error("negative price {0} cannot be discounted")]
    NegativePrice(Decimal),

    #[error("arithmetic overflow computing discounted price")]
    Overflow,
}

/// Result of applying a merchant discount to a variant's current prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountPlan {
    /// Reference price the discount is taken from; written as the new compare-at.
    pub anchor: Decimal,
    /// Markdown already present before the merchant discount, in percent.
    pub existing_percent: Decimal,
    /// `existing_percent + merchant_percent`.
    pub total_percent: Decimal,
    /// Discounted price, clamped at zero and rounded to cents.
    pub new_price: Decimal,
}

impl DiscountPlan {
    /// New price formatted for the storefront, e.g. `"70.00"`.
    #[must_use]
    pub fn new_price_string(&self) -> String {
        format_price(self.new_price)
    }

    /// Anchor formatted for use as the compare-at price.
    #[must_use]
    pub fn compare_at_string(&self) -> String {
        format_price(self.anchor)
    }
}

/// Computes the stacked discount for a variant.
///
/// # Errors
///
/// Returns [`PricingError::NegativePrice`] if `current` is negative, or
/// [`PricingError::Overflow`] if the arithmetic does not fit a `Decimal`.
pub fn plan_discount(
    current: Decimal,
    compare_at: Option<Decimal>,
    merchant_percent: Decimal,
) -> Result<DiscountPlan, PricingError> {
    if current < Decimal::ZERO {
        return Err(PricingError::NegativePrice(current));
    }

    let anchor = match compare_at {
        Some(reference) if reference > current => reference,
        _ => current,
    };

    let existing_percent = if current < anchor && !anchor.is_zero() {
        (anchor - current)
            .checked_div(anchor)
            .and_then(|ratio| ratio.checked_mul(HUNDRED))
            .ok_or(PricingError::Overflow)?
    } else {
        Decimal::ZERO
    };

    let total_percent = existing_percent
        .checked_add(merchant_percent)
        .ok_or(PricingError::Overflow)?;

    let raw = total_percent
        .checked_div(HUNDRED)
        .and_then(|fraction| Decimal::ONE.checked_sub(fraction))
        .and_then(|keep| anchor.checked_mul(keep))
        .ok_or(PricingError::Overflow)?;

    let clamped = raw.max(Decimal::ZERO);

    Ok(DiscountPlan {
        anchor,
        existing_percent,
        total_percent,
        new_price: round_cents(clamped),
    })
}

/// Parses a storefront price string such as `"19.99"`.
///
/// # Errors
///
/// Returns [`PricingError::InvalidPrice`] if the string is not a decimal number.
pub fn parse_price(value: &str) -> Result<Decimal, PricingError> {
    Decimal::from_str(value.trim()).map_err(|e| PricingError::InvalidPrice {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Formats a price with exactly two decimal places.
#[must_use]
pub fn format_price(price: Decimal) -> String {
    let mut rounded = round_cents(price);
    rounded.rescale(2);
    // `-0.00` can appear when a tiny negative rounds to zero.
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded.to_string()
}

fn round_cents(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
#[path = "pricing_test.rs"]
mod tests;
