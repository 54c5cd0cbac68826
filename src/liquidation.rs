//! Liquidation math.
//!
//! A liquidator repays an account's debt in the owed market and receives the
//! account's collateral in the held market at the oracle exchange rate plus a
//! spread. This module holds the pure parts: the spread for a market pair,
//! the spread-adjusted prices, owed/held conversions and the owed-leg bounds.
//! Sequencing and balance mutation live in the engine.

use crate::risk::AccountRiskOverride;
use crate::types::{get_partial, get_partial_round_up, one_plus, Par, Price, Wei};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Longest revert reason kept from a failed liquidation callback.
pub const MAX_CALLBACK_REASON_CHARS: usize = 188;

/// Return payloads above this are treated as a failure with no reason.
pub const MAX_CALLBACK_RETURN_BYTES: usize = 256;

/// Spread for liquidating `owed` against `held`. An account override replaces
/// the global spread and both premiums.
pub fn liquidation_spread_for_pair(
    global_spread: Decimal,
    held_spread_premium: Decimal,
    owed_spread_premium: Decimal,
    account_override: &AccountRiskOverride,
) -> Decimal {
    if account_override.is_set() {
        return account_override.liquidation_spread;
    }
    global_spread * one_plus(held_spread_premium) * one_plus(owed_spread_premium)
}

/// Held price and owed price marked up by the spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationPrices {
    pub held: Price,
    pub owed_adjusted: Price,
}

impl LiquidationPrices {
    pub fn new(held_price: Price, owed_price: Price, spread: Decimal) -> Self {
        let adjusted = owed_price.value() + owed_price.value() * spread;
        Self {
            held: held_price,
            owed_adjusted: Price::new_unchecked(adjusted),
        }
    }

    /// Collateral paid out for repaying `owed_wei`. rounds down.
    pub fn owed_wei_to_held_wei(&self, owed_wei: Wei) -> Wei {
        Wei::new(get_partial(owed_wei.value(), self.owed_adjusted.value(), self.held.value()))
    }

    /// Debt that `held_wei` of collateral pays for. rounds up.
    pub fn held_wei_to_owed_wei(&self, held_wei: Wei) -> Wei {
        Wei::new(get_partial_round_up(held_wei.value(), self.held.value(), self.owed_adjusted.value()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiquidationError {
    #[error("Owed balance cannot be positive")]
    OwedBalancePositive,

    #[error("Owed balance cannot increase")]
    OwedBalanceIncrease,

    #[error("Collateral cannot be negative")]
    CollateralNegative,

    #[error("Excess cannot be negative")]
    ExcessNegative,
}

/// Clamp a requested repayment of a debt.
///
/// Over-repaying stops at zero, the debt may never grow, and a repayment too
/// small to move any par repays nothing.
pub fn bound_owed_repayment(
    old_par: Par,
    old_wei: Wei,
    requested_par: Par,
    requested_delta_wei: Wei,
) -> Result<(Par, Wei), LiquidationError> {
    if old_par.is_positive() {
        return Err(LiquidationError::OwedBalancePositive);
    }

    let (mut new_par, mut delta_wei) = (requested_par, requested_delta_wei);
    if new_par.is_positive() {
        new_par = Par::zero();
        delta_wei = old_wei.negate();
    }

    if delta_wei.is_negative() || new_par.abs() > old_par.abs() {
        return Err(LiquidationError::OwedBalanceIncrease);
    }

    if old_par == new_par {
        delta_wei = Wei::zero();
    }
    Ok((new_par, delta_wei))
}

/// Cut a callback revert reason down to what gets logged.
pub fn truncate_callback_reason(reason: &str) -> String {
    reason.chars().take(MAX_CALLBACK_REASON_CHARS).collect()
}
