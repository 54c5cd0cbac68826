//! Global risk parameters, their hard limits, and per-account overrides.
//!
//! Everything an admin can set is validated here before it reaches the ledger.
//! The one cross-field rule: the liquidation spread stays strictly below the
//! margin ratio.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Hard ceilings on admin-settable values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    pub margin_ratio_max: Decimal,
    pub liquidation_spread_max: Decimal,
    pub earnings_rate_max: Decimal,
    pub margin_premium_max: Decimal,
    pub spread_premium_max: Decimal,
    pub min_borrowed_value_max: Decimal,
    pub max_number_of_markets_with_balances_min: usize,
    pub max_number_of_markets_with_balances_max: usize,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            margin_ratio_max: dec!(2.0),
            liquidation_spread_max: dec!(0.5),
            earnings_rate_max: dec!(1.0),
            margin_premium_max: dec!(2.0),
            spread_premium_max: dec!(2.0),
            min_borrowed_value_max: dec!(100),
            max_number_of_markets_with_balances_min: 2,
            max_number_of_markets_with_balances_max: 64,
        }
    }
}

/// Margin ratio and spread applied to one account instead of the globals.
/// Both zero means "no override".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountRiskOverride {
    pub margin_ratio: Decimal,
    pub liquidation_spread: Decimal,
}

impl AccountRiskOverride {
    pub fn new(margin_ratio: Decimal, liquidation_spread: Decimal) -> Self {
        Self { margin_ratio, liquidation_spread }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        !self.margin_ratio.is_zero() || !self.liquidation_spread.is_zero()
    }

    pub fn validate(&self, limits: &RiskLimits) -> Result<(), RiskParamError> {
        non_negative(self.margin_ratio, "Ratio")?;
        non_negative(self.liquidation_spread, "Spread")?;
        if self.margin_ratio.is_zero() || self.liquidation_spread.is_zero() {
            if self.is_set() {
                return Err(RiskParamError::OverrideHalfSet);
            }
            return Ok(());
        }
        if self.liquidation_spread >= self.margin_ratio {
            return Err(RiskParamError::SpreadNotBelowRatio);
        }
        if self.margin_ratio > limits.margin_ratio_max {
            return Err(RiskParamError::RatioTooHigh);
        }
        if self.liquidation_spread > limits.liquidation_spread_max {
            return Err(RiskParamError::SpreadTooHigh);
        }
        Ok(())
    }
}

/** global parameters shared by every account and market */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Extra collateral required over debt, e.g. 0.15 means 115%.
    pub margin_ratio: Decimal,
    /// Liquidator bonus over the oracle exchange rate.
    pub liquidation_spread: Decimal,
    /// Share of borrower interest passed to suppliers.
    pub earnings_rate: Decimal,
    /// Smallest debt value an account may keep open.
    pub min_borrowed_value: Decimal,
    pub account_max_number_of_markets_with_balances: usize,
    /// Gas handed to a liquidation callback.
    pub callback_gas_limit: u64,
    pub default_account_risk_override: AccountRiskOverride,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            margin_ratio: dec!(0.15),
            liquidation_spread: dec!(0.05),
            earnings_rate: dec!(0.9),
            min_borrowed_value: Decimal::ZERO,
            account_max_number_of_markets_with_balances: 32,
            callback_gas_limit: 2_000_000,
            default_account_risk_override: AccountRiskOverride::none(),
        }
    }
}

impl RiskParams {
    pub fn validate(&self, limits: &RiskLimits) -> Result<(), RiskParamError> {
        check_margin_ratio(self.margin_ratio, self.liquidation_spread, limits)?;
        check_liquidation_spread(self.liquidation_spread, self.margin_ratio, limits)?;
        check_earnings_rate(self.earnings_rate, limits)?;
        check_min_borrowed_value(self.min_borrowed_value, limits)?;
        check_max_number_of_markets(self.account_max_number_of_markets_with_balances, limits)?;
        self.default_account_risk_override.validate(limits)
    }
}

fn non_negative(value: Decimal, name: &'static str) -> Result<(), RiskParamError> {
    if value < Decimal::ZERO {
        return Err(RiskParamError::Negative(name));
    }
    Ok(())
}

pub fn check_margin_ratio(ratio: Decimal, spread: Decimal, limits: &RiskLimits) -> Result<(), RiskParamError> {
    non_negative(ratio, "Ratio")?;
    if ratio > limits.margin_ratio_max {
        return Err(RiskParamError::RatioTooHigh);
    }
    if ratio <= spread {
        return Err(RiskParamError::RatioNotAboveSpread);
    }
    Ok(())
}

pub fn check_liquidation_spread(spread: Decimal, ratio: Decimal, limits: &RiskLimits) -> Result<(), RiskParamError> {
    non_negative(spread, "Spread")?;
    if spread > limits.liquidation_spread_max {
        return Err(RiskParamError::SpreadTooHigh);
    }
    if spread >= ratio {
        return Err(RiskParamError::SpreadNotBelowRatio);
    }
    Ok(())
}

pub fn check_earnings_rate(rate: Decimal, limits: &RiskLimits) -> Result<(), RiskParamError> {
    non_negative(rate, "Rate")?;
    if rate > limits.earnings_rate_max {
        return Err(RiskParamError::RateTooHigh);
    }
    Ok(())
}

pub fn check_earnings_rate_override(rate: Decimal, limits: &RiskLimits) -> Result<(), RiskParamError> {
    non_negative(rate, "Earnings rate override")?;
    if rate > limits.earnings_rate_max {
        return Err(RiskParamError::EarningsRateOverrideTooHigh);
    }
    Ok(())
}

pub fn check_min_borrowed_value(value: Decimal, limits: &RiskLimits) -> Result<(), RiskParamError> {
    non_negative(value, "Value")?;
    if value > limits.min_borrowed_value_max {
        return Err(RiskParamError::ValueTooHigh);
    }
    Ok(())
}

pub fn check_max_number_of_markets(count: usize, limits: &RiskLimits) -> Result<(), RiskParamError> {
    if count < limits.max_number_of_markets_with_balances_min {
        return Err(RiskParamError::MaxMarketsTooLow);
    }
    if count > limits.max_number_of_markets_with_balances_max {
        return Err(RiskParamError::MaxMarketsTooHigh);
    }
    Ok(())
}

pub fn check_margin_premium(premium: Decimal, limits: &RiskLimits) -> Result<(), RiskParamError> {
    non_negative(premium, "Margin premium")?;
    if premium > limits.margin_premium_max {
        return Err(RiskParamError::MarginPremiumTooHigh);
    }
    Ok(())
}

pub fn check_spread_premium(premium: Decimal, limits: &RiskLimits) -> Result<(), RiskParamError> {
    non_negative(premium, "Spread premium")?;
    if premium > limits.spread_premium_max {
        return Err(RiskParamError::SpreadPremiumTooHigh);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RiskParamError {
    #[error("Ratio too high")]
    RatioTooHigh,

    #[error("Ratio cannot be <= spread")]
    RatioNotAboveSpread,

    #[error("Spread too high")]
    SpreadTooHigh,

    #[error("Spread cannot be >= ratio")]
    SpreadNotBelowRatio,

    #[error("Rate too high")]
    RateTooHigh,

    #[error("Earnings rate override too high")]
    EarningsRateOverrideTooHigh,

    #[error("Value too high")]
    ValueTooHigh,

    #[error("Max number of markets too low")]
    MaxMarketsTooLow,

    #[error("Max number of markets too high")]
    MaxMarketsTooHigh,

    #[error("Margin premium too high")]
    MarginPremiumTooHigh,

    #[error("Spread premium too high")]
    SpreadPremiumTooHigh,

    #[error("Spread and ratio must both be 0")]
    OverrideHalfSet,

    #[error("{0} cannot be negative")]
    Negative(&'static str),
}
