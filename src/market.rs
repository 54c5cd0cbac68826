//! Market configuration and state.
//!
//! A market is one token the ledger lends and borrows. Besides its risk
//! premiums and caps it carries the interest index and the aggregate par that
//! every balance change keeps in sync.

use crate::interest::{accrue_index, total_wei, Index, TotalPar};
use crate::oracle::{InterestRateModel, PriceOracle};
use crate::types::{Address, MarketId, Timestamp, Wei};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Listing parameters for a new market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketParams {
    pub token: Address,
    /// Scales the margin requirement for balances in this market.
    pub margin_premium: Decimal,
    /// Scales the liquidation spread for pairs involving this market.
    pub liquidation_spread_premium: Decimal,
    /// Zero means uncapped.
    pub max_supply_wei: Wei,
    /// Magnitude of the borrow cap. zero means uncapped.
    pub max_borrow_wei: Wei,
    /// Zero means use the global earnings rate.
    pub earnings_rate_override: Decimal,
    pub is_closing: bool,
}

impl MarketParams {
    pub fn new(token: Address) -> Self {
        Self {
            token,
            margin_premium: Decimal::ZERO,
            liquidation_spread_premium: Decimal::ZERO,
            max_supply_wei: Wei::zero(),
            max_borrow_wei: Wei::zero(),
            earnings_rate_override: Decimal::ZERO,
            is_closing: false,
        }
    }

    pub fn with_margin_premium(mut self, premium: Decimal) -> Self {
        self.margin_premium = premium;
        self
    }

    pub fn with_spread_premium(mut self, premium: Decimal) -> Self {
        self.liquidation_spread_premium = premium;
        self
    }

    pub fn with_caps(mut self, max_supply_wei: Wei, max_borrow_wei: Wei) -> Self {
        self.max_supply_wei = max_supply_wei;
        self.max_borrow_wei = max_borrow_wei;
        self
    }
}

/// Runtime state of a listed market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub token: Address,
    pub margin_premium: Decimal,
    pub liquidation_spread_premium: Decimal,
    pub max_supply_wei: Wei,
    pub max_borrow_wei: Wei,
    pub earnings_rate_override: Decimal,
    pub is_closing: bool,
    pub index: Index,
    pub total_par: TotalPar,
    /// Tokens physically held by the ledger for this market.
    pub token_balance: Wei,
}

impl Market {
    pub fn new(id: MarketId, params: &MarketParams, now: Timestamp) -> Self {
        Self {
            id,
            token: params.token,
            margin_premium: params.margin_premium,
            liquidation_spread_premium: params.liquidation_spread_premium,
            max_supply_wei: params.max_supply_wei,
            max_borrow_wei: params.max_borrow_wei,
            earnings_rate_override: params.earnings_rate_override,
            is_closing: params.is_closing,
            index: Index::new(now),
            total_par: TotalPar::default(),
            token_balance: Wei::zero(),
        }
    }

    pub fn earnings_rate(&self, global: Decimal) -> Decimal {
        if self.earnings_rate_override.is_zero() {
            global
        } else {
            self.earnings_rate_override
        }
    }

    /// (supply wei, borrow wei magnitude) at the current index.
    pub fn total_wei(&self) -> (Wei, Wei) {
        total_wei(&self.total_par, &self.index)
    }

    /// Copy of this market with its index rolled forward to `now`.
    pub fn accrued(&self, rate_per_second: Decimal, global_earnings_rate: Decimal, now: Timestamp) -> Market {
        let index = accrue_index(
            &self.index,
            &self.total_par,
            rate_per_second,
            self.earnings_rate(global_earnings_rate),
            now,
        );
        Market { index, ..self.clone() }
    }

    /// Tokens held beyond what suppliers are owed, counting outstanding borrows
    /// as owed back to the ledger. Negative means the ledger is short.
    pub fn excess_tokens(&self) -> Wei {
        let (supply, borrow) = self.total_wei();
        self.token_balance.add(borrow).sub(supply)
    }
}

/// External collaborators attached to a market.
#[derive(Clone)]
pub struct MarketHooks {
    pub oracle: Rc<dyn PriceOracle>,
    pub interest_model: Rc<dyn InterestRateModel>,
}

impl MarketHooks {
    pub fn new(oracle: Rc<dyn PriceOracle>, interest_model: Rc<dyn InterestRateModel>) -> Self {
        Self { oracle, interest_model }
    }
}

impl fmt::Debug for MarketHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketHooks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Par;
    use rust_decimal_macros::dec;

    #[test]
    fn earnings_override_wins_when_set() {
        let mut market = Market::new(MarketId(0), &MarketParams::new(Address(7)), Timestamp::from_secs(0));
        assert_eq!(market.earnings_rate(dec!(0.9)), dec!(0.9));
        market.earnings_rate_override = dec!(0.5);
        assert_eq!(market.earnings_rate(dec!(0.9)), dec!(0.5));
    }

    #[test]
    fn accrued_leaves_original_untouched() {
        let mut market = Market::new(MarketId(0), &MarketParams::new(Address(7)), Timestamp::from_secs(0));
        market.total_par.replace(Par::zero(), Par::new(dec!(-100)));

        let next = market.accrued(dec!(0.01), dec!(0.9), Timestamp::from_secs(10));
        assert_eq!(next.index.borrow, dec!(1.1));
        assert_eq!(market.index.borrow, dec!(1));
        assert_eq!(next.total_par, market.total_par);
    }

    #[test]
    fn excess_counts_borrows_as_owed_back() {
        let mut market = Market::new(MarketId(0), &MarketParams::new(Address(7)), Timestamp::from_secs(0));
        // 100 supplied, 40 lent out
        market.total_par.replace(Par::zero(), Par::new(dec!(100)));
        market.total_par.replace(Par::zero(), Par::new(dec!(-40)));
        market.token_balance = Wei::new(dec!(60));
        assert!(market.excess_tokens().is_zero());

        market.token_balance = Wei::new(dec!(75));
        assert_eq!(market.excess_tokens().value(), dec!(15));
    }
}
