//! Interest accrual, oracle reads and account valuation.

use super::core::Ledger;
use super::results::EngineError;
use crate::liquidation::{liquidation_spread_for_pair, LiquidationPrices};
use crate::margin::{effective_margin_ratio, AccountValues};
use crate::market::{Market, MarketHooks};
use crate::types::{AccountInfo, Address, MarketId, Price};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

impl Ledger {
    pub(super) fn hooks(&self, market_id: MarketId) -> Result<&MarketHooks, EngineError> {
        self.hooks
            .get(&market_id)
            .ok_or(EngineError::MarketNotFound(market_id))
    }

    /// Current per-second borrow rate from the market's model.
    pub fn interest_rate(&self, market_id: MarketId) -> Result<Decimal, EngineError> {
        let market = self.state.market(market_id)?;
        let (supply_wei, borrow_wei) = market.total_wei();
        Ok(self
            .hooks(market_id)?
            .interest_model
            .get_interest_rate(market.token, borrow_wei, supply_wei))
    }

    /// The market as it would look accrued up to now. Leaves the ledger untouched.
    pub fn accrued_market(&self, market_id: MarketId) -> Result<Market, EngineError> {
        let rate = self.interest_rate(market_id)?;
        let market = self.state.market(market_id)?;
        Ok(market.accrued(rate, self.risk_params.earnings_rate, self.current_time))
    }

    /// Accrue one market in place.
    pub(super) fn accrue(&mut self, market_id: MarketId) -> Result<&Market, EngineError> {
        let next = self.accrued_market(market_id)?;
        let slot = self.state.market_mut(market_id)?;
        *slot = next;
        Ok(slot)
    }

    /// Oracle price, rejected unless positive.
    pub fn price(&self, market_id: MarketId) -> Result<Price, EngineError> {
        let market = self.state.market(market_id)?;
        let raw = self.hooks(market_id)?.oracle.get_price(market.token);
        Price::new(raw).ok_or(EngineError::InvalidOraclePrice(market_id))
    }

    /// Spread paid for liquidating `owed` against `held` on an account of `owner`.
    pub fn liquidation_spread(
        &self,
        owner: Address,
        held_market: MarketId,
        owed_market: MarketId,
    ) -> Result<Decimal, EngineError> {
        let held = self.state.market(held_market)?;
        let owed = self.state.market(owed_market)?;
        Ok(liquidation_spread_for_pair(
            self.risk_params.liquidation_spread,
            held.liquidation_spread_premium,
            owed.liquidation_spread_premium,
            &self.account_risk_override(owner),
        ))
    }

    pub(super) fn liquidation_prices(
        &self,
        prices: &BTreeMap<MarketId, Price>,
        owner: Address,
        held_market: MarketId,
        owed_market: MarketId,
    ) -> Result<LiquidationPrices, EngineError> {
        let spread = self.liquidation_spread(owner, held_market, owed_market)?;
        Ok(LiquidationPrices::new(
            loaded_price(prices, held_market)?,
            loaded_price(prices, owed_market)?,
            spread,
        ))
    }

    /// Margin ratio for an account after overrides.
    pub fn margin_ratio_for(&self, owner: Address) -> Decimal {
        effective_margin_ratio(self.risk_params.margin_ratio, &self.account_risk_override(owner))
    }

    /// Supply and borrow value of an account at the given prices and the
    /// ledger's current indexes. `adjust` applies the margin premiums.
    pub(super) fn values_at(
        &self,
        account: &AccountInfo,
        prices: &BTreeMap<MarketId, Price>,
        adjust: bool,
    ) -> Result<AccountValues, EngineError> {
        let mut values = AccountValues::default();
        let Some(balances) = self.state.balances.account(account) else {
            return Ok(values);
        };
        for market_id in balances.markets_with_balances() {
            let market = self.state.market(market_id)?;
            let wei = self.state.balances.get_wei(account, market);
            let premium = adjust.then_some(market.margin_premium);
            values.add_balance(wei, loaded_price(prices, market_id)?, premium);
        }
        Ok(values)
    }

    pub(super) fn collateralized_at(
        &self,
        account: &AccountInfo,
        prices: &BTreeMap<MarketId, Price>,
    ) -> Result<bool, EngineError> {
        let values = self.values_at(account, prices, true)?;
        Ok(values.is_collateralized(self.margin_ratio_for(account.owner)))
    }

    fn prices_for(&self, account: &AccountInfo) -> Result<BTreeMap<MarketId, Price>, EngineError> {
        self.account_markets(account)
            .into_iter()
            .map(|id| Ok((id, self.price(id)?)))
            .collect()
    }

    /// Values at live oracle prices and stored indexes.
    pub fn account_values(&self, account: &AccountInfo, adjust: bool) -> Result<AccountValues, EngineError> {
        let prices = self.prices_for(account)?;
        self.values_at(account, &prices, adjust)
    }

    pub fn is_collateralized(&self, account: &AccountInfo) -> Result<bool, EngineError> {
        let prices = self.prices_for(account)?;
        self.collateralized_at(account, &prices)
    }
}

pub(super) fn loaded_price(prices: &BTreeMap<MarketId, Price>, market_id: MarketId) -> Result<Price, EngineError> {
    prices
        .get(&market_id)
        .copied()
        .ok_or(EngineError::MarketNotFound(market_id))
}
