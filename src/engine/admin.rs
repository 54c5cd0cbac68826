// 8.4 engine/admin.rs: governance surface. every setter validates, applies, and
// emits exactly one admin event.

use super::core::Ledger;
use super::results::EngineError;
use crate::events::{AdminEvent, EventPayload};
use crate::market::{Market, MarketHooks, MarketParams};
use crate::oracle::{InterestRateModel, OracleSentinel, PriceOracle};
use crate::risk::{
    check_earnings_rate, check_earnings_rate_override, check_liquidation_spread, check_margin_premium,
    check_margin_ratio, check_max_number_of_markets, check_min_borrowed_value, check_spread_premium,
    AccountRiskOverride,
};
use crate::types::{Address, MarketId, Wei};
use log::info;
use rust_decimal::Decimal;
use std::rc::Rc;

/// Borrowed access to the admin setters. Only the configured admin gets one.
#[derive(Debug)]
pub struct Admin<'a> {
    ledger: &'a mut Ledger,
}

impl Ledger {
    pub fn admin(&mut self, caller: Address) -> Result<Admin<'_>, EngineError> {
        if caller != self.admin {
            return Err(EngineError::NotAdmin(caller));
        }
        Ok(Admin { ledger: self })
    }
}

impl Admin<'_> {
    fn emit(&mut self, event: AdminEvent) {
        info!("admin: {:?}", event);
        self.ledger.emit_event(EventPayload::Admin(event));
    }

    fn market_mut(&mut self, market_id: MarketId) -> Result<&mut Market, EngineError> {
        self.ledger.state.market_mut(market_id)
    }

    fn hooks_mut(&mut self, market_id: MarketId) -> Result<&mut MarketHooks, EngineError> {
        self.ledger
            .hooks
            .get_mut(&market_id)
            .ok_or(EngineError::MarketNotFound(market_id))
    }

    // ---- markets ----

    pub fn add_market(
        &mut self,
        params: MarketParams,
        oracle: Rc<dyn PriceOracle>,
        interest_model: Rc<dyn InterestRateModel>,
    ) -> Result<MarketId, EngineError> {
        if self.ledger.tokens.contains_key(&params.token) {
            return Err(EngineError::MarketExists(params.token));
        }
        let limits = &self.ledger.risk_limits;
        check_margin_premium(params.margin_premium, limits)?;
        check_spread_premium(params.liquidation_spread_premium, limits)?;
        check_earnings_rate_override(params.earnings_rate_override, limits)?;

        let market_id = MarketId(self.ledger.state.markets.len() as u32);
        if oracle.get_price(params.token) <= Decimal::ZERO {
            return Err(EngineError::InvalidOraclePrice(market_id));
        }

        let mut market = Market::new(market_id, &params, self.ledger.current_time);
        market.max_borrow_wei = market.max_borrow_wei.abs();
        self.ledger.state.markets.insert(market_id, market);
        self.ledger
            .hooks
            .insert(market_id, MarketHooks::new(oracle, interest_model));
        self.ledger.tokens.insert(params.token, market_id);

        self.emit(AdminEvent::AddMarket {
            market_id,
            token: params.token,
        });
        Ok(market_id)
    }

    pub fn set_is_closing(&mut self, market_id: MarketId, is_closing: bool) -> Result<(), EngineError> {
        self.market_mut(market_id)?.is_closing = is_closing;
        self.emit(AdminEvent::SetIsClosing { market_id, is_closing });
        Ok(())
    }

    pub fn set_price_oracle(&mut self, market_id: MarketId, oracle: Rc<dyn PriceOracle>) -> Result<(), EngineError> {
        let token = self.ledger.state.market(market_id)?.token;
        if oracle.get_price(token) <= Decimal::ZERO {
            return Err(EngineError::InvalidOraclePrice(market_id));
        }
        self.hooks_mut(market_id)?.oracle = oracle;
        self.emit(AdminEvent::SetPriceOracle { market_id });
        Ok(())
    }

    /// Interest up to now accrues under the old model first.
    pub fn set_interest_rate_model(
        &mut self,
        market_id: MarketId,
        interest_model: Rc<dyn InterestRateModel>,
    ) -> Result<(), EngineError> {
        self.ledger.accrue(market_id)?;
        self.hooks_mut(market_id)?.interest_model = interest_model;
        self.emit(AdminEvent::SetInterestRateModel { market_id });
        Ok(())
    }

    pub fn set_margin_premium(&mut self, market_id: MarketId, margin_premium: Decimal) -> Result<(), EngineError> {
        check_margin_premium(margin_premium, &self.ledger.risk_limits)?;
        self.market_mut(market_id)?.margin_premium = margin_premium;
        self.emit(AdminEvent::SetMarginPremium { market_id, margin_premium });
        Ok(())
    }

    pub fn set_liquidation_spread_premium(
        &mut self,
        market_id: MarketId,
        spread_premium: Decimal,
    ) -> Result<(), EngineError> {
        check_spread_premium(spread_premium, &self.ledger.risk_limits)?;
        self.market_mut(market_id)?.liquidation_spread_premium = spread_premium;
        self.emit(AdminEvent::SetLiquidationSpreadPremium { market_id, spread_premium });
        Ok(())
    }

    /// Zero removes the cap.
    pub fn set_max_supply_wei(&mut self, market_id: MarketId, max_supply_wei: Wei) -> Result<(), EngineError> {
        let max_supply_wei = max_supply_wei.abs();
        self.market_mut(market_id)?.max_supply_wei = max_supply_wei;
        self.emit(AdminEvent::SetMaxSupplyWei { market_id, max_supply_wei });
        Ok(())
    }

    /// Stored as a magnitude. zero removes the cap.
    pub fn set_max_borrow_wei(&mut self, market_id: MarketId, max_borrow_wei: Wei) -> Result<(), EngineError> {
        let max_borrow_wei = max_borrow_wei.abs();
        self.market_mut(market_id)?.max_borrow_wei = max_borrow_wei;
        self.emit(AdminEvent::SetMaxBorrowWei { market_id, max_borrow_wei });
        Ok(())
    }

    /// Zero falls back to the global earnings rate.
    pub fn set_earnings_rate_override(
        &mut self,
        market_id: MarketId,
        earnings_rate_override: Decimal,
    ) -> Result<(), EngineError> {
        check_earnings_rate_override(earnings_rate_override, &self.ledger.risk_limits)?;
        self.ledger.accrue(market_id)?;
        self.market_mut(market_id)?.earnings_rate_override = earnings_rate_override;
        self.emit(AdminEvent::SetEarningsRateOverride {
            market_id,
            earnings_rate_override,
        });
        Ok(())
    }

    // ---- global risk ----

    pub fn set_margin_ratio(&mut self, margin_ratio: Decimal) -> Result<(), EngineError> {
        let params = &self.ledger.risk_params;
        check_margin_ratio(margin_ratio, params.liquidation_spread, &self.ledger.risk_limits)?;
        self.ledger.risk_params.margin_ratio = margin_ratio;
        self.emit(AdminEvent::SetMarginRatio { margin_ratio });
        Ok(())
    }

    pub fn set_liquidation_spread(&mut self, liquidation_spread: Decimal) -> Result<(), EngineError> {
        let params = &self.ledger.risk_params;
        check_liquidation_spread(liquidation_spread, params.margin_ratio, &self.ledger.risk_limits)?;
        self.ledger.risk_params.liquidation_spread = liquidation_spread;
        self.emit(AdminEvent::SetLiquidationSpread { liquidation_spread });
        Ok(())
    }

    pub fn set_earnings_rate(&mut self, earnings_rate: Decimal) -> Result<(), EngineError> {
        check_earnings_rate(earnings_rate, &self.ledger.risk_limits)?;
        self.ledger.risk_params.earnings_rate = earnings_rate;
        self.emit(AdminEvent::SetEarningsRate { earnings_rate });
        Ok(())
    }

    pub fn set_min_borrowed_value(&mut self, min_borrowed_value: Decimal) -> Result<(), EngineError> {
        check_min_borrowed_value(min_borrowed_value, &self.ledger.risk_limits)?;
        self.ledger.risk_params.min_borrowed_value = min_borrowed_value;
        self.emit(AdminEvent::SetMinBorrowedValue { min_borrowed_value });
        Ok(())
    }

    pub fn set_account_max_number_of_markets_with_balances(&mut self, max: usize) -> Result<(), EngineError> {
        check_max_number_of_markets(max, &self.ledger.risk_limits)?;
        self.ledger.risk_params.account_max_number_of_markets_with_balances = max;
        self.emit(AdminEvent::SetAccountMaxNumberOfMarketsWithBalances { max });
        Ok(())
    }

    /// The new sentinel must currently allow both borrowing and liquidations.
    pub fn set_oracle_sentinel(&mut self, sentinel: Rc<dyn OracleSentinel>) -> Result<(), EngineError> {
        if !sentinel.is_borrow_allowed() || !sentinel.is_liquidation_allowed() {
            return Err(EngineError::InvalidOracleSentinel);
        }
        self.ledger.sentinel = sentinel;
        self.emit(AdminEvent::SetOracleSentinel);
        Ok(())
    }

    pub fn set_callback_gas_limit(&mut self, gas_limit: u64) -> Result<(), EngineError> {
        self.ledger.risk_params.callback_gas_limit = gas_limit;
        self.emit(AdminEvent::SetCallbackGasLimit { gas_limit });
        Ok(())
    }

    pub fn set_default_account_risk_override(&mut self, risk_override: AccountRiskOverride) -> Result<(), EngineError> {
        risk_override.validate(&self.ledger.risk_limits)?;
        self.ledger.risk_params.default_account_risk_override = risk_override;
        self.emit(AdminEvent::SetDefaultAccountRiskOverride { risk_override });
        Ok(())
    }

    /// An unset override removes the owner's entry.
    pub fn set_account_risk_override(
        &mut self,
        owner: Address,
        risk_override: AccountRiskOverride,
    ) -> Result<(), EngineError> {
        risk_override.validate(&self.ledger.risk_limits)?;
        if risk_override.is_set() {
            self.ledger.account_overrides.insert(owner, risk_override);
        } else {
            self.ledger.account_overrides.remove(&owner);
        }
        self.emit(AdminEvent::SetAccountRiskOverride { owner, risk_override });
        Ok(())
    }

    // ---- operators and tokens ----

    pub fn set_global_operator(&mut self, operator: Address, approved: bool) -> Result<(), EngineError> {
        if approved {
            self.ledger.global_operators.insert(operator);
        } else {
            self.ledger.global_operators.remove(&operator);
        }
        self.emit(AdminEvent::SetGlobalOperator { operator, approved });
        Ok(())
    }

    /// Sweep tokens held beyond what suppliers are owed. Returns the amount.
    pub fn withdraw_excess_tokens(&mut self, market_id: MarketId, to: Address) -> Result<Wei, EngineError> {
        self.ledger.accrue(market_id)?;
        let market = self.market_mut(market_id)?;
        let amount = market.excess_tokens();
        if amount.is_negative() {
            return Err(EngineError::NegativeExcess(market_id));
        }
        market.token_balance = market.token_balance.sub(amount);
        self.emit(AdminEvent::WithdrawExcessTokens { market_id, amount, to });
        Ok(amount)
    }
}
