//! Liquidate and Vaporize actions.

use super::core::Ledger;
use super::pipeline::OperationContext;
use super::results::EngineError;
use crate::account::AccountStatus;
use crate::callbacks::{invoke_liquidation_callback, LiquidationNotice};
use crate::events::{
    BalanceUpdate, EventPayload, LiquidateEvent, LiquidationCallbackFailureEvent, LiquidationCallbackSuccessEvent,
    VaporizeEvent,
};
use crate::liquidation::{bound_owed_repayment, truncate_callback_reason, LiquidationError};
use crate::margin::is_vaporizable;
use crate::types::{AccountInfo, AssetAmount, MarketId, Par, Wei};
use log::{debug, warn};

impl Ledger {
    pub(super) fn apply_liquidate(
        &mut self,
        ctx: &mut OperationContext,
        solid_account: usize,
        liquid_account: usize,
        owed_market: MarketId,
        held_market: MarketId,
        amount: AssetAmount,
    ) -> Result<(), EngineError> {
        if !self.sentinel.is_liquidation_allowed() {
            return Err(EngineError::LiquidationsDisabled);
        }
        let (solid, liquid) = (ctx.account(solid_account), ctx.account(liquid_account));

        if self.state.balances.status(&liquid) != AccountStatus::Liquidating {
            let expired = self
                .state
                .expiry(&liquid, owed_market)
                .map_or(false, |expiry| expiry <= self.current_time);
            if !expired && self.collateralized_at(&liquid, &ctx.prices)? {
                return Err(EngineError::UnliquidatableAccount(liquid));
            }
            self.state.balances.set_status(&liquid, AccountStatus::Liquidating);
        }

        let held_before = self.state.wei(&liquid, held_market)?;
        if held_before.is_negative() {
            return Err(LiquidationError::CollateralNegative.into());
        }
        let owed_before = self.state.wei(&liquid, owed_market)?;

        let (requested_par, requested_wei) = self.state.new_par_and_delta_wei(&liquid, owed_market, amount)?;
        let (owed_new_par, mut owed_wei) = bound_owed_repayment(
            self.state.par(&liquid, owed_market),
            owed_before,
            requested_par,
            requested_wei,
        )?;

        let prices = self.liquidation_prices(&ctx.prices, liquid.owner, held_market, owed_market)?;
        let mut held_wei = prices.owed_wei_to_held_wei(owed_wei);

        // collateral runs out before the debt does
        if held_wei > held_before {
            held_wei = held_before;
            owed_wei = prices.held_wei_to_owed_wei(held_wei);
            self.state.set_par(&liquid, held_market, Par::zero())?;
            self.state.set_par_from_delta_wei(&liquid, owed_market, owed_wei)?;
        } else {
            self.state.set_par(&liquid, owed_market, owed_new_par)?;
            self.state
                .set_par_from_delta_wei(&liquid, held_market, held_wei.negate())?;
        }

        self.state
            .set_par_from_delta_wei(&solid, owed_market, owed_wei.negate())?;
        self.state.set_par_from_delta_wei(&solid, held_market, held_wei)?;

        debug!("liquidated {}: repaid {} owed, seized {} held", liquid, owed_wei, held_wei);
        ctx.events.push(EventPayload::Liquidate(LiquidateEvent {
            solid_account: solid,
            liquid_account: liquid,
            held_market,
            owed_market,
            solid_held_update: self.state.update(&solid, held_market, held_wei),
            solid_owed_update: self.state.update(&solid, owed_market, owed_wei.negate()),
            liquid_held_update: self.state.update(&liquid, held_market, held_wei.negate()),
            liquid_owed_update: self.state.update(&liquid, owed_market, owed_wei),
        }));

        if self.state.par(&liquid, owed_market).is_zero() {
            self.state.expiries.remove(&(liquid, owed_market));
        }

        // every balance change is in place before control leaves the ledger
        let notice = LiquidationNotice {
            liquid_account: liquid,
            held_market,
            owed_market,
            held_wei_before: held_before,
            held_wei_after: self.state.wei(&liquid, held_market)?,
            owed_wei_before: owed_before,
            owed_wei_after: self.state.wei(&liquid, owed_market)?,
        };
        self.notify_liquidation(ctx, &notice);
        Ok(())
    }

    fn notify_liquidation(&self, ctx: &mut OperationContext, notice: &LiquidationNotice) {
        let Some(callback) = self.liquidation_callbacks.get(&notice.liquid_account.owner) else {
            return;
        };
        let liquid_account = notice.liquid_account;
        match invoke_liquidation_callback(callback.as_ref(), self.risk_params.callback_gas_limit, notice) {
            Ok(()) => ctx.events.push(EventPayload::LiquidationCallbackSuccess(
                LiquidationCallbackSuccessEvent { liquid_account },
            )),
            Err(err) => {
                warn!("liquidation callback for {} failed: {}", liquid_account, err);
                ctx.events.push(EventPayload::LiquidationCallbackFailure(
                    LiquidationCallbackFailureEvent {
                        liquid_account,
                        reason: truncate_callback_reason(err.reason()),
                    },
                ));
            }
        }
    }

    pub(super) fn apply_vaporize(
        &mut self,
        ctx: &mut OperationContext,
        solid_account: usize,
        vapor_account: usize,
        owed_market: MarketId,
        held_market: MarketId,
        amount: AssetAmount,
    ) -> Result<(), EngineError> {
        if !self.sentinel.is_liquidation_allowed() {
            return Err(EngineError::LiquidationsDisabled);
        }
        let (solid, vapor) = (ctx.account(solid_account), ctx.account(vapor_account));

        if self.state.balances.status(&vapor) != AccountStatus::Vaporizing {
            let vaporizable = self.state.balances.account(&vapor).map_or(false, is_vaporizable);
            if !vaporizable {
                return Err(EngineError::UnvaporizableAccount(vapor));
            }
            self.state.balances.set_status(&vapor, AccountStatus::Vaporizing);
        }

        let owed_before = self.state.wei(&vapor, owed_market)?;
        if owed_before.is_positive() {
            return Err(LiquidationError::OwedBalancePositive.into());
        }

        // protocol reserves in the owed market pay first
        let owed_excess = self.state.market(owed_market)?.excess_tokens();
        if owed_excess.is_positive() {
            if owed_excess >= owed_before.abs() {
                self.state.set_par(&vapor, owed_market, Par::zero())?;
                self.push_vaporize(ctx, solid, vapor, held_market, owed_market, Wei::zero(), owed_before.abs(), Wei::zero());
                return Ok(());
            }
            self.state.set_par_from_delta_wei(&vapor, owed_market, owed_excess)?;
        }
        let from_excess = if owed_excess.is_positive() { owed_excess } else { Wei::zero() };

        let max_held = self.state.market(held_market)?.excess_tokens();
        if max_held.is_negative() {
            return Err(LiquidationError::ExcessNegative.into());
        }

        let (requested_par, requested_wei) = self.state.new_par_and_delta_wei(&vapor, owed_market, amount)?;
        let (owed_new_par, mut owed_wei) = bound_owed_repayment(
            self.state.par(&vapor, owed_market),
            self.state.wei(&vapor, owed_market)?,
            requested_par,
            requested_wei,
        )?;

        let prices = self.liquidation_prices(&ctx.prices, vapor.owner, held_market, owed_market)?;
        let mut held_wei = prices.owed_wei_to_held_wei(owed_wei);

        if held_wei > max_held {
            held_wei = max_held;
            owed_wei = prices.held_wei_to_owed_wei(held_wei);
            self.state.set_par_from_delta_wei(&vapor, owed_market, owed_wei)?;
        } else {
            self.state.set_par(&vapor, owed_market, owed_new_par)?;
        }

        self.state
            .set_par_from_delta_wei(&solid, owed_market, owed_wei.negate())?;
        self.state.set_par_from_delta_wei(&solid, held_market, held_wei)?;

        debug!(
            "vaporized {}: {} from reserves, {} absorbed for {} held",
            vapor, from_excess, owed_wei, held_wei
        );
        self.push_vaporize(ctx, solid, vapor, held_market, owed_market, held_wei, from_excess.add(owed_wei), owed_wei);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn push_vaporize(
        &self,
        ctx: &mut OperationContext,
        solid: AccountInfo,
        vapor: AccountInfo,
        held_market: MarketId,
        owed_market: MarketId,
        held_wei: Wei,
        vapor_repaid: Wei,
        solid_paid: Wei,
    ) {
        ctx.events.push(EventPayload::Vaporize(VaporizeEvent {
            solid_account: solid,
            vapor_account: vapor,
            held_market,
            owed_market,
            solid_held_update: self.state.update(&solid, held_market, held_wei),
            solid_owed_update: self.state.update(&solid, owed_market, solid_paid.negate()),
            vapor_owed_update: BalanceUpdate {
                delta_wei: vapor_repaid,
                new_par: self.state.par(&vapor, owed_market),
            },
        }));
    }
}
