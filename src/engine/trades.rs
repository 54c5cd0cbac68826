//! Trade actions, priced by a registered auto-trader.

use super::core::Ledger;
use super::operation::TradeParams;
use super::pipeline::OperationContext;
use super::results::EngineError;
use crate::callbacks::TradeRequest;
use crate::events::{BalanceUpdate, EventPayload, TradeEvent};
use crate::interest::{par_to_wei, wei_to_par};
use crate::types::Wei;

impl Ledger {
    /// `params` carries the accounts already resolved from the operation.
    pub(super) fn apply_trade(&mut self, ctx: &mut OperationContext, params: &TradeParams) -> Result<(), EngineError> {
        let (taker, maker) = (params.taker, params.maker);
        let (input_market, output_market, auto_trader) = (params.input_market, params.output_market, params.auto_trader);
        let use_maker = params.calculate_amount_with_maker_account;

        let trader = self
            .auto_traders
            .get(&auto_trader)
            .cloned()
            .ok_or(EngineError::AutoTraderNotFound(auto_trader))?;

        // the account whose point of view `amount` and the trader's answer are in
        let (calc, other) = if use_maker { (maker, taker) } else { (taker, maker) };
        let (calc_input_par, calc_input_wei) = self.state.new_par_and_delta_wei(&calc, input_market, params.amount)?;

        let maker_old_input_par = self.state.par(&maker, input_market);
        let (maker_new_input_par, maker_input_wei) = if use_maker {
            (calc_input_par, calc_input_wei)
        } else {
            let market = self.state.market(input_market)?;
            let delta = calc_input_wei.negate();
            let old_wei = par_to_wei(maker_old_input_par, &market.index);
            (wei_to_par(old_wei.add(delta), &market.index), delta)
        };

        let request = TradeRequest {
            input_market,
            output_market,
            maker,
            taker,
            old_input_par: maker_old_input_par,
            new_input_par: maker_new_input_par,
            input_wei: maker_input_wei,
            maker_input_balance: self.state.wei(&maker, input_market)?,
            maker_output_balance: self.state.wei(&maker, output_market)?,
            calculate_amount_with_maker_account: use_maker,
            data: &params.data,
        };
        let quote = trader
            .get_trade_cost(&request)
            .map_err(|reason| EngineError::AutoTraderFailed {
                trader: auto_trader,
                reason,
            })?;
        if quote.old_input_par != request.old_input_par
            || quote.new_input_par != request.new_input_par
            || quote.input_wei != request.input_wei
        {
            return Err(EngineError::TradeInputMismatch(auto_trader));
        }

        let (calc_output_par, calc_output_wei) = self.state.new_par_and_delta_wei(&calc, output_market, quote.output)?;
        if is_one_sided(calc_input_wei, calc_output_wei) {
            return Err(EngineError::OneSidedTrade);
        }

        self.state.set_par(&calc, input_market, calc_input_par)?;
        self.state.set_par(&calc, output_market, calc_output_par)?;
        self.state
            .set_par_from_delta_wei(&other, input_market, calc_input_wei.negate())?;
        self.state
            .set_par_from_delta_wei(&other, output_market, calc_output_wei.negate())?;

        let calc_input = BalanceUpdate { delta_wei: calc_input_wei, new_par: calc_input_par };
        let calc_output = BalanceUpdate { delta_wei: calc_output_wei, new_par: calc_output_par };
        let other_input = self.state.update(&other, input_market, calc_input_wei.negate());
        let other_output = self.state.update(&other, output_market, calc_output_wei.negate());
        let (taker_legs, maker_legs) = if use_maker {
            ((other_input, other_output), (calc_input, calc_output))
        } else {
            ((calc_input, calc_output), (other_input, other_output))
        };

        ctx.events.push(EventPayload::Trade(TradeEvent {
            taker,
            maker,
            input_market,
            output_market,
            taker_input_update: taker_legs.0,
            taker_output_update: taker_legs.1,
            maker_input_update: maker_legs.0,
            maker_output_update: maker_legs.1,
            auto_trader,
        }));
        Ok(())
    }
}

/// Exactly one leg moving, or both legs moving the same way.
fn is_one_sided(input_wei: Wei, output_wei: Wei) -> bool {
    match (input_wei.is_zero(), output_wei.is_zero()) {
        (true, true) => false,
        (true, false) | (false, true) => true,
        (false, false) => input_wei.is_positive() == output_wei.is_positive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn one_sided_detection() {
        let w = |v| Wei::new(v);
        assert!(!is_one_sided(w(dec!(0)), w(dec!(0))));
        assert!(is_one_sided(w(dec!(5)), w(dec!(0))));
        assert!(is_one_sided(w(dec!(0)), w(dec!(-5))));
        assert!(is_one_sided(w(dec!(5)), w(dec!(3))));
        assert!(!is_one_sided(w(dec!(5)), w(dec!(-3))));
    }
}
