//! External capabilities an operation can hand control to.
//!
//! Auto-traders price Trade actions, liquidation callbacks are notified when an
//! account they own is liquidated, and callees receive Call actions. None of
//! them get mutable access to the ledger: they see a snapshot of the values
//! they need and answer with data the ledger validates.

use crate::liquidation::MAX_CALLBACK_RETURN_BYTES;
use crate::types::{AccountInfo, Address, AssetAmount, MarketId, Par, Wei};

/// What an auto-trader is asked to price. The input leg is already resolved
/// from the maker's point of view.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest<'a> {
    pub input_market: MarketId,
    pub output_market: MarketId,
    pub maker: AccountInfo,
    pub taker: AccountInfo,
    pub old_input_par: Par,
    pub new_input_par: Par,
    /// Change of the maker's input balance.
    pub input_wei: Wei,
    /// Maker balances before the trade.
    pub maker_input_balance: Wei,
    pub maker_output_balance: Wei,
    /// When false the returned output amount is read against the taker.
    pub calculate_amount_with_maker_account: bool,
    pub data: &'a [u8],
}

/// The trader's answer. The input leg is echoed back so the ledger can check
/// the trader priced the state it was given.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeQuote {
    pub old_input_par: Par,
    pub new_input_par: Par,
    pub input_wei: Wei,
    pub output: AssetAmount,
}

impl TradeQuote {
    pub fn for_request(request: &TradeRequest<'_>, output: AssetAmount) -> Self {
        Self {
            old_input_par: request.old_input_par,
            new_input_par: request.new_input_par,
            input_wei: request.input_wei,
            output,
        }
    }
}

pub trait AutoTrader {
    fn get_trade_cost(&self, request: &TradeRequest<'_>) -> Result<TradeQuote, String>;
}

/// Passed to a Call action's target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallContext<'a> {
    pub sender: Address,
    pub account: AccountInfo,
    pub data: &'a [u8],
}

pub trait Callee {
    fn call_function(&self, context: &CallContext<'_>) -> Result<(), String>;
}

/// Balances of a liquidated account around one Liquidate action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationNotice {
    pub liquid_account: AccountInfo,
    pub held_market: MarketId,
    pub owed_market: MarketId,
    pub held_wei_before: Wei,
    pub held_wei_after: Wei,
    pub owed_wei_before: Wei,
    pub owed_wei_after: Wei,
}

impl LiquidationNotice {
    pub fn held_delta_wei(&self) -> Wei {
        self.held_wei_after.sub(self.held_wei_before)
    }

    pub fn owed_delta_wei(&self) -> Wei {
        self.owed_wei_after.sub(self.owed_wei_before)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    #[error("reverted: {}", .0.as_deref().unwrap_or(""))]
    Revert(Option<String>),

    #[error("out of gas")]
    OutOfGas,

    #[error("return data too large: {0} bytes")]
    ReturnDataTooLarge(usize),
}

impl CallbackError {
    /// Reason worth logging. empty for out-of-gas, oversized returns and bare reverts.
    pub fn reason(&self) -> &str {
        match self {
            CallbackError::Revert(Some(reason)) => reason,
            _ => "",
        }
    }
}

/// Hard budget for an untrusted callback. Implementations charge for the work
/// they do; exceeding the limit aborts the callback, not the liquidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    pub fn charge(&mut self, amount: u64) -> Result<(), CallbackError> {
        let used = self.used.saturating_add(amount);
        if used > self.limit {
            self.used = self.limit;
            return Err(CallbackError::OutOfGas);
        }
        self.used = used;
        Ok(())
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }
}

pub trait LiquidationCallback {
    /// Returns the raw return payload on success.
    fn on_liquidate(&self, gas: &mut GasMeter, notice: &LiquidationNotice) -> Result<Vec<u8>, CallbackError>;
}

/// Run a callback under its gas budget and fold oversized returns into failures.
pub fn invoke_liquidation_callback(
    callback: &dyn LiquidationCallback,
    gas_limit: u64,
    notice: &LiquidationNotice,
) -> Result<(), CallbackError> {
    let mut gas = GasMeter::new(gas_limit);
    let payload = callback.on_liquidate(&mut gas, notice)?;
    if payload.len() > MAX_CALLBACK_RETURN_BYTES {
        return Err(CallbackError::ReturnDataTooLarge(payload.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct Burner {
        cost: u64,
        payload: usize,
    }

    impl LiquidationCallback for Burner {
        fn on_liquidate(&self, gas: &mut GasMeter, _notice: &LiquidationNotice) -> Result<Vec<u8>, CallbackError> {
            gas.charge(self.cost)?;
            Ok(vec![0u8; self.payload])
        }
    }

    fn notice() -> LiquidationNotice {
        LiquidationNotice {
            liquid_account: AccountInfo::new(Address(3), 0),
            held_market: MarketId(1),
            owed_market: MarketId(0),
            held_wei_before: Wei::new(dec!(16500)),
            held_wei_after: Wei::new(dec!(750)),
            owed_wei_before: Wei::new(dec!(-15000)),
            owed_wei_after: Wei::zero(),
        }
    }

    #[test]
    fn gas_meter_stops_at_limit() {
        let mut gas = GasMeter::new(100);
        assert!(gas.charge(60).is_ok());
        assert_eq!(gas.remaining(), 40);
        assert_eq!(gas.charge(41), Err(CallbackError::OutOfGas));
        assert_eq!(gas.used(), 100);
    }

    #[test]
    fn callback_budget_and_payload_limits() {
        let ok = Burner { cost: 10, payload: 32 };
        assert!(invoke_liquidation_callback(&ok, 100, &notice()).is_ok());

        let hungry = Burner { cost: 101, payload: 0 };
        assert_eq!(invoke_liquidation_callback(&hungry, 100, &notice()), Err(CallbackError::OutOfGas));

        let bomb = Burner { cost: 1, payload: 257 };
        let err = invoke_liquidation_callback(&bomb, 100, &notice()).unwrap_err();
        assert_eq!(err, CallbackError::ReturnDataTooLarge(257));
        assert_eq!(err.reason(), "");
    }

    #[test]
    fn notice_deltas() {
        let n = notice();
        assert_eq!(n.held_delta_wei().value(), dec!(-15750));
        assert_eq!(n.owed_delta_wei().value(), dec!(15000));
    }
}
