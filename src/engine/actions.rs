//! Deposit, Withdraw, Transfer, Call and SetExpiry.

use super::core::Ledger;
use super::pipeline::OperationContext;
use super::results::EngineError;
use crate::callbacks::CallContext;
use crate::events::{
    BalanceUpdate, CallEvent, DepositEvent, EventPayload, SetExpiryEvent, TransferEvent, WithdrawEvent,
};
use crate::types::{Address, AssetAmount, MarketId};

impl Ledger {
    pub(super) fn apply_deposit(
        &mut self,
        ctx: &mut OperationContext,
        account: usize,
        market_id: MarketId,
        amount: AssetAmount,
        from: Address,
    ) -> Result<(), EngineError> {
        let account = ctx.account(account);
        if from != ctx.sender && from != account.owner {
            return Err(EngineError::InvalidDepositSource(from));
        }

        let (new_par, delta_wei) = self.state.new_par_and_delta_wei(&account, market_id, amount)?;
        if delta_wei.is_negative() {
            return Err(EngineError::CannotDepositNegative);
        }

        self.state.set_par(&account, market_id, new_par)?;
        let market = self.state.market_mut(market_id)?;
        market.token_balance = market.token_balance.add(delta_wei);

        ctx.events.push(EventPayload::Deposit(DepositEvent {
            account,
            market_id,
            update: BalanceUpdate { delta_wei, new_par },
            from,
        }));
        Ok(())
    }

    pub(super) fn apply_withdraw(
        &mut self,
        ctx: &mut OperationContext,
        account: usize,
        market_id: MarketId,
        amount: AssetAmount,
        to: Address,
    ) -> Result<(), EngineError> {
        let account = ctx.account(account);
        let (new_par, delta_wei) = self.state.new_par_and_delta_wei(&account, market_id, amount)?;
        if delta_wei.is_positive() {
            return Err(EngineError::CannotWithdrawPositive);
        }

        let old_par = self.state.par(&account, market_id);
        let market = self.state.market(market_id)?;
        // a closing market accepts no new or larger borrows
        if market.is_closing && new_par.is_negative() && new_par < old_par {
            return Err(EngineError::MarketClosing(market_id));
        }

        let requested = delta_wei.abs();
        if market.token_balance < requested {
            return Err(EngineError::InsufficientTokenBalance {
                market: market_id,
                requested,
                available: market.token_balance,
            });
        }

        self.state.set_par(&account, market_id, new_par)?;
        let market = self.state.market_mut(market_id)?;
        market.token_balance = market.token_balance.sub(requested);

        ctx.events.push(EventPayload::Withdraw(WithdrawEvent {
            account,
            market_id,
            update: BalanceUpdate { delta_wei, new_par },
            to,
        }));
        Ok(())
    }

    pub(super) fn apply_transfer(
        &mut self,
        ctx: &mut OperationContext,
        account: usize,
        other_account: usize,
        market_id: MarketId,
        amount: AssetAmount,
    ) -> Result<(), EngineError> {
        let (account_one, account_two) = (ctx.account(account), ctx.account(other_account));
        let (new_par, delta_wei) = self.state.new_par_and_delta_wei(&account_one, market_id, amount)?;

        self.state.set_par(&account_one, market_id, new_par)?;
        self.state
            .set_par_from_delta_wei(&account_two, market_id, delta_wei.negate())?;

        ctx.events.push(EventPayload::Transfer(TransferEvent {
            account_one,
            account_two,
            market_id,
            update_one: BalanceUpdate { delta_wei, new_par },
            update_two: self.state.update(&account_two, market_id, delta_wei.negate()),
        }));
        Ok(())
    }

    pub(super) fn apply_call(
        &mut self,
        ctx: &mut OperationContext,
        account: usize,
        callee: Address,
        data: &[u8],
    ) -> Result<(), EngineError> {
        let account = ctx.account(account);
        let target = self
            .callees
            .get(&callee)
            .cloned()
            .ok_or(EngineError::CalleeNotFound(callee))?;

        let context = CallContext {
            sender: ctx.sender,
            account,
            data,
        };
        target
            .call_function(&context)
            .map_err(|reason| EngineError::CallFailed { callee, reason })?;

        ctx.events
            .push(EventPayload::Call(CallEvent { account, callee }));
        Ok(())
    }

    pub(super) fn apply_set_expiry(
        &mut self,
        ctx: &mut OperationContext,
        account: usize,
        market_id: MarketId,
        time_delta: u64,
        force_update: bool,
    ) -> Result<(), EngineError> {
        let account = ctx.account(account);
        self.state.market(market_id)?;
        let key = (account, market_id);

        let expiry = if time_delta == 0 {
            self.state.expiries.remove(&key);
            None
        } else {
            match self.state.expiries.get(&key).copied() {
                Some(existing) if !force_update => Some(existing),
                _ => {
                    let at = self.current_time.plus_secs(time_delta);
                    self.state.expiries.insert(key, at);
                    Some(at)
                }
            }
        };

        ctx.events.push(EventPayload::SetExpiry(SetExpiryEvent {
            account,
            market_id,
            expiry,
        }));
        Ok(())
    }
}
