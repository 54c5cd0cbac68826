// 8.3 engine/pipeline.rs: operate(). validates, loads markets, applies actions in
// order, verifies every account, then either commits the buffered events or
// restores the snapshot taken before the first action.

use super::core::Ledger;
use super::operation::{Action, Operation, TradeParams};
use super::results::{EngineError, OperationResult};
use super::state::LedgerState;
use crate::account::AccountStatus;
use crate::events::{
    EventId, EventPayload, IndexUpdateEvent, InterestRateEvent, OperationEvent, OraclePriceEvent,
};
use crate::types::{AccountInfo, Address, MarketId, Price};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/** 8.3.1: scratch state for one operation. events stay here until commit */
#[derive(Debug)]
pub(super) struct OperationContext {
    pub sender: Address,
    pub accounts: Vec<AccountInfo>,
    pub primary: Vec<bool>,
    pub prices: BTreeMap<MarketId, Price>,
    pub events: Vec<EventPayload>,
}

impl OperationContext {
    // indexes are checked by Operation::validate before any action runs
    pub fn account(&self, index: usize) -> AccountInfo {
        self.accounts[index]
    }
}

impl Ledger {
    /// Run an operation atomically on behalf of `sender`.
    pub fn operate(&mut self, sender: Address, operation: &Operation) -> Result<OperationResult, EngineError> {
        let snapshot = self.state.snapshot(&operation.accounts);
        match self.run_operation(sender, operation, &snapshot) {
            Ok((events, markets)) => {
                let first_event = EventId(self.next_event_id);
                let event_count = events.len();
                for payload in events {
                    self.emit_event(payload);
                }
                info!(
                    "operation by {} committed: {} actions, {} events",
                    sender,
                    operation.actions.len(),
                    event_count
                );
                Ok(OperationResult {
                    first_event,
                    event_count,
                    markets,
                })
            }
            Err(err) => {
                self.state.restore(snapshot, &operation.accounts);
                warn!("operation by {} aborted: {}", sender, err);
                Err(err)
            }
        }
    }

    fn run_operation(
        &mut self,
        sender: Address,
        operation: &Operation,
        before: &LedgerState,
    ) -> Result<(Vec<EventPayload>, Vec<MarketId>), EngineError> {
        operation.validate()?;
        let primary = self.check_permissions(sender, operation)?;

        let mut ctx = OperationContext {
            sender,
            accounts: operation.accounts.clone(),
            primary,
            prices: BTreeMap::new(),
            events: vec![EventPayload::Operation(OperationEvent { sender })],
        };

        let markets = self.touched_markets(operation)?;
        for &market_id in &markets {
            let index = self.accrue(market_id)?.index;
            ctx.events
                .push(EventPayload::IndexUpdate(IndexUpdateEvent { market_id, index }));
        }

        let ascending: BTreeSet<MarketId> = markets.iter().copied().collect();
        for &market_id in &ascending {
            let price = self.price(market_id)?;
            ctx.prices.insert(market_id, price);
            ctx.events
                .push(EventPayload::OraclePrice(OraclePriceEvent { market_id, price }));
        }

        for action in &operation.actions {
            debug!("applying {} for {}", action.name(), sender);
            self.apply_action(&mut ctx, action)?;
        }

        self.verify(&ctx, operation, before)?;

        let borrow_changed = ascending.iter().any(|id| {
            let after = self.state.markets.get(id).map(|m| m.total_par.borrow);
            let prior = before.markets.get(id).map(|m| m.total_par.borrow);
            after != prior
        });
        if borrow_changed {
            for &market_id in &ascending {
                let rate_per_second = self.interest_rate(market_id)?;
                ctx.events.push(EventPayload::InterestRate(InterestRateEvent {
                    market_id,
                    rate_per_second,
                }));
            }
        }

        for (index, account) in ctx.accounts.iter().enumerate() {
            if ctx.primary[index] {
                self.state.balances.set_status(account, AccountStatus::Normal);
            }
        }

        Ok((ctx.events, markets))
    }

    fn apply_action(&mut self, ctx: &mut OperationContext, action: &Action) -> Result<(), EngineError> {
        match action {
            Action::Deposit { account, market, amount, from } => {
                self.apply_deposit(ctx, *account, *market, *amount, *from)
            }
            Action::Withdraw { account, market, amount, to } => {
                self.apply_withdraw(ctx, *account, *market, *amount, *to)
            }
            Action::Transfer { account, other_account, market, amount } => {
                self.apply_transfer(ctx, *account, *other_account, *market, *amount)
            }
            Action::Trade {
                taker,
                maker,
                input_market,
                output_market,
                auto_trader,
                amount,
                calculate_amount_with_maker_account,
                data,
            } => {
                let params = TradeParams {
                    taker: ctx.account(*taker),
                    maker: ctx.account(*maker),
                    input_market: *input_market,
                    output_market: *output_market,
                    auto_trader: *auto_trader,
                    amount: *amount,
                    calculate_amount_with_maker_account: *calculate_amount_with_maker_account,
                    data: data.clone(),
                };
                self.apply_trade(ctx, &params)
            }
            Action::Liquidate { solid_account, liquid_account, owed_market, held_market, amount } => {
                self.apply_liquidate(ctx, *solid_account, *liquid_account, *owed_market, *held_market, *amount)
            }
            Action::Vaporize { solid_account, vapor_account, owed_market, held_market, amount } => {
                self.apply_vaporize(ctx, *solid_account, *vapor_account, *owed_market, *held_market, *amount)
            }
            Action::Call { account, callee, data } => self.apply_call(ctx, *account, *callee, data),
            Action::SetExpiry { account, market, time_delta, force_update } => {
                self.apply_set_expiry(ctx, *account, *market, *time_delta, *force_update)
            }
        }
    }

    /// Returns which accounts are primary.
    fn check_permissions(&self, sender: Address, operation: &Operation) -> Result<Vec<bool>, EngineError> {
        let mut primary = vec![false; operation.accounts.len()];
        for action in &operation.actions {
            primary[action.primary_account()] = true;
            if let Action::Transfer { other_account, .. } = action {
                primary[*other_account] = true;
            }
        }

        for (index, account) in operation.accounts.iter().enumerate() {
            if primary[index] && !self.is_operator(account.owner, sender) {
                return Err(EngineError::UnpermissionedOperator {
                    account: *account,
                    operator: sender,
                });
            }
        }

        for action in &operation.actions {
            match action {
                Action::Liquidate { liquid_account: target, .. }
                | Action::Vaporize { vapor_account: target, .. } => {
                    if !self.is_global_operator(sender) {
                        return Err(EngineError::UnpermissionedGlobalOperator(sender));
                    }
                    if primary[*target] {
                        return Err(EngineError::RequiresNonPrimaryAccount(operation.accounts[*target]));
                    }
                }
                Action::Trade { maker, auto_trader, .. } => {
                    let maker = operation.accounts[*maker];
                    if !self.is_operator(maker.owner, *auto_trader) {
                        return Err(EngineError::UnpermissionedOperator {
                            account: maker,
                            operator: *auto_trader,
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(primary)
    }

    /// Action markets in first-appearance order, then the other markets the
    /// operation's accounts hold balances in, ascending.
    fn touched_markets(&self, operation: &Operation) -> Result<Vec<MarketId>, EngineError> {
        let mut markets: Vec<MarketId> = Vec::new();
        for action in &operation.actions {
            for market_id in action.markets() {
                if !markets.contains(&market_id) {
                    markets.push(market_id);
                }
            }
        }

        let held: BTreeSet<MarketId> = operation
            .accounts
            .iter()
            .flat_map(|account| self.account_markets(account))
            .collect();
        for market_id in held {
            if !markets.contains(&market_id) {
                markets.push(market_id);
            }
        }

        for &market_id in &markets {
            self.state.market(market_id)?;
        }
        Ok(markets)
    }

    fn verify(&self, ctx: &OperationContext, operation: &Operation, before: &LedgerState) -> Result<(), EngineError> {
        for &market_id in ctx.prices.keys() {
            let market = self.state.market(market_id)?;
            let prior = before.market(market_id)?;
            let (supply_wei, borrow_wei) = market.total_wei();

            let supply_grew = market.total_par.supply > prior.total_par.supply;
            if !market.max_supply_wei.is_zero() && supply_grew && supply_wei > market.max_supply_wei {
                return Err(EngineError::SupplyCapExceeded(market_id));
            }

            let borrow_grew = market.total_par.borrow > prior.total_par.borrow;
            if !market.max_borrow_wei.is_zero() && borrow_grew && borrow_wei > market.max_borrow_wei.abs() {
                return Err(EngineError::BorrowCapExceeded(market_id));
            }
            if market.is_closing && borrow_grew {
                return Err(EngineError::MarketClosing(market_id));
            }
        }

        let max_markets = self.risk_params.account_max_number_of_markets_with_balances;
        for (index, account) in ctx.accounts.iter().enumerate() {
            let after = self.state.balances.account(account);
            if after.map_or(0, |a| a.number_of_markets_with_balances()) > max_markets {
                return Err(EngineError::TooManyBalances(*account));
            }

            let change = BalanceChange::between(before, &self.state, account);
            let has_debt = after.map_or(false, |a| a.has_negative_balance());

            if !change.closing_only && has_debt && !self.collateralized_at(account, &ctx.prices)? {
                return Err(EngineError::Undercollateralized(*account));
            }

            if ctx.primary[index] && !change.closing_only && change.debt_changed {
                let raw = self.values_at(account, &ctx.prices, false)?;
                let borrow = raw.borrow.value();
                if borrow > Decimal::ZERO && borrow < self.risk_params.min_borrowed_value {
                    return Err(EngineError::BorrowValueTooLow(*account));
                }
            }

            if change.debt_grew && !self.sentinel.is_borrow_allowed() {
                return Err(EngineError::BorrowingDisabled);
            }
        }

        for check in &operation.balance_checks {
            let account = ctx.account(check.account);
            if self.state.par(&account, check.market).is_negative() {
                return Err(EngineError::InvalidBalance {
                    account,
                    market: check.market,
                });
            }
        }
        Ok(())
    }
}

/// How an account's balances moved over one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct BalanceChange {
    // every balance kept its sign and shrank or stayed put
    closing_only: bool,
    debt_grew: bool,
    debt_changed: bool,
}

impl BalanceChange {
    fn between(before: &LedgerState, after: &LedgerState, account: &AccountInfo) -> Self {
        let markets: BTreeSet<MarketId> = [before, after]
            .iter()
            .filter_map(|state| state.balances.account(account))
            .flat_map(|a| a.balances.keys().copied())
            .collect();

        let mut change = BalanceChange {
            closing_only: true,
            ..Default::default()
        };
        for market_id in markets {
            let old = before.par(account, market_id);
            let new = after.par(account, market_id);
            if old == new {
                continue;
            }
            let flipped = (old.is_positive() && new.is_negative()) || (old.is_negative() && new.is_positive());
            if flipped || new.abs() > old.abs() {
                change.closing_only = false;
            }
            if new.is_negative() || old.is_negative() {
                change.debt_changed = true;
            }
            if new.is_negative() && (!old.is_negative() || new.abs() > old.abs()) {
                change.debt_grew = true;
            }
        }
        change
    }
}
