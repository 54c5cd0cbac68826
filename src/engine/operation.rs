// 8.2 engine/operation.rs: what a caller submits. an ordered account list plus
// actions that point into it by index, built with OperationBuilder.

use super::results::EngineError;
use crate::types::{AccountInfo, Address, AssetAmount, MarketId};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Deposit {
        account: usize,
        market: MarketId,
        amount: AssetAmount,
        from: Address,
    },
    Withdraw {
        account: usize,
        market: MarketId,
        amount: AssetAmount,
        to: Address,
    },
    Transfer {
        account: usize,
        other_account: usize,
        market: MarketId,
        amount: AssetAmount,
    },
    Trade {
        taker: usize,
        maker: usize,
        input_market: MarketId,
        output_market: MarketId,
        auto_trader: Address,
        amount: AssetAmount,
        calculate_amount_with_maker_account: bool,
        data: Vec<u8>,
    },
    Liquidate {
        solid_account: usize,
        liquid_account: usize,
        owed_market: MarketId,
        held_market: MarketId,
        amount: AssetAmount,
    },
    Vaporize {
        solid_account: usize,
        vapor_account: usize,
        owed_market: MarketId,
        held_market: MarketId,
        amount: AssetAmount,
    },
    Call {
        account: usize,
        callee: Address,
        data: Vec<u8>,
    },
    SetExpiry {
        account: usize,
        market: MarketId,
        // seconds from now, 0 clears
        time_delta: u64,
        force_update: bool,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Deposit { .. } => "Deposit",
            Action::Withdraw { .. } => "Withdraw",
            Action::Transfer { .. } => "Transfer",
            Action::Trade { .. } => "Trade",
            Action::Liquidate { .. } => "Liquidate",
            Action::Vaporize { .. } => "Vaporize",
            Action::Call { .. } => "Call",
            Action::SetExpiry { .. } => "SetExpiry",
        }
    }

    pub fn primary_account(&self) -> usize {
        match self {
            Action::Deposit { account, .. }
            | Action::Withdraw { account, .. }
            | Action::Transfer { account, .. }
            | Action::Call { account, .. }
            | Action::SetExpiry { account, .. } => *account,
            Action::Trade { taker, .. } => *taker,
            Action::Liquidate { solid_account, .. } | Action::Vaporize { solid_account, .. } => *solid_account,
        }
    }

    /// The counterparty account, for actions that have one.
    pub fn other_account(&self) -> Option<usize> {
        match self {
            Action::Transfer { other_account, .. } => Some(*other_account),
            Action::Trade { maker, .. } => Some(*maker),
            Action::Liquidate { liquid_account, .. } => Some(*liquid_account),
            Action::Vaporize { vapor_account, .. } => Some(*vapor_account),
            _ => None,
        }
    }

    /// Markets the action names, in the order it names them.
    pub fn markets(&self) -> Vec<MarketId> {
        match self {
            Action::Deposit { market, .. }
            | Action::Withdraw { market, .. }
            | Action::Transfer { market, .. }
            | Action::SetExpiry { market, .. } => vec![*market],
            Action::Trade { input_market, output_market, .. } => vec![*input_market, *output_market],
            Action::Liquidate { owed_market, held_market, .. }
            | Action::Vaporize { owed_market, held_market, .. } => vec![*owed_market, *held_market],
            Action::Call { .. } => Vec::new(),
        }
    }
}

/// End-of-operation assertion that an account's balance in a market is not negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceCheck {
    pub account: usize,
    pub market: MarketId,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Operation {
    pub accounts: Vec<AccountInfo>,
    pub actions: Vec<Action>,
    pub balance_checks: Vec<BalanceCheck>,
}

impl Operation {
    pub fn builder() -> OperationBuilder {
        OperationBuilder::default()
    }

    /// Structural checks that need no ledger state.
    pub fn validate(&self) -> Result<(), EngineError> {
        let mut seen = HashSet::new();
        for account in &self.accounts {
            if !seen.insert(*account) {
                return Err(EngineError::DuplicateAccounts(*account));
            }
        }

        for action in &self.actions {
            let primary = self.check_index(action.primary_account())?;
            if let Some(other) = action.other_account() {
                if self.check_index(other)? == primary {
                    return Err(EngineError::DuplicateAccountsInAction);
                }
            }
            let markets = action.markets();
            if markets.len() == 2 && markets[0] == markets[1] {
                return Err(EngineError::DuplicateMarketsInAction);
            }
        }

        for check in &self.balance_checks {
            self.check_index(check.account)?;
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<usize, EngineError> {
        if index < self.accounts.len() {
            Ok(index)
        } else {
            Err(EngineError::InvalidAccountIndex(index))
        }
    }
}

/// Arguments of a Trade, kept apart because there are many of them.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeParams {
    pub taker: AccountInfo,
    pub maker: AccountInfo,
    pub input_market: MarketId,
    pub output_market: MarketId,
    pub auto_trader: Address,
    pub amount: AssetAmount,
    pub calculate_amount_with_maker_account: bool,
    pub data: Vec<u8>,
}

impl TradeParams {
    /// `amount` is the maker's input leg unless `with_taker_amount` is used.
    pub fn new(
        taker: AccountInfo,
        maker: AccountInfo,
        input_market: MarketId,
        output_market: MarketId,
        auto_trader: Address,
        amount: AssetAmount,
    ) -> Self {
        Self {
            taker,
            maker,
            input_market,
            output_market,
            auto_trader,
            amount,
            calculate_amount_with_maker_account: true,
            data: Vec::new(),
        }
    }

    pub fn with_taker_amount(mut self) -> Self {
        self.calculate_amount_with_maker_account = false;
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }
}

/** 8.2.1: assembles an Operation. accounts are interned, so each appears once */
#[derive(Debug, Clone, Default)]
pub struct OperationBuilder {
    accounts: Vec<AccountInfo>,
    actions: Vec<Action>,
    balance_checks: Vec<BalanceCheck>,
}

impl OperationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&mut self, account: AccountInfo) -> usize {
        match self.accounts.iter().position(|a| *a == account) {
            Some(index) => index,
            None => {
                self.accounts.push(account);
                self.accounts.len() - 1
            }
        }
    }

    pub fn deposit(mut self, account: AccountInfo, market: MarketId, amount: AssetAmount, from: Address) -> Self {
        let account = self.index_of(account);
        self.actions.push(Action::Deposit { account, market, amount, from });
        self
    }

    pub fn withdraw(mut self, account: AccountInfo, market: MarketId, amount: AssetAmount, to: Address) -> Self {
        let account = self.index_of(account);
        self.actions.push(Action::Withdraw { account, market, amount, to });
        self
    }

    pub fn transfer(mut self, from: AccountInfo, to: AccountInfo, market: MarketId, amount: AssetAmount) -> Self {
        let account = self.index_of(from);
        let other_account = self.index_of(to);
        self.actions.push(Action::Transfer { account, other_account, market, amount });
        self
    }

    pub fn trade(mut self, params: TradeParams) -> Self {
        let taker = self.index_of(params.taker);
        let maker = self.index_of(params.maker);
        self.actions.push(Action::Trade {
            taker,
            maker,
            input_market: params.input_market,
            output_market: params.output_market,
            auto_trader: params.auto_trader,
            amount: params.amount,
            calculate_amount_with_maker_account: params.calculate_amount_with_maker_account,
            data: params.data,
        });
        self
    }

    pub fn liquidate(
        mut self,
        solid: AccountInfo,
        liquid: AccountInfo,
        owed_market: MarketId,
        held_market: MarketId,
        amount: AssetAmount,
    ) -> Self {
        let solid_account = self.index_of(solid);
        let liquid_account = self.index_of(liquid);
        self.actions.push(Action::Liquidate {
            solid_account,
            liquid_account,
            owed_market,
            held_market,
            amount,
        });
        self
    }

    pub fn vaporize(
        mut self,
        solid: AccountInfo,
        vapor: AccountInfo,
        owed_market: MarketId,
        held_market: MarketId,
        amount: AssetAmount,
    ) -> Self {
        let solid_account = self.index_of(solid);
        let vapor_account = self.index_of(vapor);
        self.actions.push(Action::Vaporize {
            solid_account,
            vapor_account,
            owed_market,
            held_market,
            amount,
        });
        self
    }

    pub fn call(mut self, account: AccountInfo, callee: Address, data: Vec<u8>) -> Self {
        let account = self.index_of(account);
        self.actions.push(Action::Call { account, callee, data });
        self
    }

    pub fn set_expiry(mut self, account: AccountInfo, market: MarketId, time_delta: u64, force_update: bool) -> Self {
        let account = self.index_of(account);
        self.actions.push(Action::SetExpiry {
            account,
            market,
            time_delta,
            force_update,
        });
        self
    }

    pub fn require_non_negative(mut self, account: AccountInfo, market: MarketId) -> Self {
        let account = self.index_of(account);
        self.balance_checks.push(BalanceCheck { account, market });
        self
    }

    pub fn build(self) -> Operation {
        Operation {
            accounts: self.accounts,
            actions: self.actions,
            balance_checks: self.balance_checks,
        }
    }
}
