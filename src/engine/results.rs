// 8.0.2: result types and errors for engine operations.

use crate::amm::AmmError;
use crate::config::ConfigError;
use crate::events::EventId;
use crate::liquidation::LiquidationError;
use crate::risk::RiskParamError;
use crate::types::{AccountInfo, Address, MarketId, Wei};

/// What a committed operation left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    /// Id of the Operation event that opens this operation's log.
    pub first_event: EventId,
    pub event_count: usize,
    /// Markets loaded by the operation, in index-update order.
    pub markets: Vec<MarketId>,
}

/// Broad class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Permission,
    Invariant,
    ExternalDependency,
    ExternalCall,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    // permission
    #[error("Unpermissioned operator {operator} for account {account}")]
    UnpermissionedOperator { account: AccountInfo, operator: Address },

    #[error("Unpermissioned global operator {0}")]
    UnpermissionedGlobalOperator(Address),

    #[error("Unpermissioned admin {0}")]
    NotAdmin(Address),

    #[error("Invalid deposit source {0}")]
    InvalidDepositSource(Address),

    // invariants
    #[error("Cannot duplicate accounts: {0}")]
    DuplicateAccounts(AccountInfo),

    #[error("Invalid account index {0}")]
    InvalidAccountIndex(usize),

    #[error("Duplicate accounts in action")]
    DuplicateAccountsInAction,

    #[error("Duplicate markets in action")]
    DuplicateMarketsInAction,

    #[error("Requires non-primary account: {0}")]
    RequiresNonPrimaryAccount(AccountInfo),

    #[error("Market {0} not found")]
    MarketNotFound(MarketId),

    #[error("Market exists for token {0}")]
    MarketExists(Address),

    #[error("Market is closing: {0}")]
    MarketClosing(MarketId),

    #[error("Cannot deposit negative wei")]
    CannotDepositNegative,

    #[error("Cannot withdraw positive wei")]
    CannotWithdrawPositive,

    #[error("Insufficient token balance in {market}: requested {requested}, held {available}")]
    InsufficientTokenBalance { market: MarketId, requested: Wei, available: Wei },

    #[error("Unliquidatable account: {0}")]
    UnliquidatableAccount(AccountInfo),

    #[error("Unvaporizable account: {0}")]
    UnvaporizableAccount(AccountInfo),

    #[error("{0}")]
    Liquidation(#[from] LiquidationError),

    #[error("Undercollateralized account: {0}")]
    Undercollateralized(AccountInfo),

    #[error("Borrow value too low: {0}")]
    BorrowValueTooLow(AccountInfo),

    #[error("Too many non-zero balances: {0}")]
    TooManyBalances(AccountInfo),

    #[error("Total supply exceeds max supply in {0}")]
    SupplyCapExceeded(MarketId),

    #[error("Total borrow exceeds max borrow in {0}")]
    BorrowCapExceeded(MarketId),

    #[error("Invalid balance for {account} in {market}")]
    InvalidBalance { account: AccountInfo, market: MarketId },

    #[error("Negative excess in {0}")]
    NegativeExcess(MarketId),

    #[error("{0}")]
    RiskParam(#[from] RiskParamError),

    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    // external dependencies
    #[error("Invalid oracle price for {0}")]
    InvalidOraclePrice(MarketId),

    #[error("Borrowing is currently disabled")]
    BorrowingDisabled,

    #[error("Liquidations are currently disabled")]
    LiquidationsDisabled,

    #[error("Invalid oracle sentinel")]
    InvalidOracleSentinel,

    // external calls
    #[error("Auto-trader {0} not found")]
    AutoTraderNotFound(Address),

    #[error("Auto-trader {trader} failed: {reason}")]
    AutoTraderFailed { trader: Address, reason: String },

    #[error("Trader input mismatch from {0}")]
    TradeInputMismatch(Address),

    #[error("Trades cannot be one-sided")]
    OneSidedTrade,

    #[error("Callee {0} not found")]
    CalleeNotFound(Address),

    #[error("Call to {callee} failed: {reason}")]
    CallFailed { callee: Address, reason: String },

    #[error("{0}")]
    Amm(#[from] AmmError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::UnpermissionedOperator { .. }
            | EngineError::UnpermissionedGlobalOperator(_)
            | EngineError::NotAdmin(_)
            | EngineError::InvalidDepositSource(_) => ErrorKind::Permission,

            EngineError::InvalidOraclePrice(_)
            | EngineError::BorrowingDisabled
            | EngineError::LiquidationsDisabled
            | EngineError::InvalidOracleSentinel => ErrorKind::ExternalDependency,

            EngineError::AutoTraderNotFound(_)
            | EngineError::AutoTraderFailed { .. }
            | EngineError::TradeInputMismatch(_)
            | EngineError::OneSidedTrade
            | EngineError::CalleeNotFound(_)
            | EngineError::CallFailed { .. }
            | EngineError::Amm(_) => ErrorKind::ExternalCall,

            _ => ErrorKind::Invariant,
        }
    }
}
