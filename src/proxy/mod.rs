// 14.0: proxies. contracts-in-miniature that build whole operations for a caller
// and submit them under their own address.

mod amm_liquidator;
mod borrow_position;

pub use amm_liquidator::{AmmLiquidator, LiquidationPlan, LiquidationRequest};
pub use borrow_position::{BalanceCheckFlag, BorrowPositionProxy};

use crate::amm::AmmError;
use crate::engine::EngineError;
use crate::types::{Address, MarketId, Timestamp, Wei};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProxyError {
    #[error("Sender not operator")]
    SenderNotOperator,

    #[error("0-index token path incorrect <{0}>")]
    FirstPathToken(Address),

    #[error("last-index token path incorrect <{0}>")]
    LastPathToken(Address),

    #[error("Token path needs at least two tokens")]
    PathTooShort,

    #[error("No market for token {0}")]
    UnknownToken(Address),

    #[error("No pool for {0} -> {1}")]
    NoPool(MarketId, MarketId),

    #[error("owedMarket equals heldMarket <{0}, {1}>")]
    SameMarket(MarketId, MarketId),

    #[error("held market cannot be negative <{0}>")]
    HeldMarketNegative(MarketId),

    #[error("expiry mismatch")]
    ExpiryMismatch,

    #[error("Borrow not yet expired <{}>", .0.as_secs())]
    NotYetExpired(Timestamp),

    #[error("totalSolidHeldWei is too small <{0}, {1}>")]
    SolidHeldTooSmall(Wei, Wei),

    #[error("Owed output too small <{0}, {1}>")]
    OwedOutputTooSmall(Wei, Wei),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Amm(#[from] AmmError),
}
