// margin-core: cross-collateral margin ledger.
// every account can hold a positive or negative balance in any listed market;
// operations batch actions atomically and only commit if every account ends
// collateralized. deterministic, no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Address, AccountInfo, MarketId, Par, Wei, Price, AssetAmount
//   2.x  interest.rs: interest indexes, par/wei conversion, accrual
//   3.x  margin.rs: account valuation, collateralization, vaporizability
//   4.x  account.rs: balance store, account status
//   6.x  liquidation.rs: spread for a pair, adjusted prices, repayment bounds
//   6.3  risk.rs: risk params, hard limits, per-account overrides
//   7.x  config.rs: ledger config, env presets, TOML loading
//   8.x  engine/: ledger, operations, pipeline, actions, admin
//   9.x  oracle.rs: price oracles, rate models, oracle sentinel (mocked)
//   9.2  callbacks.rs: auto-traders, callees, liquidation callbacks
//   9.3  amm.rs: constant-product pools as auto-traders
//   11.x events.rs: ledger events for audit
//   12.x market.rs: market config + runtime state
//   14.x proxy/: AMM liquidator, borrow positions

// core ledger modules
pub mod account;
pub mod engine;
pub mod events;
pub mod interest;
pub mod liquidation;
pub mod margin;
pub mod market;
pub mod types;

// risk and safety modules
pub mod risk;

// integration modules
pub mod amm;
pub mod callbacks;
pub mod config;
pub mod oracle;
pub mod proxy;

// re exports for convenience
pub use account::*;
pub use engine::*;
pub use events::*;
pub use interest::*;
pub use liquidation::*;
pub use margin::*;
pub use market::*;
pub use risk::*;
pub use types::*;
pub use amm::{AmmError, ConstantProductPool, HopReserves};
pub use callbacks::{AutoTrader, Callee, CallbackError, CallContext, GasMeter, LiquidationCallback, LiquidationNotice, TradeQuote, TradeRequest};
pub use config::{ConfigError, Environment, LedgerConfig};
pub use oracle::{FixedRateModel, InterestRateModel, LinearRateModel, MockOracleSentinel, MockPriceOracle, OpenSentinel, OracleSentinel, PriceOracle};
pub use proxy::{AmmLiquidator, BalanceCheckFlag, BorrowPositionProxy, LiquidationPlan, LiquidationRequest, ProxyError};
