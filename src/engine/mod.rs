// 8.0: the ledger engine. runs operations atomically against markets and
// account balances, accrues interest, and records events.
// deterministic with no external I/O; collaborators are injected.

mod actions;
mod admin;
mod config;
mod core;
mod liquidations;
mod operation;
mod pipeline;
mod pricing;
mod results;
mod state;
mod trades;

pub use admin::Admin;
pub use config::EngineConfig;
pub use core::Ledger;
pub use operation::{Action, BalanceCheck, Operation, OperationBuilder, TradeParams};
pub use results::{EngineError, ErrorKind, OperationResult};
pub use state::LedgerState;
