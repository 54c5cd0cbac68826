// 8.0.1 engine/config.rs: knobs of the engine itself, as opposed to risk params.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Events kept in memory. the oldest are dropped first.
    pub max_events: usize,
    /// Clock reading of a fresh ledger, unix seconds.
    pub genesis_secs: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            genesis_secs: 0,
        }
    }
}
