// 7.0 config.rs: everything needed to stand up a ledger. engine knobs, admin, risk params.
// 7.1 presets per environment, TOML loading for the simulation binary.

use anyhow::Context;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::engine::EngineConfig;
use crate::risk::{RiskLimits, RiskParamError, RiskParams};
use crate::types::Address;

/** 7.2: full ledger configuration */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub environment: Environment,
    #[serde(default)]
    pub engine: EngineConfig,
    // the only address allowed to obtain the admin surface
    pub admin: Address,
    #[serde(default)]
    pub risk_params: RiskParams,
    #[serde(default)]
    pub risk_limits: RiskLimits,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl LedgerConfig {
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            engine: EngineConfig::default(),
            admin: Address(0),
            risk_params: RiskParams::default(),
            risk_limits: RiskLimits::default(),
        }
    }

    pub fn testnet() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Testnet;
        config.risk_params.min_borrowed_value = dec!(1);
        config
    }

    // wider margins, dust debt rejected, fewer markets per account
    pub fn mainnet_conservative() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Mainnet;
        config.engine.max_events = 1_000_000;
        config.risk_params.margin_ratio = dec!(0.25);
        config.risk_params.liquidation_spread = dec!(0.08);
        config.risk_params.earnings_rate = dec!(0.85);
        config.risk_params.min_borrowed_value = dec!(10);
        config.risk_params.account_max_number_of_markets_with_balances = 16;
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_events == 0 {
            return Err(ConfigError::InvalidEngine {
                reason: "max_events must be positive".to_string(),
            });
        }

        let limits = &self.risk_limits;
        if limits.max_number_of_markets_with_balances_min > limits.max_number_of_markets_with_balances_max {
            return Err(ConfigError::InvalidLimits {
                reason: "markets-with-balances bounds are inverted".to_string(),
            });
        }
        if limits.margin_ratio_max <= Decimal::ZERO {
            return Err(ConfigError::InvalidLimits {
                reason: "margin ratio max must be positive".to_string(),
            });
        }

        self.risk_params.validate(limits)?;
        Ok(())
    }

    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let config: LedgerConfig = toml::from_str(raw).context("Failed to parse ledger config TOML")?;
        config.validate().context("Ledger config failed validation")?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize ledger config")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid engine config: {reason}")]
    InvalidEngine { reason: String },

    #[error("invalid risk limits: {reason}")]
    InvalidLimits { reason: String },

    #[error("invalid risk params: {0}")]
    InvalidRisk(#[from] RiskParamError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> LedgerConfig {
        match self {
            Environment::Development => LedgerConfig::development(),
            Environment::Testnet => LedgerConfig::testnet(),
            Environment::Mainnet => LedgerConfig::mainnet_conservative(),
        }
    }
}
