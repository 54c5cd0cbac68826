//! Price oracles, interest rate models and the oracle sentinel.
//!
//! These are consumed as pure functions by the ledger. The implementations
//! here are deterministic and settable from the outside so the simulation and
//! the tests can move prices and flip the sentinel between operations.

use crate::types::{Address, Wei};
use rust_decimal::Decimal;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Returns the price of one base unit of `token`. Non-positive prices are
/// rejected by the ledger.
pub trait PriceOracle {
    fn get_price(&self, token: Address) -> Decimal;
}

/// Per-second borrow rate given current market utilization.
pub trait InterestRateModel {
    fn get_interest_rate(&self, token: Address, borrow_wei: Wei, supply_wei: Wei) -> Decimal;
}

/// Global gate that can suspend borrowing or liquidations, e.g. during a
/// sequencer outage.
pub trait OracleSentinel {
    fn is_borrow_allowed(&self) -> bool;
    fn is_liquidation_allowed(&self) -> bool;
}

/// Oracle with prices set directly per token.
#[derive(Debug, Default)]
pub struct MockPriceOracle {
    prices: RefCell<HashMap<Address, Decimal>>,
}

impl MockPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(token: Address, price: Decimal) -> Self {
        let oracle = Self::new();
        oracle.set_price(token, price);
        oracle
    }

    pub fn set_price(&self, token: Address, price: Decimal) {
        self.prices.borrow_mut().insert(token, price);
    }
}

impl PriceOracle for MockPriceOracle {
    fn get_price(&self, token: Address) -> Decimal {
        self.prices.borrow().get(&token).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Same rate regardless of utilization.
#[derive(Debug)]
pub struct FixedRateModel {
    rate: Cell<Decimal>,
}

impl FixedRateModel {
    pub fn new(rate_per_second: Decimal) -> Self {
        Self { rate: Cell::new(rate_per_second) }
    }

    pub fn zero() -> Self {
        Self::new(Decimal::ZERO)
    }

    pub fn set_rate(&self, rate_per_second: Decimal) {
        self.rate.set(rate_per_second);
    }
}

impl InterestRateModel for FixedRateModel {
    fn get_interest_rate(&self, _token: Address, _borrow_wei: Wei, _supply_wei: Wei) -> Decimal {
        self.rate.get()
    }
}

/// `base + slope * utilization`, utilization capped at 1.
#[derive(Debug, Clone)]
pub struct LinearRateModel {
    pub base_rate: Decimal,
    pub slope: Decimal,
}

impl InterestRateModel for LinearRateModel {
    fn get_interest_rate(&self, _token: Address, borrow_wei: Wei, supply_wei: Wei) -> Decimal {
        if supply_wei.is_zero() {
            return self.base_rate;
        }
        let utilization = (borrow_wei.value() / supply_wei.value()).min(Decimal::ONE);
        self.base_rate + self.slope * utilization
    }
}

/// Sentinel that never objects. the ledger's default.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSentinel;

impl OracleSentinel for OpenSentinel {
    fn is_borrow_allowed(&self) -> bool {
        true
    }

    fn is_liquidation_allowed(&self) -> bool {
        true
    }
}

/// Sentinel whose answers can be flipped at runtime.
#[derive(Debug)]
pub struct MockOracleSentinel {
    borrow_allowed: Cell<bool>,
    liquidation_allowed: Cell<bool>,
}

impl Default for MockOracleSentinel {
    fn default() -> Self {
        Self {
            borrow_allowed: Cell::new(true),
            liquidation_allowed: Cell::new(true),
        }
    }
}

impl MockOracleSentinel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_borrow_allowed(&self, allowed: bool) {
        self.borrow_allowed.set(allowed);
    }

    pub fn set_liquidation_allowed(&self, allowed: bool) {
        self.liquidation_allowed.set(allowed);
    }
}

impl OracleSentinel for MockOracleSentinel {
    fn is_borrow_allowed(&self) -> bool {
        self.borrow_allowed.get()
    }

    fn is_liquidation_allowed(&self) -> bool {
        self.liquidation_allowed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mock_oracle_defaults_to_zero() {
        let oracle = MockPriceOracle::with_price(Address(1), dec!(2));
        assert_eq!(oracle.get_price(Address(1)), dec!(2));
        assert_eq!(oracle.get_price(Address(2)), dec!(0));
    }

    #[test]
    fn linear_model_caps_utilization() {
        let model = LinearRateModel { base_rate: dec!(0.01), slope: dec!(0.1) };
        let rate = model.get_interest_rate(Address(1), Wei::new(dec!(50)), Wei::new(dec!(100)));
        assert_eq!(rate, dec!(0.06));
        let capped = model.get_interest_rate(Address(1), Wei::new(dec!(500)), Wei::new(dec!(100)));
        assert_eq!(capped, dec!(0.11));
        assert_eq!(model.get_interest_rate(Address(1), Wei::zero(), Wei::zero()), dec!(0.01));
    }

    #[test]
    fn sentinel_toggles() {
        let sentinel = MockOracleSentinel::new();
        assert!(sentinel.is_borrow_allowed());
        sentinel.set_liquidation_allowed(false);
        assert!(!sentinel.is_liquidation_allowed());
    }
}
