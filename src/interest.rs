//! Interest indexes and par/wei conversion.
//!
//! Balances are stored as par (principal). The actual token amount, wei, is par
//! times the market's supply index for positive balances or borrow index for
//! negative ones. Indexes only ever grow, so holding par makes interest accrue
//! to every account at once without touching them individually.
//!
//! Rounding always favors the protocol: positive balances truncate, negative
//! balances round their magnitude up in both directions.

use crate::types::{Par, Timestamp, Wei};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Fractional digits kept on index multipliers.
pub const INDEX_DECIMALS: u32 = 18;

/// Cumulative interest multipliers of one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub borrow: Decimal,
    pub supply: Decimal,
    pub last_update: Timestamp,
}

impl Index {
    pub fn new(now: Timestamp) -> Self {
        Self {
            borrow: Decimal::ONE,
            supply: Decimal::ONE,
            last_update: now,
        }
    }
}

/// Aggregate par of a market. `borrow` is stored as a non-negative magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TotalPar {
    pub supply: Par,
    pub borrow: Par,
}

impl TotalPar {
    /// Remove the old contribution of a balance and add the new one.
    pub fn replace(&mut self, old: Par, new: Par) {
        if old.is_positive() {
            self.supply = self.supply.sub(old);
        } else if old.is_negative() {
            self.borrow = self.borrow.sub(old.abs());
        }

        if new.is_positive() {
            self.supply = self.supply.add(new);
        } else if new.is_negative() {
            self.borrow = self.borrow.add(new.abs());
        }
    }
}

pub fn par_to_wei(par: Par, index: &Index) -> Wei {
    let value = par.value();
    if value >= Decimal::ZERO {
        Wei::new((value * index.supply).trunc())
    } else {
        Wei::new(-(value.abs() * index.borrow).ceil())
    }
}

pub fn wei_to_par(wei: Wei, index: &Index) -> Par {
    let value = wei.value();
    if value >= Decimal::ZERO {
        Par::new((value / index.supply).trunc())
    } else {
        Par::new(-(value.abs() / index.borrow).ceil())
    }
}

/// Total (supply wei, borrow wei magnitude) at the given index.
pub fn total_wei(total: &TotalPar, index: &Index) -> (Wei, Wei) {
    let supply = par_to_wei(total.supply, index);
    let borrow = par_to_wei(total.borrow.negate(), index).abs();
    (supply, borrow)
}

/// Roll an index forward to `now` given a per-second borrow rate.
///
/// Suppliers earn `earnings_rate` of what borrowers pay, scaled down by
/// borrow/supply utilization so that no interest is created from nothing.
pub fn accrue_index(
    index: &Index,
    total: &TotalPar,
    rate_per_second: Decimal,
    earnings_rate: Decimal,
    now: Timestamp,
) -> Index {
    if now <= index.last_update {
        return *index;
    }

    let elapsed = index.last_update.elapsed_secs(&now);
    let borrow_interest = rate_per_second * elapsed;

    let (supply_wei, borrow_wei) = total_wei(total, index);
    let supply_interest = if total.supply.is_zero() || supply_wei.is_zero() {
        Decimal::ZERO
    } else {
        let earned = borrow_interest * earnings_rate;
        if borrow_wei.value() < supply_wei.value() {
            earned * borrow_wei.value() / supply_wei.value()
        } else {
            earned
        }
    };

    Index {
        borrow: grow(index.borrow, borrow_interest),
        supply: grow(index.supply, supply_interest),
        last_update: now,
    }
}

fn grow(multiplier: Decimal, interest: Decimal) -> Decimal {
    (multiplier + multiplier * interest).round_dp_with_strategy(INDEX_DECIMALS, RoundingStrategy::ToZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn index(borrow: Decimal, supply: Decimal) -> Index {
        Index { borrow, supply, last_update: Timestamp::from_secs(0) }
    }

    #[test]
    fn positive_par_truncates() {
        let idx = index(dec!(1.5), dec!(1.25));
        assert_eq!(par_to_wei(Par::new(dec!(3)), &idx).value(), dec!(3)); // 3.75
        assert_eq!(wei_to_par(Wei::new(dec!(3)), &idx).value(), dec!(2)); // 2.4
    }

    #[test]
    fn negative_par_rounds_magnitude_up() {
        let idx = index(dec!(1.5), dec!(1.25));
        assert_eq!(par_to_wei(Par::new(dec!(-3)), &idx).value(), dec!(-5)); // 4.5
        assert_eq!(wei_to_par(Wei::new(dec!(-4)), &idx).value(), dec!(-3)); // 2.67
    }

    #[test]
    fn totals_track_sign_changes() {
        let mut total = TotalPar::default();
        total.replace(Par::zero(), Par::new(dec!(100)));
        total.replace(Par::zero(), Par::new(dec!(-40)));
        assert_eq!(total.supply.value(), dec!(100));
        assert_eq!(total.borrow.value(), dec!(40));

        // flip a supplier into a borrower
        total.replace(Par::new(dec!(100)), Par::new(dec!(-10)));
        assert_eq!(total.supply.value(), dec!(0));
        assert_eq!(total.borrow.value(), dec!(50));
    }

    #[test]
    fn accrual_scales_supply_by_utilization() {
        let idx = index(dec!(1), dec!(1));
        let total = TotalPar { supply: Par::new(dec!(1000)), borrow: Par::new(dec!(500)) };
        let next = accrue_index(&idx, &total, dec!(0.001), dec!(0.9), Timestamp::from_secs(10));

        // 1% borrow interest, 0.9 earnings, half utilization
        assert_eq!(next.borrow, dec!(1.01));
        assert_eq!(next.supply, dec!(1.0045));
        assert_eq!(next.last_update, Timestamp::from_secs(10));
    }

    #[test]
    fn accrual_without_supply_only_moves_borrow() {
        let idx = index(dec!(1), dec!(1));
        let next = accrue_index(&idx, &TotalPar::default(), dec!(0.01), dec!(1), Timestamp::from_secs(5));
        assert_eq!(next.borrow, dec!(1.05));
        assert_eq!(next.supply, dec!(1));
    }

    #[test]
    fn accrual_at_same_time_is_noop() {
        let idx = index(dec!(1.2), dec!(1.1));
        let same = accrue_index(&idx, &TotalPar::default(), dec!(0.5), dec!(1), Timestamp::from_secs(0));
        assert_eq!(same, idx);
    }
}
