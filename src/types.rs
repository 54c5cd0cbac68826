// 1.0: all the primitives live here. nothing in the ledger works without these types.
// IDs, addresses, par/wei amounts, prices, timestamps. each is a newtype so the compiler
// catches par/wei mixups.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketId(pub u32);

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "market#{}", self.0)
    }
}

// identity of an owner, operator, token, auto-trader or callee
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/** 1.1: an account is (owner, number). it is only a key; balances live in the store */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountInfo {
    pub owner: Address,
    pub number: u64,
}

impl AccountInfo {
    pub fn new(owner: Address, number: u64) -> Self {
        Self { owner, number }
    }
}

impl fmt::Display for AccountInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.number)
    }
}

// 1.2: signed token quantities. par = principal, wei = actual tokens. both hold whole
// base units; conversions between them decide the rounding direction explicitly.
macro_rules! signed_amount {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        pub struct $name(Decimal);

        impl $name {
            pub fn new(value: Decimal) -> Self {
                Self(value)
            }

            pub fn zero() -> Self {
                Self(Decimal::ZERO)
            }

            pub fn value(&self) -> Decimal {
                self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            pub fn is_positive(&self) -> bool {
                self.0 > Decimal::ZERO
            }

            pub fn is_negative(&self) -> bool {
                self.0 < Decimal::ZERO
            }

            pub fn abs(&self) -> Self {
                Self(self.0.abs())
            }

            pub fn negate(&self) -> Self {
                Self(-self.0)
            }

            pub fn add(&self, other: Self) -> Self {
                Self(self.0 + other.0)
            }

            pub fn sub(&self, other: Self) -> Self {
                Self(self.0 - other.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

signed_amount!(Par);
signed_amount!(Wei);

// 1.3: oracle price per base unit. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.3.1: value in the oracle's numeraire. price * wei. account valuation uses this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Quote(Decimal);

impl Quote {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(&self, other: Quote) -> Self {
        Self(self.0 + other.0)
    }

    pub fn mul(&self, factor: Decimal) -> Self {
        Self(self.0 * factor)
    }

    pub fn div(&self, divisor: Decimal) -> Self {
        Self(self.0 / divisor)
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Sum for Quote {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, q| acc.add(q))
    }
}

// 1.4: millisecond timestamp. interest accrues per whole elapsed second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs * 1000)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn as_secs(&self) -> i64 {
        self.0.div_euclid(1000)
    }

    pub fn plus_secs(&self, secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(secs.saturating_mul(1000)))
    }

    // whole seconds from self to later, never negative
    pub fn elapsed_secs(&self, later: &Timestamp) -> Decimal {
        Decimal::from((later.as_secs() - self.as_secs()).max(0))
    }
}

/** 1.5: how an action expresses the amount it wants */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetDenomination {
    // actual tokens
    Wei,
    // principal
    Par,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetReference {
    // change the balance by value
    Delta,
    // set the balance to value
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    pub value: Decimal,
    pub denomination: AssetDenomination,
    pub reference: AssetReference,
}

impl AssetAmount {
    pub fn new(value: Decimal, denomination: AssetDenomination, reference: AssetReference) -> Self {
        Self { value, denomination, reference }
    }

    pub fn delta_wei(value: Decimal) -> Self {
        Self::new(value, AssetDenomination::Wei, AssetReference::Delta)
    }

    pub fn delta_par(value: Decimal) -> Self {
        Self::new(value, AssetDenomination::Par, AssetReference::Delta)
    }

    pub fn target_wei(value: Decimal) -> Self {
        Self::new(value, AssetDenomination::Wei, AssetReference::Target)
    }

    pub fn target_par(value: Decimal) -> Self {
        Self::new(value, AssetDenomination::Par, AssetReference::Target)
    }

    // Target 0 with either denomination
    pub fn zero_target() -> Self {
        Self::target_wei(Decimal::ZERO)
    }

    pub fn is_zero_delta(&self) -> bool {
        self.value.is_zero() && self.reference == AssetReference::Delta
    }
}

// 1.6: fractional helpers. every multiply-divide in the ledger goes through one of these
// so the rounding direction is visible at the call site.
pub fn get_partial(target: Decimal, numerator: Decimal, denominator: Decimal) -> Decimal {
    (target * numerator / denominator).trunc()
}

pub fn get_partial_round_up(target: Decimal, numerator: Decimal, denominator: Decimal) -> Decimal {
    let exact = target * numerator / denominator;
    if exact.is_sign_negative() {
        exact.floor()
    } else {
        exact.ceil()
    }
}

// 1 + x, used by every premium and spread
pub fn one_plus(x: Decimal) -> Decimal {
    dec!(1) + x
}
