//! Account valuation and collateralization.
//!
//! An account is collateralized when the value of its positive balances covers
//! the value of its negative balances times `1 + margin ratio`. When valuing for
//! liquidity, each market's margin premium shrinks that market's collateral
//! value and inflates its debt value, so riskier assets need more cover.
//!
//! Values are `price * wei` in the oracle's numeraire.

use crate::account::Account;
use crate::risk::AccountRiskOverride;
use crate::types::{one_plus, Price, Quote, Wei};
use rust_decimal::Decimal;

/// Total collateral and debt value of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountValues {
    pub supply: Quote,
    pub borrow: Quote,
}

impl AccountValues {
    pub fn add_balance(&mut self, wei: Wei, price: Price, margin_premium: Option<Decimal>) {
        if wei.is_zero() {
            return;
        }
        let value = Quote::new(wei.abs().value() * price.value());
        if wei.is_positive() {
            let adjusted = match margin_premium {
                Some(premium) => value.div(one_plus(premium)),
                None => value,
            };
            self.supply = self.supply.add(adjusted);
        } else {
            let adjusted = match margin_premium {
                Some(premium) => value.mul(one_plus(premium)),
                None => value,
            };
            self.borrow = self.borrow.add(adjusted);
        }
    }

    pub fn is_collateralized(&self, margin_ratio: Decimal) -> bool {
        if self.borrow.is_zero() {
            return true;
        }
        self.supply >= self.borrow.mul(one_plus(margin_ratio))
    }

    /// supply / borrow, None without debt.
    pub fn collateralization(&self) -> Option<Decimal> {
        if self.borrow.is_zero() {
            None
        } else {
            Some(self.supply.value() / self.borrow.value())
        }
    }
}

pub fn effective_margin_ratio(global: Decimal, account_override: &AccountRiskOverride) -> Decimal {
    if account_override.is_set() {
        account_override.margin_ratio
    } else {
        global
    }
}

/// No collateral anywhere and at least one debt.
pub fn is_vaporizable(account: &Account) -> bool {
    !account.has_positive_balance() && account.has_negative_balance()
}
