//! Account balances and status.
//!
//! Accounts are keyed by (owner, number) and hold one signed par balance per
//! market. They are created on first write and never removed. `set_par` is the
//! only way a balance changes, and it keeps the market's aggregate par in step.

use crate::interest::{par_to_wei, wei_to_par};
use crate::market::Market;
use crate::types::{AccountInfo, AssetAmount, AssetDenomination, AssetReference, MarketId, Par, Wei};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccountStatus {
    #[default]
    Normal,
    Liquidating,
    Vaporizing,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Account {
    pub balances: BTreeMap<MarketId, Par>,
    pub status: AccountStatus,
}

impl Account {
    pub fn par(&self, market_id: MarketId) -> Par {
        self.balances.get(&market_id).copied().unwrap_or_default()
    }

    /// Markets holding a non-zero balance, ascending.
    pub fn markets_with_balances(&self) -> impl Iterator<Item = MarketId> + '_ {
        self.balances
            .iter()
            .filter(|(_, par)| !par.is_zero())
            .map(|(id, _)| *id)
    }

    pub fn number_of_markets_with_balances(&self) -> usize {
        self.markets_with_balances().count()
    }

    pub fn has_negative_balance(&self) -> bool {
        self.balances.values().any(|par| par.is_negative())
    }

    pub fn has_positive_balance(&self) -> bool {
        self.balances.values().any(|par| par.is_positive())
    }
}

/** 10.1: every balance in the system */
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BalanceStore {
    accounts: BTreeMap<AccountInfo, Account>,
}

impl BalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, account: &AccountInfo) -> Option<&Account> {
        self.accounts.get(account)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&AccountInfo, &Account)> {
        self.accounts.iter()
    }

    /// Copy of just the listed accounts.
    pub fn subset(&self, accounts: &[AccountInfo]) -> Self {
        let accounts = accounts
            .iter()
            .filter_map(|info| self.accounts.get(info).map(|a| (*info, a.clone())))
            .collect();
        Self { accounts }
    }

    /// Put the listed accounts back to how `saved` holds them. An account
    /// missing from `saved` is removed.
    pub fn restore(&mut self, saved: &BalanceStore, accounts: &[AccountInfo]) {
        for info in accounts {
            match saved.accounts.get(info) {
                Some(account) => {
                    self.accounts.insert(*info, account.clone());
                }
                None => {
                    self.accounts.remove(info);
                }
            }
        }
    }

    pub fn get_par(&self, account: &AccountInfo, market_id: MarketId) -> Par {
        self.accounts
            .get(account)
            .map(|a| a.par(market_id))
            .unwrap_or_default()
    }

    pub fn get_wei(&self, account: &AccountInfo, market: &Market) -> Wei {
        par_to_wei(self.get_par(account, market.id), &market.index)
    }

    pub fn status(&self, account: &AccountInfo) -> AccountStatus {
        self.accounts
            .get(account)
            .map(|a| a.status)
            .unwrap_or_default()
    }

    pub fn set_status(&mut self, account: &AccountInfo, status: AccountStatus) {
        self.accounts.entry(*account).or_default().status = status;
    }

    pub fn set_par(&mut self, account: &AccountInfo, market: &mut Market, new_par: Par) {
        let entry = self.accounts.entry(*account).or_default();
        let old_par = entry.par(market.id);
        if old_par == new_par {
            return;
        }
        market.total_par.replace(old_par, new_par);
        if new_par.is_zero() {
            entry.balances.remove(&market.id);
        } else {
            entry.balances.insert(market.id, new_par);
        }
    }

    /// Apply a wei delta, rounding the resulting par in the protocol's favor.
    pub fn set_par_from_delta_wei(&mut self, account: &AccountInfo, market: &mut Market, delta_wei: Wei) {
        if delta_wei.is_zero() {
            return;
        }
        let old_wei = self.get_wei(account, market);
        let new_par = wei_to_par(old_wei.add(delta_wei), &market.index);
        self.set_par(account, market, new_par);
    }

    /// Resolve an amount against the current balance into (new par, wei delta).
    pub fn get_new_par_and_delta_wei(
        &self,
        account: &AccountInfo,
        market: &Market,
        amount: AssetAmount,
    ) -> (Par, Wei) {
        let old_par = self.get_par(account, market.id);
        if amount.is_zero_delta() {
            return (old_par, Wei::zero());
        }

        let old_wei = par_to_wei(old_par, &market.index);
        match amount.denomination {
            AssetDenomination::Wei => {
                let mut delta_wei = Wei::new(amount.value);
                if amount.reference == AssetReference::Target {
                    delta_wei = delta_wei.sub(old_wei);
                }
                let new_par = wei_to_par(old_wei.add(delta_wei), &market.index);
                (new_par, delta_wei)
            }
            AssetDenomination::Par => {
                let mut new_par = Par::new(amount.value);
                if amount.reference == AssetReference::Delta {
                    new_par = old_par.add(new_par);
                }
                let delta_wei = par_to_wei(new_par, &market.index).sub(old_wei);
                (new_par, delta_wei)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketParams;
    use crate::types::{Address, Timestamp};
    use rust_decimal_macros::dec;

    fn market_at(borrow: rust_decimal::Decimal, supply: rust_decimal::Decimal) -> Market {
        let mut market = Market::new(MarketId(1), &MarketParams::new(Address(9)), Timestamp::from_secs(0));
        market.index.borrow = borrow;
        market.index.supply = supply;
        market
    }

    fn alice() -> AccountInfo {
        AccountInfo::new(Address(1), 0)
    }

    #[test]
    fn set_par_maintains_totals() {
        let mut market = market_at(dec!(1), dec!(1));
        let mut store = BalanceStore::new();

        store.set_par(&alice(), &mut market, Par::new(dec!(100)));
        store.set_par(&AccountInfo::new(Address(2), 0), &mut market, Par::new(dec!(-30)));
        assert_eq!(market.total_par.supply.value(), dec!(100));
        assert_eq!(market.total_par.borrow.value(), dec!(30));

        store.set_par(&alice(), &mut market, Par::zero());
        assert_eq!(market.total_par.supply.value(), dec!(0));
        assert!(store.account(&alice()).map(|a| a.balances.is_empty()).unwrap_or(false));
    }

    #[test]
    fn deposit_par_then_withdraw_all_wei() {
        let mut market = market_at(dec!(1), dec!(1));
        let mut store = BalanceStore::new();

        let (par, wei) = store.get_new_par_and_delta_wei(&alice(), &market, AssetAmount::delta_par(dec!(100)));
        assert_eq!((par.value(), wei.value()), (dec!(100), dec!(100)));
        store.set_par(&alice(), &mut market, par);

        let (par, wei) = store.get_new_par_and_delta_wei(&alice(), &market, AssetAmount::delta_wei(dec!(-100)));
        assert_eq!((par.value(), wei.value()), (dec!(0), dec!(-100)));
    }

    #[test]
    fn target_amounts_measure_from_current_balance() {
        let mut market = market_at(dec!(1.5), dec!(1.25));
        let mut store = BalanceStore::new();
        store.set_par(&alice(), &mut market, Par::new(dec!(200)));

        // 200 par = 250 wei; target 100 wei removes 150
        let (par, wei) = store.get_new_par_and_delta_wei(&alice(), &market, AssetAmount::target_wei(dec!(100)));
        assert_eq!((par.value(), wei.value()), (dec!(80), dec!(-150)));

        let (par, wei) = store.get_new_par_and_delta_wei(&alice(), &market, AssetAmount::target_par(dec!(-10)));
        assert_eq!((par.value(), wei.value()), (dec!(-10), dec!(-265)));
    }

    #[test]
    fn zero_delta_is_a_no_op() {
        let mut market = market_at(dec!(1.5), dec!(1.25));
        let mut store = BalanceStore::new();
        store.set_par(&alice(), &mut market, Par::new(dec!(-7)));

        let (par, wei) = store.get_new_par_and_delta_wei(&alice(), &market, AssetAmount::delta_wei(dec!(0)));
        assert_eq!(par.value(), dec!(-7));
        assert!(wei.is_zero());
    }

    #[test]
    fn delta_wei_rounds_debt_up() {
        let mut market = market_at(dec!(1.5), dec!(1));
        let mut store = BalanceStore::new();
        store.set_par_from_delta_wei(&alice(), &mut market, Wei::new(dec!(-10)));
        // 10 / 1.5 = 6.67 par of debt
        assert_eq!(store.get_par(&alice(), MarketId(1)).value(), dec!(-7));
        assert_eq!(market.total_par.borrow.value(), dec!(7));
    }

    #[test]
    fn restore_touches_only_listed_accounts() {
        let mut market = market_at(dec!(1), dec!(1));
        let mut store = BalanceStore::new();
        let (bob, carol) = (AccountInfo::new(Address(2), 0), AccountInfo::new(Address(3), 0));
        store.set_par(&alice(), &mut market, Par::new(dec!(10)));
        store.set_par(&carol, &mut market, Par::new(dec!(5)));

        let saved = store.subset(&[alice(), bob]);
        assert!(saved.account(&carol).is_none());
        store.set_par(&alice(), &mut market, Par::new(dec!(-3)));
        store.set_par(&bob, &mut market, Par::new(dec!(4)));
        store.set_status(&alice(), AccountStatus::Liquidating);

        store.restore(&saved, &[alice(), bob]);
        assert_eq!(store.get_par(&alice(), MarketId(1)).value(), dec!(10));
        assert_eq!(store.status(&alice()), AccountStatus::Normal);
        assert!(store.account(&bob).is_none());
        assert_eq!(store.get_par(&carol, MarketId(1)).value(), dec!(5));
    }

    #[test]
    fn status_defaults_to_normal() {
        let mut store = BalanceStore::new();
        assert_eq!(store.status(&alice()), AccountStatus::Normal);
        store.set_status(&alice(), AccountStatus::Liquidating);
        assert_eq!(store.status(&alice()), AccountStatus::Liquidating);
    }
}
