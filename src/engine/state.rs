// 8.0.3 engine/state.rs: everything an operation may mutate, plus the partial rollback snapshot.

use super::results::EngineError;
use crate::account::BalanceStore;
use crate::events::BalanceUpdate;
use crate::market::Market;
use crate::types::{AccountInfo, AssetAmount, MarketId, Par, Timestamp, Wei};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LedgerState {
    pub markets: BTreeMap<MarketId, Market>,
    pub balances: BalanceStore,
    pub expiries: BTreeMap<(AccountInfo, MarketId), Timestamp>,
}

impl LedgerState {
    pub fn market(&self, market_id: MarketId) -> Result<&Market, EngineError> {
        self.markets
            .get(&market_id)
            .ok_or(EngineError::MarketNotFound(market_id))
    }

    pub fn market_mut(&mut self, market_id: MarketId) -> Result<&mut Market, EngineError> {
        self.markets
            .get_mut(&market_id)
            .ok_or(EngineError::MarketNotFound(market_id))
    }

    pub fn par(&self, account: &AccountInfo, market_id: MarketId) -> Par {
        self.balances.get_par(account, market_id)
    }

    pub fn wei(&self, account: &AccountInfo, market_id: MarketId) -> Result<Wei, EngineError> {
        let market = self.market(market_id)?;
        Ok(self.balances.get_wei(account, market))
    }

    pub fn new_par_and_delta_wei(
        &self,
        account: &AccountInfo,
        market_id: MarketId,
        amount: AssetAmount,
    ) -> Result<(Par, Wei), EngineError> {
        let market = self.market(market_id)?;
        Ok(self.balances.get_new_par_and_delta_wei(account, market, amount))
    }

    pub fn set_par(&mut self, account: &AccountInfo, market_id: MarketId, new_par: Par) -> Result<(), EngineError> {
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(EngineError::MarketNotFound(market_id))?;
        self.balances.set_par(account, market, new_par);
        Ok(())
    }

    pub fn set_par_from_delta_wei(
        &mut self,
        account: &AccountInfo,
        market_id: MarketId,
        delta_wei: Wei,
    ) -> Result<(), EngineError> {
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(EngineError::MarketNotFound(market_id))?;
        self.balances.set_par_from_delta_wei(account, market, delta_wei);
        Ok(())
    }

    /// Event leg for a balance that just moved by `delta_wei`.
    pub fn update(&self, account: &AccountInfo, market_id: MarketId, delta_wei: Wei) -> BalanceUpdate {
        BalanceUpdate {
            delta_wei,
            new_par: self.par(account, market_id),
        }
    }

    pub fn expiry(&self, account: &AccountInfo, market_id: MarketId) -> Option<Timestamp> {
        self.expiries.get(&(*account, market_id)).copied()
    }

    /// Every market plus the listed accounts' balances and expiries. An
    /// operation only writes to its own accounts, so this is all it can change.
    pub fn snapshot(&self, accounts: &[AccountInfo]) -> Self {
        let mut expiries = BTreeMap::new();
        for account in accounts {
            for (key, at) in self.expiries.range(expiry_keys(account)) {
                expiries.insert(*key, *at);
            }
        }
        Self {
            markets: self.markets.clone(),
            balances: self.balances.subset(accounts),
            expiries,
        }
    }

    pub fn restore(&mut self, snapshot: Self, accounts: &[AccountInfo]) {
        self.markets = snapshot.markets;
        self.balances.restore(&snapshot.balances, accounts);
        for account in accounts {
            let stale: Vec<_> = self.expiries.range(expiry_keys(account)).map(|(key, _)| *key).collect();
            for key in stale {
                self.expiries.remove(&key);
            }
        }
        self.expiries.extend(snapshot.expiries);
    }
}

fn expiry_keys(account: &AccountInfo) -> RangeInclusive<(AccountInfo, MarketId)> {
    (*account, MarketId(u32::MIN))..=(*account, MarketId(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketParams;
    use crate::types::Address;
    use rust_decimal_macros::dec;

    #[test]
    fn restore_undoes_listed_accounts_and_markets() {
        let (alice, bob) = (AccountInfo::new(Address(1), 0), AccountInfo::new(Address(2), 0));
        let market_id = MarketId(0);
        let mut state = LedgerState::default();
        state
            .markets
            .insert(market_id, Market::new(market_id, &MarketParams::new(Address(9)), Timestamp::from_secs(0)));
        state.set_par(&alice, market_id, Par::new(dec!(10))).unwrap();
        state.set_par(&bob, market_id, Par::new(dec!(20))).unwrap();
        state.expiries.insert((bob, market_id), Timestamp::from_secs(50));
        let original = state.clone();

        let snapshot = state.snapshot(&[alice]);
        assert!(snapshot.balances.account(&bob).is_none());
        state.set_par(&alice, market_id, Par::new(dec!(-5))).unwrap();
        state.expiries.insert((alice, market_id), Timestamp::from_secs(70));

        state.restore(snapshot, &[alice]);
        assert_eq!(state, original);
    }
}
