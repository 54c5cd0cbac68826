//! Shared ledger fixture for integration tests.
#![allow(dead_code)]

use margin_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::rc::Rc;

pub const ADMIN: Address = Address(1000);
pub const OWED_TOKEN: Address = Address(501);
pub const HELD_TOKEN: Address = Address(502);
pub const THIRD_TOKEN: Address = Address(503);
pub const LENDER: Address = Address(900);

pub fn acct(owner: u64, number: u64) -> AccountInfo {
    AccountInfo::new(Address(owner), number)
}

/** three markets priced at 1 with zero interest, and a lender funding each */
pub struct Fixture {
    pub ledger: Ledger,
    pub oracle: Rc<MockPriceOracle>,
    pub rates: Rc<FixedRateModel>,
    pub sentinel: Rc<MockOracleSentinel>,
    pub owed: MarketId,
    pub held: MarketId,
    pub third: MarketId,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig {
            admin: ADMIN,
            ..LedgerConfig::development()
        })
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        let mut ledger = Ledger::from_config(config).unwrap();
        let oracle = Rc::new(MockPriceOracle::new());
        let rates = Rc::new(FixedRateModel::zero());
        let sentinel = Rc::new(MockOracleSentinel::new());
        for token in [OWED_TOKEN, HELD_TOKEN, THIRD_TOKEN] {
            oracle.set_price(token, dec!(1));
        }

        let mut admin = ledger.admin(ADMIN).unwrap();
        let owed = admin
            .add_market(MarketParams::new(OWED_TOKEN), oracle.clone(), rates.clone())
            .unwrap();
        let held = admin
            .add_market(MarketParams::new(HELD_TOKEN), oracle.clone(), rates.clone())
            .unwrap();
        let third = admin
            .add_market(MarketParams::new(THIRD_TOKEN), oracle.clone(), rates.clone())
            .unwrap();
        admin.set_oracle_sentinel(sentinel.clone()).unwrap();

        let mut fixture = Self {
            ledger,
            oracle,
            rates,
            sentinel,
            owed,
            held,
            third,
        };
        for market in [owed, held, third] {
            fixture.deposit(AccountInfo::new(LENDER, 0), market, dec!(1000000));
        }
        fixture
    }

    pub fn token(&self, market: MarketId) -> Address {
        self.ledger.market(market).unwrap().token
    }

    pub fn set_price(&self, market: MarketId, price: Decimal) {
        self.oracle.set_price(self.token(market), price);
    }

    pub fn try_deposit(&mut self, account: AccountInfo, market: MarketId, amount: Decimal) -> Result<OperationResult, EngineError> {
        let op = Operation::builder()
            .deposit(account, market, AssetAmount::delta_wei(amount), account.owner)
            .build();
        self.ledger.operate(account.owner, &op)
    }

    pub fn deposit(&mut self, account: AccountInfo, market: MarketId, amount: Decimal) {
        self.try_deposit(account, market, amount).unwrap();
    }

    pub fn try_withdraw(&mut self, account: AccountInfo, market: MarketId, amount: Decimal) -> Result<OperationResult, EngineError> {
        let op = Operation::builder()
            .withdraw(account, market, AssetAmount::delta_wei(-amount), account.owner)
            .build();
        self.ledger.operate(account.owner, &op)
    }

    pub fn withdraw(&mut self, account: AccountInfo, market: MarketId, amount: Decimal) {
        self.try_withdraw(account, market, amount).unwrap();
    }

    /// Holds `held` collateral and owes `owed`, at a collateralization of
    /// `held / owed` once prices return to 1.
    pub fn open_position(&mut self, account: AccountInfo, held: Decimal, owed: Decimal) {
        self.set_price(self.held, dec!(10));
        self.deposit(account, self.held, held);
        self.withdraw(account, self.owed, owed);
        self.set_price(self.held, dec!(1));
    }

    /// Leaves `liquid` owing a little of the owed market with nothing left to
    /// seize. Interest paid by a large borrower leaves the owed market with
    /// reserves of about 1000, enough to cover that debt.
    pub fn make_vaporizable(&mut self, solid: AccountInfo, liquid: AccountInfo) {
        self.open_position(AccountInfo::new(Address(901), 0), dec!(200000), dec!(100000));
        self.open_position(liquid, dec!(110), dec!(100));
        self.deposit(solid, self.owed, dec!(10000));
        self.make_global_operator(solid.owner);

        self.rates.set_rate(dec!(0.0000001));
        self.ledger.advance_secs(1_000_000);
        self.set_price(self.held, dec!(0.5));
        let op = Operation::builder()
            .liquidate(solid, liquid, self.owed, self.held, AssetAmount::zero_target())
            .build();
        self.ledger.operate(solid.owner, &op).unwrap();
    }

    pub fn make_global_operator(&mut self, operator: Address) {
        self.ledger.admin(ADMIN).unwrap().set_global_operator(operator, true).unwrap();
    }

    pub fn par(&self, account: AccountInfo, market: MarketId) -> Decimal {
        self.ledger.par(&account, market).value()
    }

    pub fn wei(&self, account: AccountInfo, market: MarketId) -> Decimal {
        self.ledger.wei(&account, market).unwrap().value()
    }

    /// Payloads logged by one committed operation, in order.
    pub fn payloads(&self, result: &OperationResult) -> Vec<EventPayload> {
        let first = result.first_event.0;
        self.ledger
            .events()
            .iter()
            .filter(|event| event.id.0 >= first && event.id.0 < first + result.event_count as u64)
            .map(|event| event.payload.clone())
            .collect()
    }

    pub fn event_names(&self, result: &OperationResult) -> Vec<&'static str> {
        self.payloads(result).iter().map(EventPayload::name).collect()
    }
}
