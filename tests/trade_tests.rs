//! Trade actions against custom auto-traders, and Call actions.

mod common;

use common::*;
use margin_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::cell::RefCell;
use std::rc::Rc;

const TRADER: Address = Address(600);
const CALLEE: Address = Address(650);

#[derive(Clone, Copy)]
enum Quirk {
    Honest,
    SameDirection,
    WrongEcho,
    Refuse,
}

/// Pays `ratio` output tokens per input token.
struct RatioTrader {
    ratio: Decimal,
    quirk: Quirk,
}

impl AutoTrader for RatioTrader {
    fn get_trade_cost(&self, request: &TradeRequest<'_>) -> Result<TradeQuote, String> {
        let out = request.input_wei.value() * self.ratio;
        // the answer is read against whichever account the amount was given for
        let output = if request.calculate_amount_with_maker_account { -out } else { out };
        let mut quote = TradeQuote::for_request(request, AssetAmount::delta_wei(output));
        match self.quirk {
            Quirk::Honest => {}
            Quirk::SameDirection => quote.output = AssetAmount::delta_wei(-output),
            Quirk::WrongEcho => quote.input_wei = request.input_wei.add(Wei::new(dec!(1))),
            Quirk::Refuse => return Err("no liquidity".to_string()),
        }
        Ok(quote)
    }
}

fn trading_setup(quirk: Quirk) -> (Fixture, AccountInfo, AccountInfo) {
    let mut f = Fixture::new();
    let (taker, maker) = (acct(20, 0), acct(21, 0));
    f.deposit(taker, f.held, dec!(1000));
    f.deposit(maker, f.owed, dec!(1000));
    f.ledger
        .register_auto_trader(TRADER, Rc::new(RatioTrader { ratio: dec!(2), quirk }));
    f.ledger.set_operator(maker.owner, TRADER, true);
    (f, taker, maker)
}

fn trade(f: &Fixture, taker: AccountInfo, maker: AccountInfo) -> TradeParams {
    TradeParams::new(taker, maker, f.held, f.owed, TRADER, AssetAmount::delta_wei(dec!(100)))
}

#[test]
fn maker_amount_trade_moves_both_legs() {
    let (mut f, taker, maker) = trading_setup(Quirk::Honest);
    let op = Operation::builder().trade(trade(&f, taker, maker)).build();
    let result = f.ledger.operate(taker.owner, &op).unwrap();

    assert_eq!((f.par(taker, f.held), f.par(taker, f.owed)), (dec!(900), dec!(200)));
    assert_eq!((f.par(maker, f.held), f.par(maker, f.owed)), (dec!(100), dec!(800)));
    assert!(f.event_names(&result).contains(&"Trade"));
    assert_eq!(f.ledger.status(&maker), AccountStatus::Normal);
}

#[test]
fn taker_amount_trade_is_read_from_the_taker() {
    let (mut f, taker, maker) = trading_setup(Quirk::Honest);
    let params = TradeParams::new(taker, maker, f.held, f.owed, TRADER, AssetAmount::delta_wei(dec!(-100)))
        .with_taker_amount();
    let op = Operation::builder().trade(params).build();
    f.ledger.operate(taker.owner, &op).unwrap();

    assert_eq!((f.par(taker, f.held), f.par(taker, f.owed)), (dec!(900), dec!(200)));
    assert_eq!((f.par(maker, f.held), f.par(maker, f.owed)), (dec!(100), dec!(800)));
}

#[test]
fn maker_must_approve_the_trader() {
    let (mut f, taker, maker) = trading_setup(Quirk::Honest);
    f.ledger.set_operator(maker.owner, TRADER, false);
    let op = Operation::builder().trade(trade(&f, taker, maker)).build();
    assert_eq!(
        f.ledger.operate(taker.owner, &op),
        Err(EngineError::UnpermissionedOperator {
            account: maker,
            operator: TRADER
        })
    );
}

#[test]
fn unknown_trader_fails() {
    let (mut f, taker, maker) = trading_setup(Quirk::Honest);
    let stranger = Address(601);
    f.ledger.set_operator(maker.owner, stranger, true);
    let params = TradeParams::new(taker, maker, f.held, f.owed, stranger, AssetAmount::delta_wei(dec!(100)));
    let op = Operation::builder().trade(params).build();
    assert_eq!(f.ledger.operate(taker.owner, &op), Err(EngineError::AutoTraderNotFound(stranger)));
}

#[test]
fn misbehaving_traders_abort_the_operation() {
    let cases = [
        (Quirk::SameDirection, EngineError::OneSidedTrade),
        (Quirk::WrongEcho, EngineError::TradeInputMismatch(TRADER)),
        (
            Quirk::Refuse,
            EngineError::AutoTraderFailed {
                trader: TRADER,
                reason: "no liquidity".to_string(),
            },
        ),
    ];
    for (quirk, expected) in cases {
        let (mut f, taker, maker) = trading_setup(quirk);
        let before = f.ledger.state().clone();
        let op = Operation::builder().trade(trade(&f, taker, maker)).build();
        let err = f.ledger.operate(taker.owner, &op).unwrap_err();
        assert_eq!(err, expected);
        assert_eq!(err.kind(), ErrorKind::ExternalCall);
        assert_eq!(f.ledger.state(), &before);
    }
}

#[test]
fn trade_into_debt_is_checked_for_collateral() {
    let (mut f, taker, maker) = trading_setup(Quirk::Honest);
    // the maker takes 100 held for 2000 owed, more than it has
    let params = TradeParams::new(taker, maker, f.held, f.owed, TRADER, AssetAmount::delta_wei(dec!(1000)));
    let op = Operation::builder().trade(params).build();
    assert_eq!(f.ledger.operate(taker.owner, &op), Err(EngineError::Undercollateralized(maker)));
}

#[test]
fn constant_product_pool_quotes_a_swap() {
    let mut f = Fixture::new();
    let pool = ConstantProductPool::new(Address(700), f.held, f.owed);
    f.deposit(pool.account(), f.held, dec!(10000));
    f.deposit(pool.account(), f.owed, dec!(10000));
    f.ledger.register_auto_trader(pool.address, Rc::new(pool.clone()));

    let trader = acct(20, 0);
    f.deposit(trader, f.held, dec!(1000));
    let params = TradeParams::new(trader, pool.account(), f.held, f.owed, pool.address, AssetAmount::delta_wei(dec!(1000)));
    f.ledger.operate(trader.owner, &Operation::builder().trade(params).build()).unwrap();

    // 1000 * 997 * 10000 / (10000 * 1000 + 1000 * 997)
    assert_eq!(f.par(trader, f.owed), dec!(906));
    assert_eq!(f.par(trader, f.held), dec!(0));
    assert_eq!(f.par(pool.account(), f.held), dec!(11000));
    assert_eq!(f.par(pool.account(), f.owed), dec!(9094));
}

struct Journal {
    calls: RefCell<Vec<(Address, AccountInfo, Vec<u8>)>>,
    fail: bool,
}

impl Callee for Journal {
    fn call_function(&self, context: &CallContext<'_>) -> Result<(), String> {
        if self.fail {
            return Err("journal closed".to_string());
        }
        self.calls
            .borrow_mut()
            .push((context.sender, context.account, context.data.to_vec()));
        Ok(())
    }
}

#[test]
fn call_passes_sender_account_and_data() {
    let mut f = Fixture::new();
    let journal = Rc::new(Journal {
        calls: RefCell::new(Vec::new()),
        fail: false,
    });
    f.ledger.register_callee(CALLEE, journal.clone());

    let account = acct(30, 2);
    let op = Operation::builder().call(account, CALLEE, vec![1, 2, 3]).build();
    let result = f.ledger.operate(account.owner, &op).unwrap();

    assert_eq!(*journal.calls.borrow(), vec![(account.owner, account, vec![1, 2, 3])]);
    assert!(f.event_names(&result).contains(&"Call"));
}

#[test]
fn failing_callee_rolls_back_earlier_actions() {
    let mut f = Fixture::new();
    f.ledger.register_callee(
        CALLEE,
        Rc::new(Journal {
            calls: RefCell::new(Vec::new()),
            fail: true,
        }),
    );
    let account = acct(30, 0);
    let op = Operation::builder()
        .deposit(account, f.owed, AssetAmount::delta_wei(dec!(50)), account.owner)
        .call(account, CALLEE, Vec::new())
        .build();

    assert_eq!(
        f.ledger.operate(account.owner, &op),
        Err(EngineError::CallFailed {
            callee: CALLEE,
            reason: "journal closed".to_string()
        })
    );
    assert_eq!(f.par(account, f.owed), dec!(0));

    let unknown = Operation::builder().call(account, Address(651), Vec::new()).build();
    assert_eq!(f.ledger.operate(account.owner, &unknown), Err(EngineError::CalleeNotFound(Address(651))));
}

/// Trades one for one, but only when handed the right data.
struct DataGate;

impl AutoTrader for DataGate {
    fn get_trade_cost(&self, request: &TradeRequest<'_>) -> Result<TradeQuote, String> {
        if request.data != &b"go"[..] {
            return Err("bad data".to_string());
        }
        Ok(TradeQuote::for_request(request, AssetAmount::delta_wei(-request.input_wei.value())))
    }
}

#[test]
fn trade_data_reaches_the_trader() {
    let (mut f, taker, maker) = trading_setup(Quirk::Honest);
    let gate = Address(602);
    f.ledger.register_auto_trader(gate, Rc::new(DataGate));
    f.ledger.set_operator(maker.owner, gate, true);

    let params = TradeParams::new(taker, maker, f.held, f.owed, gate, AssetAmount::delta_wei(dec!(100)));
    let silent = Operation::builder().trade(params.clone()).build();
    assert_eq!(
        f.ledger.operate(taker.owner, &silent),
        Err(EngineError::AutoTraderFailed {
            trader: gate,
            reason: "bad data".to_string()
        })
    );

    let op = Operation::builder().trade(params.with_data(b"go".to_vec())).build();
    f.ledger.operate(taker.owner, &op).unwrap();
    assert_eq!((f.par(taker, f.held), f.par(taker, f.owed)), (dec!(900), dec!(100)));
    assert_eq!((f.par(maker, f.held), f.par(maker, f.owed)), (dec!(100), dec!(900)));
}
