//! Margin ledger simulation.
//!
//! Walks the ledger through borrowing, interest, liquidation, AMM-routed
//! liquidation, isolated borrow positions and an aborted operation.
//! Set `MARGIN_SIM_CONFIG` to a TOML file to run against a custom config.

use anyhow::Context;
use log::info;
use margin_core::*;
use rust_decimal_macros::dec;
use std::rc::Rc;

const WETH: Address = Address(0xe7);
const USDC: Address = Address(0x0c);
const POOL: Address = Address(0xa0);
const LIQUIDATOR_PROXY: Address = Address(0xb1);
const BORROW_PROXY: Address = Address(0xb2);

/** shared setup: two markets, a mock oracle and a funded lender */
struct Sim {
    ledger: Ledger,
    admin: Address,
    oracle: Rc<MockPriceOracle>,
    weth: MarketId,
    usdc: MarketId,
}

impl Sim {
    fn new(config: &LedgerConfig) -> anyhow::Result<Self> {
        let mut ledger = Ledger::from_config(config.clone())?;
        let admin = config.admin;

        // one WETH unit is a milli-ether; one USDC unit is a dollar
        let oracle = Rc::new(MockPriceOracle::new());
        oracle.set_price(WETH, dec!(2));
        oracle.set_price(USDC, dec!(1));

        let mut gov = ledger.admin(admin)?;
        let weth = gov.add_market(MarketParams::new(WETH), oracle.clone(), Rc::new(FixedRateModel::zero()))?;
        let usdc = gov.add_market(
            MarketParams::new(USDC),
            oracle.clone(),
            Rc::new(LinearRateModel {
                base_rate: dec!(0.000000001),
                slope: dec!(0.00000001),
            }),
        )?;

        let mut sim = Self { ledger, admin, oracle, weth, usdc };
        sim.deposit(Address(0x10), sim.usdc, dec!(500000))?;
        Ok(sim)
    }

    fn deposit(&mut self, owner: Address, market: MarketId, amount: rust_decimal::Decimal) -> anyhow::Result<()> {
        let account = AccountInfo::new(owner, 0);
        let op = Operation::builder()
            .deposit(account, market, AssetAmount::delta_wei(amount), owner)
            .build();
        self.ledger.operate(owner, &op)?;
        Ok(())
    }

    fn borrow(&mut self, owner: Address, market: MarketId, amount: rust_decimal::Decimal) -> anyhow::Result<()> {
        let account = AccountInfo::new(owner, 0);
        let op = Operation::builder()
            .withdraw(account, market, AssetAmount::delta_wei(-amount), owner)
            .build();
        self.ledger.operate(owner, &op)?;
        Ok(())
    }

    fn show(&self, label: &str, owner: Address, number: u64) -> anyhow::Result<()> {
        let account = AccountInfo::new(owner, number);
        let values = self.ledger.account_values(&account, true)?;
        println!(
            "  {label}: WETH {} / USDC {} (supply ${}, borrow ${}, {:?})",
            self.ledger.wei(&account, self.weth)?,
            self.ledger.wei(&account, self.usdc)?,
            values.supply,
            values.borrow,
            self.ledger.status(&account)
        );
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::var("MARGIN_SIM_CONFIG") {
        Ok(path) => LedgerConfig::load(&path).with_context(|| format!("Loading simulation config from {path}"))?,
        Err(_) => {
            let mut config = LedgerConfig {
                admin: Address(0xad),
                ..LedgerConfig::development()
            };
            config.engine.genesis_secs = Timestamp::now().as_secs();
            config
        }
    };
    info!("running against {:?} config", config.environment);

    println!("Margin Ledger Simulation");
    println!("Cross-collateral accounts, atomic operations, liquidations\n");

    scenario_1_borrow_and_interest(&config)?;
    scenario_2_liquidation(&config)?;
    scenario_3_amm_liquidation(&config)?;
    scenario_4_borrow_positions(&config)?;
    scenario_5_atomic_rollback(&config)?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

/// Supply collateral, borrow against it, let interest run.
fn scenario_1_borrow_and_interest(config: &LedgerConfig) -> anyhow::Result<()> {
    println!("Scenario 1: Borrowing and Interest\n");
    let mut sim = Sim::new(config)?;
    let alice = Address(0x11);

    sim.deposit(alice, sim.weth, dec!(10000))?;
    sim.borrow(alice, sim.usdc, dec!(10000))?;
    println!("  Alice deposits 10 ETH and borrows $10,000");
    sim.show("Alice", alice, 0)?;

    let rate = sim.ledger.interest_rate(sim.usdc)?;
    println!("  USDC borrow rate: {rate}/s");

    sim.ledger.advance_secs(30 * 24 * 3600);
    let market = sim.ledger.accrued_market(sim.usdc)?;
    println!(
        "  After 30 days: borrow index {}, supply index {}",
        market.index.borrow.round_dp(6),
        market.index.supply.round_dp(6)
    );
    println!("  Alice owes {} USDC\n", par_to_wei(sim.ledger.par(&AccountInfo::new(alice, 0), sim.usdc), &market.index));
    Ok(())
}

/// A price drop makes an account liquidatable; a global operator takes the debt.
fn scenario_2_liquidation(config: &LedgerConfig) -> anyhow::Result<()> {
    println!("Scenario 2: Liquidation\n");
    let mut sim = Sim::new(config)?;
    let (alice, carol) = (Address(0x11), Address(0x12));

    sim.deposit(alice, sim.weth, dec!(10000))?;
    sim.borrow(alice, sim.usdc, dec!(15000))?;
    sim.deposit(carol, sim.usdc, dec!(20000))?;
    sim.ledger.admin(sim.admin)?.set_global_operator(carol, true)?;

    sim.oracle.set_price(WETH, dec!(1.7));
    println!("  ETH drops to $1,700");
    sim.show("Alice", alice, 0)?;
    println!("  Alice collateralized: {}", sim.ledger.is_collateralized(&AccountInfo::new(alice, 0))?);

    let (solid, liquid) = (AccountInfo::new(carol, 0), AccountInfo::new(alice, 0));
    let op = Operation::builder()
        .liquidate(solid, liquid, sim.usdc, sim.weth, AssetAmount::zero_target())
        .build();
    sim.ledger.operate(carol, &op)?;

    println!("  Carol liquidates Alice's USDC debt against her ETH");
    sim.show("Alice", alice, 0)?;
    sim.show("Carol", carol, 0)?;
    println!();
    Ok(())
}

/// Liquidation paid for by selling the seized collateral into a pool.
fn scenario_3_amm_liquidation(config: &LedgerConfig) -> anyhow::Result<()> {
    println!("Scenario 3: AMM-Routed Liquidation\n");
    let mut sim = Sim::new(config)?;
    let (eve, carol) = (Address(0x13), Address(0x12));

    sim.deposit(POOL, sim.weth, dec!(100000))?;
    sim.deposit(POOL, sim.usdc, dec!(200000))?;
    let mut liquidator = AmmLiquidator::new(LIQUIDATOR_PROXY);
    liquidator.add_pool(&mut sim.ledger, ConstantProductPool::new(POOL, sim.weth, sim.usdc));
    sim.ledger.admin(sim.admin)?.set_global_operator(LIQUIDATOR_PROXY, true)?;
    println!("  Pool seeded with 100 ETH and $200,000");

    sim.deposit(eve, sim.weth, dec!(1000))?;
    sim.borrow(eve, sim.usdc, dec!(1600))?;
    sim.oracle.set_price(WETH, dec!(1.8));
    println!("  Eve borrows $1,600 on 1 ETH, then ETH drops to $1,800");

    let request = LiquidationRequest::new(
        AccountInfo::new(carol, 0),
        AccountInfo::new(eve, 0),
        sim.usdc,
        sim.weth,
        vec![WETH, USDC],
    )
    .reverting_on_fail_to_sell();
    let plan = liquidator.plan(&sim.ledger, carol, &request)?;
    println!(
        "  Plan: repay {} USDC, seize {} WETH, sell {:?}",
        plan.owed_wei, plan.held_reward, plan.amounts
    );

    liquidator.liquidate(&mut sim.ledger, carol, &request)?;
    sim.show("Eve", eve, 0)?;
    sim.show("Carol", carol, 0)?;
    println!("  Carol started with nothing and keeps the spread\n");
    Ok(())
}

/// Collateral kept apart from an isolated borrow account.
fn scenario_4_borrow_positions(config: &LedgerConfig) -> anyhow::Result<()> {
    println!("Scenario 4: Isolated Borrow Positions\n");
    let mut sim = Sim::new(config)?;
    let frank = Address(0x14);
    let proxy = BorrowPositionProxy::new(BORROW_PROXY);
    sim.ledger.set_operator(frank, BORROW_PROXY, true);

    sim.deposit(frank, sim.weth, dec!(5000))?;
    sim.deposit(frank, sim.usdc, dec!(2000))?;
    proxy.open_borrow_position(&mut sim.ledger, frank, 0, 1, sim.weth, Wei::new(dec!(2000)), BalanceCheckFlag::From)?;

    let borrow_account = AccountInfo::new(frank, 1);
    let op = Operation::builder()
        .withdraw(borrow_account, sim.usdc, AssetAmount::delta_wei(dec!(-1500)), frank)
        .build();
    sim.ledger.operate(frank, &op)?;
    println!("  Frank moves 2 ETH into account 1 and borrows $1,500 there");
    sim.show("Frank/0", frank, 0)?;
    sim.show("Frank/1", frank, 1)?;

    proxy.repay_all_for_borrow_position(&mut sim.ledger, frank, 0, 1, sim.usdc, BalanceCheckFlag::Both)?;
    proxy.close_borrow_position(&mut sim.ledger, frank, 1, 0, &[sim.weth])?;
    println!("  Debt repaid from account 0, position closed");
    sim.show("Frank/0", frank, 0)?;
    sim.show("Frank/1", frank, 1)?;
    println!();
    Ok(())
}

/// A failing action anywhere leaves every balance untouched.
fn scenario_5_atomic_rollback(config: &LedgerConfig) -> anyhow::Result<()> {
    println!("Scenario 5: Atomic Rollback\n");
    let mut sim = Sim::new(config)?;
    let grace = Address(0x15);
    let account = AccountInfo::new(grace, 0);

    let before = sim.ledger.state().clone();
    let op = Operation::builder()
        .deposit(account, sim.weth, AssetAmount::delta_wei(dec!(1000)), grace)
        .withdraw(account, sim.usdc, AssetAmount::delta_wei(dec!(-5000)), grace)
        .build();
    match sim.ledger.operate(grace, &op) {
        Ok(_) => anyhow::bail!("over-borrow should not commit"),
        Err(err) => println!("  Deposit 1 ETH + borrow $5,000 rejected: {err} ({:?})", err.kind()),
    }
    println!("  State unchanged: {}", sim.ledger.state() == &before);

    let tail: Vec<&str> = sim.ledger.recent_events(3).iter().map(|e| e.payload.name()).collect();
    println!("  Last events: {tail:?}");
    Ok(())
}
