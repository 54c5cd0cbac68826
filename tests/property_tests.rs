//! Property-based tests for the ledger math and operation atomicity.
//!
//! These tests verify invariants hold under random inputs.

mod common;

use common::*;
use margin_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// Strategies for generating test data
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(Decimal::from) // 1 to 10M token units
}

fn index_strategy() -> impl Strategy<Value = Decimal> {
    (1_000_000i64..5_000_000i64).prop_map(|x| Decimal::new(x, 6)) // 1.0 to 5.0
}

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|x| Decimal::new(x, 2)) // $0.01 to $10,000
}

fn premium_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=200i64).prop_map(|x| Decimal::new(x, 2)) // 0% to 200%
}

fn index(supply: Decimal, borrow: Decimal) -> Index {
    Index {
        borrow,
        supply,
        last_update: Timestamp::from_secs(0),
    }
}

proptest! {
    /// Converting a supply balance to par and back never creates tokens and
    /// loses at most one index step.
    #[test]
    fn supply_round_trip_rounds_down(
        amount in amount_strategy(),
        supply in index_strategy(),
    ) {
        let idx = index(supply, supply);
        let wei = Wei::new(amount);
        let back = par_to_wei(wei_to_par(wei, &idx), &idx);

        prop_assert!(back <= wei);
        prop_assert!(back.value() >= amount - supply - Decimal::ONE);
    }

    /// Debt never shrinks when converted to par and back.
    #[test]
    fn borrow_round_trip_rounds_away_from_zero(
        amount in amount_strategy(),
        borrow in index_strategy(),
    ) {
        let idx = index(Decimal::ONE, borrow);
        let wei = Wei::new(-amount);
        let par = wei_to_par(wei, &idx);
        let back = par_to_wei(par, &idx);

        prop_assert!(par.is_negative());
        prop_assert!(back.abs() >= wei.abs());
    }

    /// The liquidator never gets more collateral than the repayment is worth
    /// at the adjusted price, and a collateral amount never repays more debt
    /// than was asked for.
    #[test]
    fn liquidation_conversions_favor_the_liquid_account(
        owed in amount_strategy(),
        held_price in price_strategy(),
        owed_price in price_strategy(),
        spread in (0i64..=50i64).prop_map(|x| Decimal::new(x, 2)),
    ) {
        let prices = LiquidationPrices::new(
            Price::new_unchecked(held_price),
            Price::new_unchecked(owed_price),
            spread,
        );
        let held = prices.owed_wei_to_held_wei(Wei::new(owed));
        prop_assert!(held.value() * held_price <= owed * prices.owed_adjusted.value());

        let back = prices.held_wei_to_owed_wei(held);
        prop_assert!(back.value() <= owed);
    }

    /// Premiums only ever widen the spread; an override replaces it outright.
    #[test]
    fn pair_spread_is_monotonic_in_premiums(
        base in (1i64..=50i64).prop_map(|x| Decimal::new(x, 2)),
        held_premium in premium_strategy(),
        owed_premium in premium_strategy(),
        extra in premium_strategy(),
    ) {
        let none = AccountRiskOverride::none();
        let spread = liquidation_spread_for_pair(base, held_premium, owed_premium, &none);
        let wider = liquidation_spread_for_pair(base, held_premium + extra, owed_premium, &none);

        prop_assert!(spread >= base);
        prop_assert!(wider >= spread);

        let pinned = AccountRiskOverride::new(dec!(0.5), dec!(0.07));
        prop_assert_eq!(liquidation_spread_for_pair(base, held_premium, owed_premium, &pinned), dec!(0.07));
    }

    /// Collateralization is exactly supply >= borrow * (1 + margin).
    #[test]
    fn collateralized_iff_supply_covers_margin(
        supply in amount_strategy(),
        borrow in amount_strategy(),
        price in price_strategy(),
        margin in (0i64..=100i64).prop_map(|x| Decimal::new(x, 2)),
    ) {
        let price = Price::new_unchecked(price);
        let mut values = AccountValues::default();
        values.add_balance(Wei::new(supply), price, None);
        values.add_balance(Wei::new(-borrow), price, None);

        let expected = supply * price.value() >= borrow * price.value() * (Decimal::ONE + margin);
        prop_assert_eq!(values.is_collateralized(margin), expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// A transfer moves par between accounts without changing the market total.
    #[test]
    fn transfer_conserves_par(
        deposit in 1i64..1_000_000i64,
        share in 0u32..=100u32,
    ) {
        let mut f = Fixture::new();
        let (from, to) = (acct(1, 0), acct(1, 1));
        let deposit = Decimal::from(deposit);
        f.deposit(from, f.owed, deposit);
        let total_before = f.ledger.market(f.owed).unwrap().total_par;

        let amount = (deposit * Decimal::from(share) / dec!(100)).trunc();
        let op = Operation::builder()
            .transfer(from, to, f.owed, AssetAmount::delta_wei(-amount))
            .build();
        f.ledger.operate(from.owner, &op).unwrap();

        prop_assert_eq!(f.par(from, f.owed) + f.par(to, f.owed), deposit);
        prop_assert_eq!(f.ledger.market(f.owed).unwrap().total_par, total_before);
    }

    /// An operation that fails verification leaves no trace.
    #[test]
    fn failed_operation_is_atomic(
        collateral in 1i64..50_000i64,
        deposit in 1i64..40_000i64,
    ) {
        let mut f = Fixture::new();
        let account = acct(2, 0);
        f.deposit(account, f.held, Decimal::from(collateral));
        let state_before = f.ledger.state().clone();
        let events_before = f.ledger.events().len();

        // ten times everything the account would hold can never be covered
        let borrow = (collateral + deposit) * 10;
        let op = Operation::builder()
            .deposit(account, f.owed, AssetAmount::delta_wei(Decimal::from(deposit)), account.owner)
            .withdraw(account, f.third, AssetAmount::delta_wei(Decimal::from(-borrow)), account.owner)
            .build();
        let err = f.ledger.operate(account.owner, &op).unwrap_err();

        prop_assert_eq!(err, EngineError::Undercollateralized(account));
        prop_assert_eq!(f.ledger.state(), &state_before);
        prop_assert_eq!(f.ledger.events().len(), events_before);
    }
}
