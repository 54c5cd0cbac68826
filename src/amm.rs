// 9.3 amm.rs: constant-product pools with a 0.3% fee.
// a pool is an ordinary ledger account whose balances are the reserves, and an
// auto-trader that prices trades against those balances. swaps therefore settle
// as Trade actions inside an operation and roll back with it.

use crate::callbacks::{AutoTrader, TradeQuote, TradeRequest};
use crate::types::{AccountInfo, Address, AssetAmount, MarketId, Wei};
use primitive_types::U256;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

const FEE_NUMERATOR: u64 = 997;
const FEE_DENOMINATOR: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmmError {
    #[error("insufficient input amount")]
    InsufficientInputAmount,

    #[error("insufficient output amount")]
    InsufficientOutputAmount,

    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("amount out of range")]
    Overflow,
}

// products of two reserves outgrow Decimal's 96-bit mantissa, so the formulas
// run on 256-bit integers. inputs are whole base units.
fn widen(value: Wei) -> Result<U256, AmmError> {
    value.value().trunc().to_u128().map(U256::from).ok_or(AmmError::Overflow)
}

fn narrow(value: U256) -> Result<Wei, AmmError> {
    if value.bits() > 128 {
        return Err(AmmError::Overflow);
    }
    Decimal::from_u128(value.low_u128())
        .map(Wei::new)
        .ok_or(AmmError::Overflow)
}

/// Output received for selling `amount_in`. rounds down.
pub fn get_amount_out(amount_in: Wei, reserve_in: Wei, reserve_out: Wei) -> Result<Wei, AmmError> {
    if !amount_in.is_positive() {
        return Err(AmmError::InsufficientInputAmount);
    }
    if !reserve_in.is_positive() || !reserve_out.is_positive() {
        return Err(AmmError::InsufficientLiquidity);
    }
    let amount_in_with_fee = widen(amount_in)? * U256::from(FEE_NUMERATOR);
    let numerator = amount_in_with_fee * widen(reserve_out)?;
    let denominator = widen(reserve_in)? * U256::from(FEE_DENOMINATOR) + amount_in_with_fee;
    narrow(numerator / denominator)
}

/// Input needed to buy exactly `amount_out`. rounds up by one unit.
pub fn get_amount_in(amount_out: Wei, reserve_in: Wei, reserve_out: Wei) -> Result<Wei, AmmError> {
    if !amount_out.is_positive() {
        return Err(AmmError::InsufficientOutputAmount);
    }
    if !reserve_in.is_positive() || reserve_out.value() <= amount_out.value() {
        return Err(AmmError::InsufficientLiquidity);
    }
    let numerator = widen(reserve_in)? * widen(amount_out)? * U256::from(FEE_DENOMINATOR);
    let denominator = (widen(reserve_out)? - widen(amount_out)?) * U256::from(FEE_NUMERATOR);
    narrow(numerator / denominator + U256::one())
}

/// Reserves of one hop, oriented in the direction of the swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopReserves {
    pub reserve_in: Wei,
    pub reserve_out: Wei,
}

/// Inputs along a path needed to end with exactly `amount_out`. The first
/// element is what enters the first hop, the last is `amount_out`.
pub fn get_amounts_in(amount_out: Wei, hops: &[HopReserves]) -> Result<Vec<Wei>, AmmError> {
    if hops.is_empty() {
        return Err(AmmError::InvalidPath("path needs at least one hop".to_string()));
    }
    let mut amounts = vec![Wei::zero(); hops.len() + 1];
    amounts[hops.len()] = amount_out;
    for i in (0..hops.len()).rev() {
        amounts[i] = get_amount_in(amounts[i + 1], hops[i].reserve_in, hops[i].reserve_out)?;
    }
    Ok(amounts)
}

/// Outputs along a path for selling `amount_in` into the first hop.
pub fn get_amounts_out(amount_in: Wei, hops: &[HopReserves]) -> Result<Vec<Wei>, AmmError> {
    if hops.is_empty() {
        return Err(AmmError::InvalidPath("path needs at least one hop".to_string()));
    }
    let mut amounts = Vec::with_capacity(hops.len() + 1);
    amounts.push(amount_in);
    for (i, hop) in hops.iter().enumerate() {
        amounts.push(get_amount_out(amounts[i], hop.reserve_in, hop.reserve_out)?);
    }
    Ok(amounts)
}

/** 9.3.1: one pair. the pool's ledger account is (address, 0) */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantProductPool {
    pub address: Address,
    pub market_a: MarketId,
    pub market_b: MarketId,
}

impl ConstantProductPool {
    pub fn new(address: Address, market_a: MarketId, market_b: MarketId) -> Self {
        Self { address, market_a, market_b }
    }

    pub fn account(&self) -> AccountInfo {
        AccountInfo::new(self.address, 0)
    }

    pub fn trades_pair(&self, x: MarketId, y: MarketId) -> bool {
        (self.market_a == x && self.market_b == y) || (self.market_a == y && self.market_b == x)
    }
}

impl AutoTrader for ConstantProductPool {
    fn get_trade_cost(&self, request: &TradeRequest<'_>) -> Result<TradeQuote, String> {
        if request.maker != self.account() {
            return Err("pool only trades from its own account".to_string());
        }
        if !self.trades_pair(request.input_market, request.output_market) {
            return Err(format!(
                "pool does not trade {} -> {}",
                request.input_market, request.output_market
            ));
        }

        let amount_out = if request.input_wei.is_zero() {
            Wei::zero()
        } else {
            get_amount_out(
                request.input_wei,
                request.maker_input_balance,
                request.maker_output_balance,
            )
            .map_err(|e| e.to_string())?
        };

        // the pool pays out of its own output balance
        let maker_output = amount_out.negate();
        let output = if request.calculate_amount_with_maker_account {
            AssetAmount::delta_wei(maker_output.value())
        } else {
            AssetAmount::delta_wei(amount_out.value())
        };
        Ok(TradeQuote::for_request(request, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Par;
    use rust_decimal_macros::dec;

    fn wei(v: Decimal) -> Wei {
        Wei::new(v)
    }

    #[test]
    fn amount_in_matches_uniswap_formula() {
        // 1000 * 100 * 1000 / (900 * 997) = 111.44 -> 111 + 1
        let amount = get_amount_in(wei(dec!(100)), wei(dec!(1000)), wei(dec!(1000))).unwrap();
        assert_eq!(amount.value(), dec!(112));
        // buying the whole reserve is impossible
        assert_eq!(
            get_amount_in(wei(dec!(1000)), wei(dec!(1000)), wei(dec!(1000))),
            Err(AmmError::InsufficientLiquidity)
        );
    }

    #[test]
    fn amount_in_always_buys_at_least_the_target() {
        let reserves = (wei(dec!(50_000)), wei(dec!(20_000)));
        for target in [1, 7, 333, 5_000, 19_000] {
            let out = wei(Decimal::from(target));
            let needed = get_amount_in(out, reserves.0, reserves.1).unwrap();
            let got = get_amount_out(needed, reserves.0, reserves.1).unwrap();
            assert!(got >= out, "target {} got {}", target, got);
        }
    }

    #[test]
    fn eighteen_decimal_reserves_do_not_overflow() {
        // 10k tokens a side, buying 1k, all in 1e-18 units
        let reserve = wei(dec!(10_000_000_000_000_000_000_000));
        let out = wei(dec!(1_000_000_000_000_000_000_000));
        let needed = get_amount_in(out, reserve, reserve).unwrap();
        // 1e22 * 1e21 * 1000 / (9e21 * 997), truncated, plus one
        assert_eq!(needed.value(), dec!(1_114_454_474_534_715_256_882));
        assert_eq!(get_amount_out(needed, reserve, reserve).unwrap(), out);

        // an answer past Decimal's range is an error, not a panic
        let thin = wei(out.value() + Decimal::ONE);
        assert_eq!(get_amount_in(out, wei(Decimal::MAX), thin), Err(AmmError::Overflow));
    }

    #[test]
    fn amounts_in_walk_the_path_backwards() {
        let hops = [
            HopReserves { reserve_in: wei(dec!(1000)), reserve_out: wei(dec!(2000)) },
            HopReserves { reserve_in: wei(dec!(2000)), reserve_out: wei(dec!(1000)) },
        ];
        let amounts = get_amounts_in(wei(dec!(100)), &hops).unwrap();
        assert_eq!(amounts.len(), 3);
        assert_eq!(amounts[2].value(), dec!(100));
        assert_eq!(amounts[1], get_amount_in(wei(dec!(100)), wei(dec!(2000)), wei(dec!(1000))).unwrap());
        assert_eq!(amounts[0], get_amount_in(amounts[1], wei(dec!(1000)), wei(dec!(2000))).unwrap());

        let outs = get_amounts_out(amounts[0], &hops).unwrap();
        assert!(outs[2].value() >= dec!(100));
    }

    #[test]
    fn pool_quotes_from_maker_balances() {
        let pool = ConstantProductPool::new(Address(50), MarketId(0), MarketId(1));
        let request = TradeRequest {
            input_market: MarketId(1),
            output_market: MarketId(0),
            maker: pool.account(),
            taker: AccountInfo::new(Address(1), 0),
            old_input_par: Par::new(dec!(1000)),
            new_input_par: Par::new(dec!(1112)),
            input_wei: wei(dec!(112)),
            maker_input_balance: wei(dec!(1000)),
            maker_output_balance: wei(dec!(1000)),
            calculate_amount_with_maker_account: true,
            data: &[],
        };
        let quote = pool.get_trade_cost(&request).unwrap();
        assert_eq!(quote.output, AssetAmount::delta_wei(dec!(-100)));
        assert_eq!(quote.input_wei, request.input_wei);

        let foreign = TradeRequest { output_market: MarketId(7), ..request };
        assert!(pool.get_trade_cost(&foreign).is_err());
    }
}
