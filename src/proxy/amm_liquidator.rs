//! Liquidation routed through constant-product pools.
//!
//! The solid account seizes collateral in the held market and sells it along a
//! token path into the owed market inside the same operation, so a liquidator
//! never needs to hold the owed token up front. The whole sequence is one
//! Liquidate (or Vaporize) action followed by one Trade per hop, and it rolls
//! back as a unit if any hop comes up short.

use super::ProxyError;
use crate::amm::{get_amounts_in, get_amounts_out, ConstantProductPool, HopReserves};
use crate::engine::{EngineError, Ledger, Operation, OperationResult, TradeParams};
use crate::interest::{par_to_wei, wei_to_par};
use crate::liquidation::{LiquidationError, LiquidationPrices};
use crate::margin::is_vaporizable;
use crate::market::Market;
use crate::types::{AccountInfo, Address, AssetAmount, MarketId, Timestamp, Wei};
use log::{debug, info};
use rust_decimal::Decimal;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationRequest {
    pub solid_account: AccountInfo,
    pub liquid_account: AccountInfo,
    pub owed_market: MarketId,
    pub held_market: MarketId,
    /// Token addresses from the held token to the owed token.
    pub token_path: Vec<Address>,
    /// Set when enforcing an expired borrow rather than undercollateralization.
    pub expiry: Option<Timestamp>,
    /// Only consulted when the collateral cannot buy back the whole debt.
    pub min_owed_output: Wei,
    pub revert_on_fail_to_sell: bool,
}

impl LiquidationRequest {
    pub fn new(
        solid_account: AccountInfo,
        liquid_account: AccountInfo,
        owed_market: MarketId,
        held_market: MarketId,
        token_path: Vec<Address>,
    ) -> Self {
        Self {
            solid_account,
            liquid_account,
            owed_market,
            held_market,
            token_path,
            expiry: None,
            min_owed_output: Wei::new(Decimal::ONE),
            revert_on_fail_to_sell: false,
        }
    }

    pub fn with_expiry(mut self, expiry: Timestamp) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_min_owed_output(mut self, min_owed_output: Wei) -> Self {
        self.min_owed_output = min_owed_output;
        self
    }

    pub fn reverting_on_fail_to_sell(mut self) -> Self {
        self.revert_on_fail_to_sell = true;
        self
    }
}

/** 14.1: what a liquidation will do, previewed on accrued state before submitting */
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationPlan {
    pub vaporize: bool,
    /// Debt the solid account takes over in the owed market.
    pub owed_wei: Wei,
    /// Collateral the solid account receives in the held market.
    pub held_reward: Wei,
    /// Solid held balance plus the reward.
    pub solid_held_total: Wei,
    /// Amount entering each hop, then what leaves the last one. empty when
    /// there is nothing to repay.
    pub amounts: Vec<Wei>,
    /// True when the trades buy exactly `owed_wei`.
    pub exact_output: bool,
}

#[derive(Debug, Clone)]
struct Hop {
    pool: ConstantProductPool,
    input: MarketId,
    output: MarketId,
    reserves: HopReserves,
}

#[derive(Debug, Clone)]
pub struct AmmLiquidator {
    address: Address,
    pools: Vec<ConstantProductPool>,
}

impl AmmLiquidator {
    /// The address must be a global operator for liquidations to go through.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            pools: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Route through `pool` and register it as the ledger's auto-trader at its
    /// own address.
    pub fn add_pool(&mut self, ledger: &mut Ledger, pool: ConstantProductPool) {
        ledger.register_auto_trader(pool.address, Rc::new(pool.clone()));
        self.pools.push(pool);
    }

    pub fn pool_for(&self, x: MarketId, y: MarketId) -> Option<&ConstantProductPool> {
        self.pools.iter().find(|pool| pool.trades_pair(x, y))
    }

    /// Liquidate on behalf of `caller`, who must operate the solid account.
    pub fn liquidate(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        request: &LiquidationRequest,
    ) -> Result<OperationResult, ProxyError> {
        let (plan, operation) = self.prepare(ledger, caller, request)?;
        let result = ledger.operate(self.address, &operation)?;
        info!(
            "{} {} via {} hops: owed {} for held {}",
            if plan.vaporize { "vaporized" } else { "liquidated" },
            request.liquid_account,
            request.token_path.len() - 1,
            plan.owed_wei,
            plan.held_reward
        );
        Ok(result)
    }

    /// Run every check and preview the amounts without touching the ledger.
    pub fn plan(&self, ledger: &Ledger, caller: Address, request: &LiquidationRequest) -> Result<LiquidationPlan, ProxyError> {
        self.prepare(ledger, caller, request).map(|(plan, _)| plan)
    }

    fn prepare(
        &self,
        ledger: &Ledger,
        caller: Address,
        request: &LiquidationRequest,
    ) -> Result<(LiquidationPlan, Operation), ProxyError> {
        let (solid, liquid) = (request.solid_account, request.liquid_account);
        let (owed_id, held_id) = (request.owed_market, request.held_market);

        if !ledger.is_operator(solid.owner, caller) {
            return Err(ProxyError::SenderNotOperator);
        }
        if owed_id == held_id {
            return Err(ProxyError::SameMarket(owed_id, held_id));
        }
        let hops = self.hops(ledger, request)?;

        let owed_market = ledger.accrued_market(owed_id)?;
        let held_market = ledger.accrued_market(held_id)?;
        let vaporize = ledger
            .state()
            .balances
            .account(&liquid)
            .map_or(false, is_vaporizable);

        let liquid_held = wei_of(ledger, &liquid, &held_market);
        if !vaporize && !liquid_held.is_positive() {
            return Err(ProxyError::HeldMarketNegative(held_id));
        }
        if let Some(expiry) = request.expiry {
            if ledger.expiry(&liquid, owed_id) != Some(expiry) {
                return Err(ProxyError::ExpiryMismatch);
            }
            if expiry > ledger.time() {
                return Err(ProxyError::NotYetExpired(expiry));
            }
        }

        let prices = LiquidationPrices::new(
            ledger.price(held_id)?,
            ledger.price(owed_id)?,
            ledger.liquidation_spread(liquid.owner, held_id, owed_id)?,
        );
        let liquid_owed = wei_of(ledger, &liquid, &owed_market);
        let (owed_wei, held_reward) = if vaporize {
            let max_held = held_market.excess_tokens();
            if max_held.is_negative() {
                return Err(EngineError::from(LiquidationError::ExcessNegative).into());
            }
            preview_vaporize(liquid_owed, &owed_market, max_held, &prices)
        } else {
            preview_liquidate(liquid_owed, liquid_held, &prices)
        };

        let solid_held_total = wei_of(ledger, &solid, &held_market).add(held_reward);
        let reserves: Vec<HopReserves> = hops.iter().map(|hop| hop.reserves).collect();
        let (amounts, exact_output) = if owed_wei.is_positive() {
            let needed = get_amounts_in(owed_wei, &reserves)?;
            if solid_held_total >= needed[0] {
                (needed, true)
            } else if request.revert_on_fail_to_sell {
                return Err(ProxyError::SolidHeldTooSmall(solid_held_total, needed[0]));
            } else {
                let out = get_amounts_out(solid_held_total, &reserves)?;
                let output = out[out.len() - 1];
                if output < request.min_owed_output {
                    return Err(ProxyError::OwedOutputTooSmall(output, request.min_owed_output));
                }
                (out, false)
            }
        } else {
            (Vec::new(), true)
        };
        debug!(
            "liquidation plan for {}: owed {}, reward {}, amounts {:?}",
            liquid, owed_wei, held_reward, amounts
        );

        let mut builder = Operation::builder();
        builder = if vaporize {
            builder.vaporize(solid, liquid, owed_id, held_id, AssetAmount::zero_target())
        } else {
            builder.liquidate(solid, liquid, owed_id, held_id, AssetAmount::zero_target())
        };
        for (hop, amount) in hops.iter().zip(&amounts) {
            builder = builder.trade(TradeParams::new(
                solid,
                hop.pool.account(),
                hop.input,
                hop.output,
                hop.pool.address,
                AssetAmount::delta_wei(amount.value()),
            ));
        }

        let plan = LiquidationPlan {
            vaporize,
            owed_wei,
            held_reward,
            solid_held_total,
            amounts,
            exact_output,
        };
        Ok((plan, builder.build()))
    }

    fn hops(&self, ledger: &Ledger, request: &LiquidationRequest) -> Result<Vec<Hop>, ProxyError> {
        let path = &request.token_path;
        if path.len() < 2 {
            return Err(ProxyError::PathTooShort);
        }
        let token_of = |id: MarketId| {
            ledger
                .market(id)
                .map(|market| market.token)
                .ok_or(EngineError::MarketNotFound(id))
        };
        if path[0] != token_of(request.held_market)? {
            return Err(ProxyError::FirstPathToken(path[0]));
        }
        let last = path[path.len() - 1];
        if last != token_of(request.owed_market)? {
            return Err(ProxyError::LastPathToken(last));
        }

        let market_of = |token: Address| ledger.market_id_for_token(token).ok_or(ProxyError::UnknownToken(token));
        path.windows(2)
            .map(|pair| {
                let (input, output) = (market_of(pair[0])?, market_of(pair[1])?);
                let pool = self
                    .pool_for(input, output)
                    .cloned()
                    .ok_or(ProxyError::NoPool(input, output))?;
                let reserves = HopReserves {
                    reserve_in: wei_of(ledger, &pool.account(), &ledger.accrued_market(input)?),
                    reserve_out: wei_of(ledger, &pool.account(), &ledger.accrued_market(output)?),
                };
                Ok(Hop {
                    pool,
                    input,
                    output,
                    reserves,
                })
            })
            .collect()
    }
}

fn wei_of(ledger: &Ledger, account: &AccountInfo, market: &Market) -> Wei {
    par_to_wei(ledger.par(account, market.id), &market.index)
}

/// (owed repaid, held seized) for taking over all of `liquid_owed`.
fn preview_liquidate(liquid_owed: Wei, liquid_held: Wei, prices: &LiquidationPrices) -> (Wei, Wei) {
    if !liquid_owed.is_negative() {
        return (Wei::zero(), Wei::zero());
    }
    let owed = liquid_owed.abs();
    let held = prices.owed_wei_to_held_wei(owed);
    if held > liquid_held {
        (prices.held_wei_to_owed_wei(liquid_held), liquid_held)
    } else {
        (owed, held)
    }
}

/// (owed absorbed by the solid account, held paid from reserves) once the
/// owed market's own reserves have paid what they can.
fn preview_vaporize(vapor_owed: Wei, owed_market: &Market, max_held: Wei, prices: &LiquidationPrices) -> (Wei, Wei) {
    if !vapor_owed.is_negative() {
        return (Wei::zero(), Wei::zero());
    }
    let excess = owed_market.excess_tokens();
    let remaining = if excess.is_positive() {
        if excess >= vapor_owed.abs() {
            return (Wei::zero(), Wei::zero());
        }
        // round through par the way the ledger stores the partial repayment
        let par = wei_to_par(vapor_owed.add(excess), &owed_market.index);
        par_to_wei(par, &owed_market.index).abs()
    } else {
        vapor_owed.abs()
    };

    let held = prices.owed_wei_to_held_wei(remaining);
    if held > max_held {
        (prices.held_wei_to_owed_wei(max_held), max_held)
    } else {
        (remaining, held)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Price;
    use rust_decimal_macros::dec;

    fn prices() -> LiquidationPrices {
        // owed worth 100, held worth 1, 5% spread
        LiquidationPrices::new(Price::new_unchecked(dec!(1)), Price::new_unchecked(dec!(100)), dec!(0.05))
    }

    #[test]
    fn liquidate_preview_takes_whole_debt_when_collateral_suffices() {
        let (owed, held) = preview_liquidate(Wei::new(dec!(-10)), Wei::new(dec!(5000)), &prices());
        assert_eq!(owed, Wei::new(dec!(10)));
        assert_eq!(held, Wei::new(dec!(1050)));
    }

    #[test]
    fn liquidate_preview_capped_by_collateral() {
        let (owed, held) = preview_liquidate(Wei::new(dec!(-10)), Wei::new(dec!(500)), &prices());
        assert_eq!(held, Wei::new(dec!(500)));
        // 500 / 105 = 4.76 rounds up
        assert_eq!(owed, Wei::new(dec!(5)));
    }

    #[test]
    fn nothing_owed_means_nothing_to_do() {
        let (owed, held) = preview_liquidate(Wei::new(dec!(3)), Wei::new(dec!(500)), &prices());
        assert!(owed.is_zero() && held.is_zero());
    }

    #[test]
    fn vaporize_preview_without_reserves() {
        let market = Market::new(
            MarketId(0),
            &crate::market::MarketParams::new(Address(9)),
            Timestamp::from_secs(0),
        );
        let (owed, held) = preview_vaporize(Wei::new(dec!(-10)), &market, Wei::new(dec!(2000)), &prices());
        assert_eq!(owed, Wei::new(dec!(10)));
        assert_eq!(held, Wei::new(dec!(1050)));

        let (owed, held) = preview_vaporize(Wei::new(dec!(-10)), &market, Wei::new(dec!(210)), &prices());
        assert_eq!(held, Wei::new(dec!(210)));
        assert_eq!(owed, Wei::new(dec!(2)));
    }

    #[test]
    fn vaporize_preview_reserves_cover_debt() {
        let mut market = Market::new(
            MarketId(0),
            &crate::market::MarketParams::new(Address(9)),
            Timestamp::from_secs(0),
        );
        market.token_balance = Wei::new(dec!(50));
        let (owed, held) = preview_vaporize(Wei::new(dec!(-10)), &market, Wei::new(dec!(2000)), &prices());
        assert!(owed.is_zero() && held.is_zero());
    }
}
