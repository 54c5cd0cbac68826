// 11.0: every committed operation and admin change produces events. an operation's
// events are buffered while it runs and only appended once it commits, so the stream
// never contains half an operation. the EventPayload enum lists all event types.

use crate::interest::Index;
use crate::risk::AccountRiskOverride;
use crate::types::{AccountInfo, Address, MarketId, Par, Price, Timestamp, Wei};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    // Operation framing
    Operation(OperationEvent),
    IndexUpdate(IndexUpdateEvent),
    OraclePrice(OraclePriceEvent),
    InterestRate(InterestRateEvent),

    // Actions
    Deposit(DepositEvent),
    Withdraw(WithdrawEvent),
    Transfer(TransferEvent),
    Trade(TradeEvent),
    Liquidate(LiquidateEvent),
    Vaporize(VaporizeEvent),
    Call(CallEvent),
    SetExpiry(SetExpiryEvent),

    // Liquidation callbacks
    LiquidationCallbackSuccess(LiquidationCallbackSuccessEvent),
    LiquidationCallbackFailure(LiquidationCallbackFailureEvent),

    // Permissions and governance
    OperatorSet(OperatorSetEvent),
    Admin(AdminEvent),
}

impl EventPayload {
    pub fn name(&self) -> &'static str {
        match self {
            EventPayload::Operation(_) => "Operation",
            EventPayload::IndexUpdate(_) => "IndexUpdate",
            EventPayload::OraclePrice(_) => "OraclePrice",
            EventPayload::InterestRate(_) => "InterestRate",
            EventPayload::Deposit(_) => "Deposit",
            EventPayload::Withdraw(_) => "Withdraw",
            EventPayload::Transfer(_) => "Transfer",
            EventPayload::Trade(_) => "Trade",
            EventPayload::Liquidate(_) => "Liquidate",
            EventPayload::Vaporize(_) => "Vaporize",
            EventPayload::Call(_) => "Call",
            EventPayload::SetExpiry(_) => "SetExpiry",
            EventPayload::LiquidationCallbackSuccess(_) => "LiquidationCallbackSuccess",
            EventPayload::LiquidationCallbackFailure(_) => "LiquidationCallbackFailure",
            EventPayload::OperatorSet(_) => "OperatorSet",
            EventPayload::Admin(_) => "Admin",
        }
    }
}

/// One leg of a balance change: how many tokens moved and where par ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub delta_wei: Wei,
    pub new_par: Par,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEvent {
    pub sender: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexUpdateEvent {
    pub market_id: MarketId,
    pub index: Index,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OraclePriceEvent {
    pub market_id: MarketId,
    pub price: Price,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestRateEvent {
    pub market_id: MarketId,
    pub rate_per_second: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositEvent {
    pub account: AccountInfo,
    pub market_id: MarketId,
    pub update: BalanceUpdate,
    pub from: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawEvent {
    pub account: AccountInfo,
    pub market_id: MarketId,
    pub update: BalanceUpdate,
    pub to: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub account_one: AccountInfo,
    pub account_two: AccountInfo,
    pub market_id: MarketId,
    pub update_one: BalanceUpdate,
    pub update_two: BalanceUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub taker: AccountInfo,
    pub maker: AccountInfo,
    pub input_market: MarketId,
    pub output_market: MarketId,
    pub taker_input_update: BalanceUpdate,
    pub taker_output_update: BalanceUpdate,
    pub maker_input_update: BalanceUpdate,
    pub maker_output_update: BalanceUpdate,
    pub auto_trader: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidateEvent {
    pub solid_account: AccountInfo,
    pub liquid_account: AccountInfo,
    pub held_market: MarketId,
    pub owed_market: MarketId,
    pub solid_held_update: BalanceUpdate,
    pub solid_owed_update: BalanceUpdate,
    pub liquid_held_update: BalanceUpdate,
    pub liquid_owed_update: BalanceUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaporizeEvent {
    pub solid_account: AccountInfo,
    pub vapor_account: AccountInfo,
    pub held_market: MarketId,
    pub owed_market: MarketId,
    pub solid_held_update: BalanceUpdate,
    pub solid_owed_update: BalanceUpdate,
    pub vapor_owed_update: BalanceUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEvent {
    pub account: AccountInfo,
    pub callee: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetExpiryEvent {
    pub account: AccountInfo,
    pub market_id: MarketId,
    // None when cleared
    pub expiry: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationCallbackSuccessEvent {
    pub liquid_account: AccountInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationCallbackFailureEvent {
    pub liquid_account: AccountInfo,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorSetEvent {
    pub owner: Address,
    pub operator: Address,
    pub trusted: bool,
}

/// One entry per admin setter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdminEvent {
    AddMarket { market_id: MarketId, token: Address },
    SetIsClosing { market_id: MarketId, is_closing: bool },
    SetPriceOracle { market_id: MarketId },
    SetInterestRateModel { market_id: MarketId },
    SetMarginPremium { market_id: MarketId, margin_premium: Decimal },
    SetLiquidationSpreadPremium { market_id: MarketId, spread_premium: Decimal },
    SetMaxSupplyWei { market_id: MarketId, max_supply_wei: Wei },
    SetMaxBorrowWei { market_id: MarketId, max_borrow_wei: Wei },
    SetEarningsRateOverride { market_id: MarketId, earnings_rate_override: Decimal },
    SetMarginRatio { margin_ratio: Decimal },
    SetLiquidationSpread { liquidation_spread: Decimal },
    SetEarningsRate { earnings_rate: Decimal },
    SetMinBorrowedValue { min_borrowed_value: Decimal },
    SetAccountMaxNumberOfMarketsWithBalances { max: usize },
    SetOracleSentinel,
    SetCallbackGasLimit { gas_limit: u64 },
    SetDefaultAccountRiskOverride { risk_override: AccountRiskOverride },
    SetAccountRiskOverride { owner: Address, risk_override: AccountRiskOverride },
    SetGlobalOperator { operator: Address, approved: bool },
    WithdrawExcessTokens { market_id: MarketId, amount: Wei, to: Address },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn events_serialize_for_audit() {
        let event = Event::new(
            EventId(1),
            Timestamp::from_secs(10),
            EventPayload::Deposit(DepositEvent {
                account: AccountInfo::new(Address(1), 0),
                market_id: MarketId(0),
                update: BalanceUpdate {
                    delta_wei: Wei::new(dec!(100)),
                    new_par: Par::new(dec!(100)),
                },
                from: Address(1),
            }),
        );

        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.payload, event.payload);
        assert_eq!(back.payload.name(), "Deposit");
    }

    #[test]
    fn admin_events_carry_values() {
        let payload = EventPayload::Admin(AdminEvent::SetMarginRatio { margin_ratio: dec!(0.2) });
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("SetMarginRatio"));
    }
}
