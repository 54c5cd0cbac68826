// 8.0 engine/core.rs: the ledger. holds markets, balances, registries and the event log.

use super::config::EngineConfig;
use super::results::EngineError;
use super::state::LedgerState;
use crate::account::AccountStatus;
use crate::callbacks::{AutoTrader, Callee, LiquidationCallback};
use crate::config::LedgerConfig;
use crate::events::{Event, EventId, EventPayload, OperatorSetEvent};
use crate::market::{Market, MarketHooks};
use crate::oracle::{OpenSentinel, OracleSentinel};
use crate::risk::{AccountRiskOverride, RiskLimits, RiskParams};
use crate::types::{AccountInfo, Address, MarketId, Par, Timestamp, Wei};
use log::info;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/** 8.1: main ledger struct. everything an operation may roll back lives in `state` */
pub struct Ledger {
    pub(super) config: EngineConfig,
    pub(super) admin: Address,
    pub(super) risk_params: RiskParams,
    pub(super) risk_limits: RiskLimits,
    pub(super) account_overrides: HashMap<Address, AccountRiskOverride>,
    pub(super) state: LedgerState,
    pub(super) hooks: BTreeMap<MarketId, MarketHooks>,
    pub(super) tokens: HashMap<Address, MarketId>,
    pub(super) sentinel: Rc<dyn OracleSentinel>,
    pub(super) global_operators: HashSet<Address>,
    // (owner, operator)
    pub(super) local_operators: HashSet<(Address, Address)>,
    pub(super) auto_traders: HashMap<Address, Rc<dyn AutoTrader>>,
    pub(super) liquidation_callbacks: HashMap<Address, Rc<dyn LiquidationCallback>>,
    pub(super) callees: HashMap<Address, Rc<dyn Callee>>,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("admin", &self.admin)
            .field("risk_params", &self.risk_params)
            .field("markets", &self.state.markets.len())
            .field("events", &self.events.len())
            .field("current_time", &self.current_time)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Development defaults with `admin` as the governance address.
    pub fn new(admin: Address) -> Self {
        let config = LedgerConfig {
            admin,
            ..LedgerConfig::development()
        };
        Self::build(config)
    }

    pub fn from_config(config: LedgerConfig) -> Result<Self, EngineError> {
        config.validate()?;
        info!("ledger configured for {:?}, admin {}", config.environment, config.admin);
        Ok(Self::build(config))
    }

    fn build(config: LedgerConfig) -> Self {
        let genesis = Timestamp::from_secs(config.engine.genesis_secs);
        Self {
            config: config.engine,
            admin: config.admin,
            risk_params: config.risk_params,
            risk_limits: config.risk_limits,
            account_overrides: HashMap::new(),
            state: LedgerState::default(),
            hooks: BTreeMap::new(),
            tokens: HashMap::new(),
            sentinel: Rc::new(OpenSentinel),
            global_operators: HashSet::new(),
            local_operators: HashSet::new(),
            auto_traders: HashMap::new(),
            liquidation_callbacks: HashMap::new(),
            callees: HashMap::new(),
            events: Vec::new(),
            next_event_id: 1,
            current_time: genesis,
        }
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    pub fn advance_secs(&mut self, secs: u64) {
        self.current_time = self.current_time.plus_secs(secs);
    }

    // ---- permissions and registries ----

    pub fn set_operator(&mut self, owner: Address, operator: Address, trusted: bool) {
        if trusted {
            self.local_operators.insert((owner, operator));
        } else {
            self.local_operators.remove(&(owner, operator));
        }
        info!("operator {} {} for {}", operator, if trusted { "approved" } else { "revoked" }, owner);
        self.emit_event(EventPayload::OperatorSet(OperatorSetEvent { owner, operator, trusted }));
    }

    /// Owners always operate their own accounts.
    pub fn is_operator(&self, owner: Address, operator: Address) -> bool {
        owner == operator
            || self.global_operators.contains(&operator)
            || self.local_operators.contains(&(owner, operator))
    }

    pub fn is_global_operator(&self, operator: Address) -> bool {
        self.global_operators.contains(&operator)
    }

    pub fn register_auto_trader(&mut self, address: Address, trader: Rc<dyn AutoTrader>) {
        self.auto_traders.insert(address, trader);
    }

    pub fn register_callee(&mut self, address: Address, callee: Rc<dyn Callee>) {
        self.callees.insert(address, callee);
    }

    /// Callback invoked when an account owned by `owner` is liquidated.
    pub fn register_liquidation_callback(&mut self, owner: Address, callback: Rc<dyn LiquidationCallback>) {
        self.liquidation_callbacks.insert(owner, callback);
    }

    // ---- getters ----

    pub fn admin_address(&self) -> Address {
        self.admin
    }

    pub fn risk_params(&self) -> &RiskParams {
        &self.risk_params
    }

    pub fn risk_limits(&self) -> &RiskLimits {
        &self.risk_limits
    }

    /// The account's own override, else the default override (which may be unset).
    pub fn account_risk_override(&self, owner: Address) -> AccountRiskOverride {
        self.account_overrides
            .get(&owner)
            .copied()
            .unwrap_or(self.risk_params.default_account_risk_override)
    }

    pub fn market(&self, market_id: MarketId) -> Option<&Market> {
        self.state.markets.get(&market_id)
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.state.markets.values()
    }

    pub fn market_count(&self) -> usize {
        self.state.markets.len()
    }

    pub fn market_id_for_token(&self, token: Address) -> Option<MarketId> {
        self.tokens.get(&token).copied()
    }

    pub fn par(&self, account: &AccountInfo, market_id: MarketId) -> Par {
        self.state.par(account, market_id)
    }

    /// Wei at the market's last stored index.
    pub fn wei(&self, account: &AccountInfo, market_id: MarketId) -> Result<Wei, EngineError> {
        self.state.wei(account, market_id)
    }

    pub fn status(&self, account: &AccountInfo) -> AccountStatus {
        self.state.balances.status(account)
    }

    pub fn expiry(&self, account: &AccountInfo, market_id: MarketId) -> Option<Timestamp> {
        self.state.expiry(account, market_id)
    }

    /// Markets where the account holds a non-zero balance, ascending.
    pub fn account_markets(&self, account: &AccountInfo) -> Vec<MarketId> {
        self.state
            .balances
            .account(account)
            .map(|a| a.markets_with_balances().collect())
            .unwrap_or_default()
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;
        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
