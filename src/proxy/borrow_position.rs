//! Isolated borrow positions.
//!
//! A caller keeps collateral in one account number and opens debt in another,
//! so a liquidation of the borrow account never reaches the rest of their
//! funds. Every call is a single operation of Transfers between two accounts
//! of the same owner.

use super::ProxyError;
use crate::engine::{Ledger, Operation, OperationBuilder, OperationResult};
use crate::types::{AccountInfo, Address, AssetAmount, MarketId, Wei};
use log::info;

/// Which side of a transfer must end the operation without debt in the
/// transferred market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BalanceCheckFlag {
    Both,
    From,
    To,
    #[default]
    None,
}

impl BalanceCheckFlag {
    fn apply(self, builder: OperationBuilder, from: AccountInfo, to: AccountInfo, market: MarketId) -> OperationBuilder {
        match self {
            BalanceCheckFlag::Both => builder
                .require_non_negative(from, market)
                .require_non_negative(to, market),
            BalanceCheckFlag::From => builder.require_non_negative(from, market),
            BalanceCheckFlag::To => builder.require_non_negative(to, market),
            BalanceCheckFlag::None => builder,
        }
    }
}

/** 14.2: submits as `address`, which the owner (or the admin) must make an operator */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowPositionProxy {
    address: Address,
}

impl BorrowPositionProxy {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Move `amount` of collateral from `from_number` into a borrow account.
    #[allow(clippy::too_many_arguments)]
    pub fn open_borrow_position(
        &self,
        ledger: &mut Ledger,
        owner: Address,
        from_number: u64,
        borrow_number: u64,
        market: MarketId,
        amount: Wei,
        flag: BalanceCheckFlag,
    ) -> Result<OperationResult, ProxyError> {
        let result = self.transfer(ledger, owner, from_number, borrow_number, market, amount, flag)?;
        info!("opened borrow position {}/{} in {}", owner, borrow_number, market);
        Ok(result)
    }

    /// Sweep every listed market out of the borrow account into `to_number`.
    pub fn close_borrow_position(
        &self,
        ledger: &mut Ledger,
        owner: Address,
        borrow_number: u64,
        to_number: u64,
        markets: &[MarketId],
    ) -> Result<OperationResult, ProxyError> {
        let (borrow, to) = (AccountInfo::new(owner, borrow_number), AccountInfo::new(owner, to_number));
        let operation = markets
            .iter()
            .fold(Operation::builder(), |builder, &market| {
                builder.transfer(borrow, to, market, AssetAmount::zero_target())
            })
            .build();
        let result = ledger.operate(self.address, &operation)?;
        info!("closed borrow position {} into {}", borrow, to);
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn transfer_between_accounts(
        &self,
        ledger: &mut Ledger,
        owner: Address,
        from_number: u64,
        to_number: u64,
        market: MarketId,
        amount: Wei,
        flag: BalanceCheckFlag,
    ) -> Result<OperationResult, ProxyError> {
        self.transfer(ledger, owner, from_number, to_number, market, amount, flag)
    }

    /// Pay off the whole debt of the borrow account in `market` from `from_number`.
    pub fn repay_all_for_borrow_position(
        &self,
        ledger: &mut Ledger,
        owner: Address,
        from_number: u64,
        borrow_number: u64,
        market: MarketId,
        flag: BalanceCheckFlag,
    ) -> Result<OperationResult, ProxyError> {
        let (from, borrow) = (AccountInfo::new(owner, from_number), AccountInfo::new(owner, borrow_number));
        let builder = Operation::builder().transfer(borrow, from, market, AssetAmount::zero_target());
        let operation = flag.apply(builder, from, borrow, market).build();
        let result = ledger.operate(self.address, &operation)?;
        info!("repaid borrow position {} in {}", borrow, market);
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn transfer(
        &self,
        ledger: &mut Ledger,
        owner: Address,
        from_number: u64,
        to_number: u64,
        market: MarketId,
        amount: Wei,
        flag: BalanceCheckFlag,
    ) -> Result<OperationResult, ProxyError> {
        let (from, to) = (AccountInfo::new(owner, from_number), AccountInfo::new(owner, to_number));
        let builder = Operation::builder().transfer(from, to, market, AssetAmount::delta_wei(-amount.value()));
        let operation = flag.apply(builder, from, to, market).build();
        Ok(ledger.operate(self.address, &operation)?)
    }
}
