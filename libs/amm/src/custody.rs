//! Asset custody seam
//!
//! The engine never moves assets itself. It drives an [`AssetLedger`]
//! supplied by the host and records every movement of an operation in a
//! [`Settlement`], which replays compensating transfers in reverse order if
//! the operation fails before committing.

use crate::error::TransferError;
use crate::types::{AccountId, AssetId};
use std::collections::{HashMap, HashSet};
use tracing::{error, warn};

/// Transfer capability consumed by the engine
///
/// Each call must either fully succeed or fail without side effects.
pub trait AssetLedger {
    /// Balance of `asset` held by `holder`
    fn balance_of(&self, asset: &AssetId, holder: &AccountId) -> u128;

    /// Move `amount` of `asset` from `from` to `to`
    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), TransferError>;
}

/// Reference in-process ledger
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedger {
    balances: HashMap<(AssetId, AccountId), u128>,
    frozen: HashSet<AccountId>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` of `asset` out of thin air for `holder`
    pub fn credit(&mut self, asset: AssetId, holder: AccountId, amount: u128) -> Result<(), TransferError> {
        let balance = self.balances.entry((asset, holder)).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(TransferError::BalanceOverflow { asset, holder })?;
        Ok(())
    }

    /// Make every transfer touching `account` fail
    pub fn freeze(&mut self, account: AccountId) {
        self.frozen.insert(account);
    }

    pub fn unfreeze(&mut self, account: &AccountId) {
        self.frozen.remove(account);
    }
}

impl AssetLedger for InMemoryLedger {
    fn balance_of(&self, asset: &AssetId, holder: &AccountId) -> u128 {
        self.balances.get(&(*asset, *holder)).copied().unwrap_or(0)
    }

    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), TransferError> {
        if self.frozen.contains(from) {
            return Err(TransferError::Frozen(*from));
        }
        if self.frozen.contains(to) {
            return Err(TransferError::Frozen(*to));
        }

        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                asset: *asset,
                holder: *from,
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or(TransferError::BalanceOverflow {
                asset: *asset,
                holder: *to,
            })?;

        self.balances.insert((*asset, *from), available - amount);
        self.balances.insert((*asset, *to), credited);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Movement {
    asset: AssetId,
    from: AccountId,
    to: AccountId,
    amount: u128,
}

/// Journal of the transfers made by one engine operation
///
/// Dropping an uncommitted settlement reverses every recorded movement.
pub(crate) struct Settlement<'a, L: AssetLedger> {
    ledger: &'a mut L,
    custody: AccountId,
    applied: Vec<Movement>,
    committed: bool,
}

impl<'a, L: AssetLedger> Settlement<'a, L> {
    pub(crate) fn new(ledger: &'a mut L, custody: AccountId) -> Self {
        Self {
            ledger,
            custody,
            applied: Vec::new(),
            committed: false,
        }
    }

    /// Pull `amount` of `asset` from `from` into pool custody
    pub(crate) fn transfer_in(
        &mut self,
        asset: AssetId,
        from: AccountId,
        amount: u128,
    ) -> Result<(), TransferError> {
        let custody = self.custody;
        self.apply(asset, from, custody, amount)
    }

    /// Push `amount` of `asset` out of pool custody to `to`
    pub(crate) fn transfer_out(
        &mut self,
        asset: AssetId,
        to: AccountId,
        amount: u128,
    ) -> Result<(), TransferError> {
        let custody = self.custody;
        self.apply(asset, custody, to, amount)
    }

    /// Pool custody balances of both assets
    pub(crate) fn custodied(&self, asset_a: &AssetId, asset_b: &AssetId) -> (u128, u128) {
        (
            self.ledger.balance_of(asset_a, &self.custody),
            self.ledger.balance_of(asset_b, &self.custody),
        )
    }

    pub(crate) fn commit(mut self) {
        self.committed = true;
    }

    fn apply(
        &mut self,
        asset: AssetId,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<(), TransferError> {
        if amount == 0 {
            return Ok(());
        }
        self.ledger.transfer(&asset, &from, &to, amount)?;
        self.applied.push(Movement {
            asset,
            from,
            to,
            amount,
        });
        Ok(())
    }
}

impl<L: AssetLedger> Drop for Settlement<'_, L> {
    fn drop(&mut self) {
        if self.committed || self.applied.is_empty() {
            return;
        }

        warn!(
            custody = %self.custody,
            movements = self.applied.len(),
            "rolling back settlement"
        );
        while let Some(movement) = self.applied.pop() {
            if let Err(e) =
                self.ledger
                    .transfer(&movement.asset, &movement.to, &movement.from, movement.amount)
            {
                error!(
                    asset = %movement.asset,
                    from = %movement.to,
                    to = %movement.from,
                    amount = movement.amount,
                    error = %e,
                    "compensating transfer failed"
                );
            }
        }
    }
}
