//! Pool entity
//!
//! A pool holds two assets in canonical order, the reserves it believes it
//! custodies, the share ledger of its liquidity providers, and the
//! time-weighted price accumulators.

use crate::error::{AmmError, Result};
use crate::math::{MAX_RESERVE, U256};
use crate::oracle;
use crate::types::{AccountId, AssetId, PoolId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::debug;

/// Which of the pool's two assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

/// Reserves oriented for a trade: input side first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    pub side_in: Side,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub reserve_in: u128,
    pub reserve_out: u128,
}

/// Complete state of a single pool
#[derive(Debug, Clone)]
pub struct Pool {
    pub(crate) id: PoolId,
    pub(crate) asset_a: AssetId,
    pub(crate) asset_b: AssetId,

    pub(crate) reserve_a: u128,
    pub(crate) reserve_b: u128,

    pub(crate) total_shares: u128,
    pub(crate) share_balances: HashMap<AccountId, u128>,

    pub(crate) price_a_cumulative: U256,
    pub(crate) price_b_cumulative: U256,
    pub(crate) last_update_timestamp: u32,

    // Shared by working copies so a copy cannot bypass the guard
    pub(crate) lock: Arc<AtomicBool>,
}

impl Pool {
    /// Create an empty pool; assets must already be in canonical order
    pub(crate) fn new(asset_a: AssetId, asset_b: AssetId) -> Self {
        debug_assert!(asset_a < asset_b);
        Self {
            id: PoolId::derive(asset_a, asset_b),
            asset_a,
            asset_b,
            reserve_a: 0,
            reserve_b: 0,
            total_shares: 0,
            share_balances: HashMap::new(),
            price_a_cumulative: U256::zero(),
            price_b_cumulative: U256::zero(),
            last_update_timestamp: 0,
            lock: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn assets(&self) -> (AssetId, AssetId) {
        (self.asset_a, self.asset_b)
    }

    pub fn reserves(&self) -> (u128, u128) {
        (self.reserve_a, self.reserve_b)
    }

    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    pub fn shares_of(&self, account: &AccountId) -> u128 {
        self.share_balances.get(account).copied().unwrap_or(0)
    }

    /// Number of accounts holding a non-zero share balance
    pub fn provider_count(&self) -> usize {
        self.share_balances.values().filter(|shares| **shares > 0).count()
    }

    pub fn price_cumulatives(&self) -> (U256, U256) {
        (self.price_a_cumulative, self.price_b_cumulative)
    }

    pub fn last_update_timestamp(&self) -> u32 {
        self.last_update_timestamp
    }

    pub fn is_empty(&self) -> bool {
        self.reserve_a == 0 && self.reserve_b == 0
    }

    /// Check if pool trades a specific asset
    pub fn side_of(&self, asset: &AssetId) -> Option<Side> {
        if *asset == self.asset_a {
            Some(Side::A)
        } else if *asset == self.asset_b {
            Some(Side::B)
        } else {
            None
        }
    }

    pub fn asset(&self, side: Side) -> AssetId {
        match side {
            Side::A => self.asset_a,
            Side::B => self.asset_b,
        }
    }

    /// Orient reserves for a trade selling `asset_in`
    pub fn orient(&self, asset_in: &AssetId) -> Result<Orientation> {
        match self.side_of(asset_in) {
            Some(Side::A) => Ok(Orientation {
                side_in: Side::A,
                asset_in: self.asset_a,
                asset_out: self.asset_b,
                reserve_in: self.reserve_a,
                reserve_out: self.reserve_b,
            }),
            Some(Side::B) => Ok(Orientation {
                side_in: Side::B,
                asset_in: self.asset_b,
                asset_out: self.asset_a,
                reserve_in: self.reserve_b,
                reserve_out: self.reserve_a,
            }),
            None => Err(AmmError::InvalidAsset {
                pool: self.id,
                asset: *asset_in,
            }),
        }
    }

    pub(crate) fn credit_shares(&mut self, account: AccountId, shares: u128) -> Result<()> {
        let total = self
            .total_shares
            .checked_add(shares)
            .ok_or(AmmError::ArithmeticFault("total shares overflow"))?;
        let balance = self.share_balances.entry(account).or_insert(0);
        *balance = balance
            .checked_add(shares)
            .ok_or(AmmError::ArithmeticFault("share balance overflow"))?;
        self.total_shares = total;
        Ok(())
    }

    pub(crate) fn debit_shares(&mut self, account: AccountId, shares: u128) -> Result<()> {
        let available = self.shares_of(&account);
        if available < shares {
            return Err(AmmError::InsufficientShares {
                owner: account,
                available,
                requested: shares,
            });
        }
        let total = self
            .total_shares
            .checked_sub(shares)
            .ok_or(AmmError::ArithmeticFault("total shares underflow"))?;

        let remaining = available - shares;
        if remaining == 0 {
            self.share_balances.remove(&account);
        } else {
            self.share_balances.insert(account, remaining);
        }
        self.total_shares = total;
        Ok(())
    }

    /// Advance the accumulators over the old reserves, then adopt the
    /// custodied balances as the new reserves
    pub(crate) fn resync(&mut self, balance_a: u128, balance_b: u128, now: u64) -> Result<()> {
        check_reserves(balance_a, balance_b)?;

        oracle::update_accumulator(self, now);

        debug!(
            pool = %self.id,
            reserve_a = balance_a,
            reserve_b = balance_b,
            "reserves resynchronised"
        );
        self.reserve_a = balance_a;
        self.reserve_b = balance_b;
        Ok(())
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            pool_id: self.id,
            asset_a: self.asset_a,
            asset_b: self.asset_b,
            reserve_a: self.reserve_a,
            reserve_b: self.reserve_b,
            total_shares: self.total_shares,
            providers: self.provider_count(),
            price_a_cumulative: format!("{:#x}", self.price_a_cumulative),
            price_b_cumulative: format!("{:#x}", self.price_b_cumulative),
            last_update_timestamp: self.last_update_timestamp,
        }
    }
}

/// Serializable read-only view of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub pool_id: PoolId,
    pub asset_a: AssetId,
    pub asset_b: AssetId,
    pub reserve_a: u128,
    pub reserve_b: u128,
    pub total_shares: u128,
    /// Accounts holding shares, including the genesis lock
    pub providers: usize,
    /// UQ112x112 accumulators as hex
    pub price_a_cumulative: String,
    pub price_b_cumulative: String,
    pub last_update_timestamp: u32,
}

/// Reject balances that cannot be held as 112-bit reserves
pub(crate) fn check_reserves(balance_a: u128, balance_b: u128) -> Result<()> {
    for balance in [balance_a, balance_b] {
        if balance > MAX_RESERVE {
            return Err(AmmError::ReserveOverflow(balance));
        }
    }
    Ok(())
}
