//! Pool registry
//!
//! Sole owner of every [`Pool`], keyed by the canonical [`PoolId`]. Pools are
//! only ever added, never removed.

use crate::error::{AmmError, Result};
use crate::pool::Pool;
use crate::types::{sort_assets, AssetId, PoolId};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: HashMap<PoolId, Pool>,
    /// Creation order
    pool_ids: Vec<PoolId>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical identifier for an unordered pair
    pub fn pool_id(x: AssetId, y: AssetId) -> PoolId {
        PoolId::derive(x, y)
    }

    /// Register an empty pool for the pair
    pub fn create_pool(&mut self, x: AssetId, y: AssetId) -> Result<PoolId> {
        if x == y {
            return Err(AmmError::IdenticalAssets);
        }
        let (asset_a, asset_b) = sort_assets(x, y);
        if asset_a.is_zero() {
            return Err(AmmError::ZeroAsset);
        }

        let pool_id = PoolId::derive(asset_a, asset_b);
        if self.pools.contains_key(&pool_id) {
            return Err(AmmError::PoolAlreadyExists(pool_id));
        }

        self.pools.insert(pool_id, Pool::new(asset_a, asset_b));
        self.pool_ids.push(pool_id);

        info!(
            pool = %pool_id,
            asset_a = %asset_a,
            asset_b = %asset_b,
            total_pools = self.pool_ids.len(),
            "pool created"
        );
        Ok(pool_id)
    }

    pub fn lookup(&self, pool_id: &PoolId) -> Result<&Pool> {
        self.pools
            .get(pool_id)
            .ok_or(AmmError::PoolNotFound(*pool_id))
    }

    pub(crate) fn lookup_mut(&mut self, pool_id: &PoolId) -> Result<&mut Pool> {
        self.pools
            .get_mut(pool_id)
            .ok_or(AmmError::PoolNotFound(*pool_id))
    }

    /// Pool trading the given pair, in either order
    pub fn find(&self, x: AssetId, y: AssetId) -> Option<&Pool> {
        self.pools.get(&PoolId::derive(x, y))
    }

    pub fn contains(&self, pool_id: &PoolId) -> bool {
        self.pools.contains_key(pool_id)
    }

    /// Identifiers in creation order
    pub fn pool_ids(&self) -> &[PoolId] {
        &self.pool_ids
    }

    pub fn len(&self) -> usize {
        self.pool_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool_ids.is_empty()
    }
}
