//! Per-pool reentrancy guard

use crate::error::{AmmError, Result};
use crate::pool::Pool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Holds a pool's lock flag until dropped
#[derive(Debug)]
pub(crate) struct PoolGuard {
    lock: Arc<AtomicBool>,
}

impl PoolGuard {
    /// Fails with [`AmmError::Locked`] if another operation holds the pool
    pub(crate) fn acquire(pool: &Pool) -> Result<Self> {
        let lock = Arc::clone(&pool.lock);
        if lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            warn!(pool = %pool.id(), "pool already locked");
            return Err(AmmError::Locked(pool.id()));
        }
        Ok(Self { lock })
    }
}

impl Drop for PoolGuard {
    fn drop(&mut self) {
        self.lock.store(false, Ordering::Release);
    }
}
