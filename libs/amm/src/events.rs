//! Domain event notifications
//!
//! Events are side-channel notifications published after an operation has
//! committed. Sinks cannot influence or fail an operation.

use crate::types::{AccountId, AssetId, PoolId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::info;

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PoolEvent {
    PoolCreated {
        pool: PoolId,
        asset_a: AssetId,
        asset_b: AssetId,
    },
    LiquidityAdded {
        pool: PoolId,
        provider: AccountId,
        amount_a: u128,
        amount_b: u128,
        shares_minted: u128,
    },
    LiquidityRemoved {
        pool: PoolId,
        provider: AccountId,
        recipient: AccountId,
        amount_a: u128,
        amount_b: u128,
        shares_burned: u128,
    },
    SwapExecuted {
        pool: PoolId,
        actor: AccountId,
        recipient: AccountId,
        asset_in: AssetId,
        asset_out: AssetId,
        amount_in: u128,
        amount_out: u128,
    },
    /// Reserves after every resynchronisation
    Synced {
        pool: PoolId,
        reserve_a: u128,
        reserve_b: u128,
    },
}

impl PoolEvent {
    pub fn pool_id(&self) -> PoolId {
        match self {
            PoolEvent::PoolCreated { pool, .. }
            | PoolEvent::LiquidityAdded { pool, .. }
            | PoolEvent::LiquidityRemoved { pool, .. }
            | PoolEvent::SwapExecuted { pool, .. }
            | PoolEvent::Synced { pool, .. } => *pool,
        }
    }
}

/// A destination for committed events
pub trait EventSink: Send + Sync + Debug {
    fn publish(&self, event: &PoolEvent);
}

/// Publishes events as tracing records
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &PoolEvent) {
        match event {
            PoolEvent::PoolCreated {
                pool,
                asset_a,
                asset_b,
            } => info!(pool = %pool, asset_a = %asset_a, asset_b = %asset_b, "PoolCreated"),
            PoolEvent::LiquidityAdded {
                pool,
                provider,
                amount_a,
                amount_b,
                shares_minted,
            } => info!(
                pool = %pool,
                provider = %provider,
                amount_a,
                amount_b,
                shares_minted,
                "LiquidityAdded"
            ),
            PoolEvent::LiquidityRemoved {
                pool,
                provider,
                recipient,
                amount_a,
                amount_b,
                shares_burned,
            } => info!(
                pool = %pool,
                provider = %provider,
                recipient = %recipient,
                amount_a,
                amount_b,
                shares_burned,
                "LiquidityRemoved"
            ),
            PoolEvent::SwapExecuted {
                pool,
                actor,
                recipient,
                asset_in,
                asset_out,
                amount_in,
                amount_out,
            } => info!(
                pool = %pool,
                actor = %actor,
                recipient = %recipient,
                asset_in = %asset_in,
                asset_out = %asset_out,
                amount_in,
                amount_out,
                "SwapExecuted"
            ),
            PoolEvent::Synced {
                pool,
                reserve_a,
                reserve_b,
            } => info!(pool = %pool, reserve_a, reserve_b, "Synced"),
        }
    }
}

/// Bounded in-memory event history; clones share the same buffer
#[derive(Debug, Clone)]
pub struct EventLog {
    events: Arc<Mutex<VecDeque<PoolEvent>>>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained events, oldest first
    pub fn events(&self) -> Vec<PoolEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Remove and return all retained events
    pub fn drain(&self) -> Vec<PoolEvent> {
        self.events.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventLog {
    fn publish(&self, event: &PoolEvent) {
        if self.capacity == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synced(reserve_a: u128) -> PoolEvent {
        PoolEvent::Synced {
            pool: PoolId::derive(AssetId::new([1; 20]), AssetId::new([2; 20])),
            reserve_a,
            reserve_b: 0,
        }
    }

    #[test]
    fn test_event_log_evicts_oldest() {
        let log = EventLog::new(2);
        let reader = log.clone();

        log.publish(&synced(1));
        log.publish(&synced(2));
        log.publish(&synced(3));

        assert_eq!(reader.events(), vec![synced(2), synced(3)]);
        assert_eq!(reader.drain().len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_zero_capacity_retains_nothing() {
        let log = EventLog::new(0);
        log.publish(&synced(1));
        assert!(log.is_empty());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(synced(5)).unwrap();
        assert_eq!(json["type"], "synced");
        assert_eq!(synced(5).pool_id(), PoolId::derive(AssetId::new([2; 20]), AssetId::new([1; 20])));
    }
}
