//! Engine facade
//!
//! [`AmmEngine`] owns the pool registry and drives the host's [`AssetLedger`].
//! Every mutating operation runs under the pool's reentrancy guard against a
//! working copy of the pool and a settlement journal; both are committed only
//! when the whole operation succeeds, and events are published after that.

use crate::clock::{Clock, ManualClock, SystemClock};
use crate::custody::{AssetLedger, Settlement};
use crate::error::{AmmError, Result};
use crate::events::{EventLog, EventSink, PoolEvent, TracingSink};
use crate::guard::PoolGuard;
use crate::liquidity;
use crate::oracle::{self, Observation, TwapPrice, TwapWindow};
use crate::pool::{Pool, PoolSnapshot};
use crate::pool_traits::PricedPool;
use crate::registry::PoolRegistry;
use crate::swap::{self, SwapPlan};
use crate::types::{AccountId, AssetId, PoolId};
use cpmm_config::{ClockSource, EngineConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Desired and minimum deposit amounts, in canonical asset order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DepositBounds {
    pub desired_a: u128,
    pub desired_b: u128,
    pub min_a: u128,
    pub min_b: u128,
}

impl DepositBounds {
    /// Deposit exactly the desired amounts or fail
    pub fn exact(amount_a: u128, amount_b: u128) -> Self {
        Self {
            desired_a: amount_a,
            desired_b: amount_b,
            min_a: amount_a,
            min_b: amount_b,
        }
    }
}

/// Outcome of a deposit or withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityReceipt {
    pub pool_id: PoolId,
    pub amount_a: u128,
    pub amount_b: u128,
    pub shares: u128,
}

/// Outcome of a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub pool_id: PoolId,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: u128,
    pub amount_out: u128,
}

/// Constant-product pool engine over a host-supplied asset ledger
pub struct AmmEngine<L: AssetLedger> {
    registry: PoolRegistry,
    ledger: L,
    clock: Box<dyn Clock>,
    manual_clock: Option<ManualClock>,
    sinks: Vec<Box<dyn EventSink>>,
    history: Option<EventLog>,
}

impl<L: AssetLedger> AmmEngine<L> {
    /// Engine with no event sinks
    pub fn new(ledger: L, clock: impl Clock + 'static) -> Self {
        Self {
            registry: PoolRegistry::new(),
            ledger,
            clock: Box::new(clock),
            manual_clock: None,
            sinks: Vec::new(),
            history: None,
        }
    }

    /// Engine wired from configuration: clock source, tracing sink and
    /// bounded event history
    pub fn from_config(ledger: L, config: &EngineConfig) -> Self {
        let mut engine = match config.clock.source {
            ClockSource::System => Self::new(ledger, SystemClock),
            ClockSource::Manual => {
                let clock = ManualClock::new(config.clock.start_timestamp);
                let mut engine = Self::new(ledger, clock.clone());
                engine.manual_clock = Some(clock);
                engine
            }
        };

        if config.events.trace_events {
            engine.add_sink(Box::new(TracingSink));
        }
        if config.events.history_capacity > 0 {
            let log = EventLog::new(config.events.history_capacity);
            engine.add_sink(Box::new(log.clone()));
            engine.history = Some(log);
        }

        info!(
            clock = ?config.clock.source,
            trace_events = config.events.trace_events,
            history_capacity = config.events.history_capacity,
            "engine initialized"
        );
        engine
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self.manual_clock = None;
        self
    }

    /// Handle to the manual clock created by [`AmmEngine::from_config`]
    ///
    /// `None` for system clocks and for clocks passed to [`AmmEngine::new`]
    /// or [`AmmEngine::with_clock`], whose callers keep their own handle.
    pub fn manual_clock(&self) -> Option<&ManualClock> {
        self.manual_clock.as_ref()
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Event history configured through [`EngineConfig`], if any
    pub fn event_log(&self) -> Option<&EventLog> {
        self.history.as_ref()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct ledger access for funding accounts or transferring to custody
    /// outside engine operations
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    // ===== Mutating operations =====

    pub fn create_pool(&mut self, x: AssetId, y: AssetId) -> Result<PoolId> {
        let pool_id = self.registry.create_pool(x, y).inspect_err(|e| {
            warn!(asset_x = %x, asset_y = %y, error = %e, "pool creation rejected");
        })?;
        let (asset_a, asset_b) = self.registry.lookup(&pool_id)?.assets();

        self.publish(&[PoolEvent::PoolCreated {
            pool: pool_id,
            asset_a,
            asset_b,
        }]);
        Ok(pool_id)
    }

    /// Quote a ratio-preserving deposit, pull it from `provider` and mint
    /// shares to `recipient`
    pub fn add_liquidity(
        &mut self,
        provider: AccountId,
        pool_id: &PoolId,
        bounds: DepositBounds,
        recipient: AccountId,
    ) -> Result<LiquidityReceipt> {
        let receipt = self.execute(pool_id, "add_liquidity", |pool, settlement, now, events| {
            let (amount_a, amount_b) = liquidity::quote_deposit(
                pool,
                bounds.desired_a,
                bounds.desired_b,
                bounds.min_a,
                bounds.min_b,
            )?;

            let (asset_a, asset_b) = pool.assets();
            settlement.transfer_in(asset_a, provider, amount_a)?;
            settlement.transfer_in(asset_b, provider, amount_b)?;

            mint_into(pool, settlement, provider, recipient, now, events)
        })?;

        info!(
            pool = %pool_id,
            provider = %provider,
            amount_a = receipt.amount_a,
            amount_b = receipt.amount_b,
            shares = receipt.shares,
            "liquidity added"
        );
        Ok(receipt)
    }

    /// Mint shares for assets already transferred into the pool's custody
    /// account
    pub fn mint(&mut self, pool_id: &PoolId, recipient: AccountId) -> Result<LiquidityReceipt> {
        let receipt = self.execute(pool_id, "mint", |pool, settlement, now, events| {
            mint_into(pool, settlement, recipient, recipient, now, events)
        })?;

        info!(
            pool = %pool_id,
            recipient = %recipient,
            shares = receipt.shares,
            "liquidity minted"
        );
        Ok(receipt)
    }

    /// Burn `shares` held by `owner` and send the pro-rata assets to
    /// `recipient`, enforcing minimum withdrawal amounts
    pub fn remove_liquidity(
        &mut self,
        owner: AccountId,
        pool_id: &PoolId,
        shares: u128,
        min_a: u128,
        min_b: u128,
        recipient: AccountId,
    ) -> Result<LiquidityReceipt> {
        let receipt = self.execute(pool_id, "remove_liquidity", |pool, settlement, now, events| {
            check_recipient(pool, recipient)?;
            let (asset_a, asset_b) = pool.assets();
            let (balance_a, balance_b) = settlement.custodied(&asset_a, &asset_b);
            let (amount_a, amount_b) =
                liquidity::burn_shares(pool, owner, shares, balance_a, balance_b)?;

            if amount_a < min_a {
                return Err(AmmError::SlippageA {
                    actual: amount_a,
                    minimum: min_a,
                });
            }
            if amount_b < min_b {
                return Err(AmmError::SlippageB {
                    actual: amount_b,
                    minimum: min_b,
                });
            }

            settlement.transfer_out(asset_a, recipient, amount_a)?;
            settlement.transfer_out(asset_b, recipient, amount_b)?;

            let (balance_a, balance_b) = settlement.custodied(&asset_a, &asset_b);
            pool.resync(balance_a, balance_b, now)?;

            events.push(synced(pool));
            events.push(PoolEvent::LiquidityRemoved {
                pool: pool.id(),
                provider: owner,
                recipient,
                amount_a,
                amount_b,
                shares_burned: shares,
            });
            Ok(LiquidityReceipt {
                pool_id: pool.id(),
                amount_a,
                amount_b,
                shares,
            })
        })?;

        info!(
            pool = %pool_id,
            owner = %owner,
            amount_a = receipt.amount_a,
            amount_b = receipt.amount_b,
            shares = receipt.shares,
            "liquidity removed"
        );
        Ok(receipt)
    }

    /// Burn without withdrawal bounds
    pub fn burn(
        &mut self,
        owner: AccountId,
        pool_id: &PoolId,
        shares: u128,
        recipient: AccountId,
    ) -> Result<LiquidityReceipt> {
        self.remove_liquidity(owner, pool_id, shares, 0, 0, recipient)
    }

    /// Sell exactly `amount_in` of `asset_in` for at least `min_amount_out`
    pub fn swap_exact_in(
        &mut self,
        actor: AccountId,
        pool_id: &PoolId,
        asset_in: AssetId,
        amount_in: u128,
        min_amount_out: u128,
        recipient: AccountId,
    ) -> Result<SwapReceipt> {
        self.execute(pool_id, "swap_exact_in", |pool, settlement, now, events| {
            let plan = swap::plan_exact_in(pool, &asset_in, amount_in, min_amount_out)?;
            settle_swap(pool, settlement, &plan, actor, recipient, now, events)
        })
        .inspect(|receipt| log_swap(actor, receipt))
    }

    /// Buy exactly `amount_out` of the other asset for at most `max_amount_in`
    pub fn swap_exact_out(
        &mut self,
        actor: AccountId,
        pool_id: &PoolId,
        asset_in: AssetId,
        amount_out: u128,
        max_amount_in: u128,
        recipient: AccountId,
    ) -> Result<SwapReceipt> {
        self.execute(pool_id, "swap_exact_out", |pool, settlement, now, events| {
            let plan = swap::plan_exact_out(pool, &asset_in, amount_out, max_amount_in)?;
            settle_swap(pool, settlement, &plan, actor, recipient, now, events)
        })
        .inspect(|receipt| log_swap(actor, receipt))
    }

    /// Adopt the custodied balances as reserves, absorbing any assets sent
    /// to custody outside engine operations
    pub fn sync(&mut self, pool_id: &PoolId) -> Result<(u128, u128)> {
        self.execute(pool_id, "sync", |pool, settlement, now, events| {
            let (asset_a, asset_b) = pool.assets();
            let (balance_a, balance_b) = settlement.custodied(&asset_a, &asset_b);
            pool.resync(balance_a, balance_b, now)?;
            events.push(synced(pool));
            Ok(pool.reserves())
        })
    }

    /// Move liquidity shares between accounts
    pub fn transfer_shares(
        &mut self,
        pool_id: &PoolId,
        from: AccountId,
        to: AccountId,
        shares: u128,
    ) -> Result<()> {
        self.execute(pool_id, "transfer_shares", |pool, _, _, _| {
            liquidity::transfer_shares(pool, from, to, shares)
        })?;
        debug!(pool = %pool_id, from = %from, to = %to, shares, "shares transferred");
        Ok(())
    }

    // ===== Reads =====

    pub fn get_reserves(&self, pool_id: &PoolId) -> Result<(u128, u128)> {
        Ok(self.registry.lookup(pool_id)?.reserves())
    }

    pub fn get_user_liquidity(&self, pool_id: &PoolId, user: &AccountId) -> Result<u128> {
        Ok(self.registry.lookup(pool_id)?.shares_of(user))
    }

    /// Canonical identifier for an unordered pair; the pool need not exist
    pub fn get_pool_id(&self, x: AssetId, y: AssetId) -> PoolId {
        PoolRegistry::pool_id(x, y)
    }

    pub fn pool_exists(&self, pool_id: &PoolId) -> bool {
        self.registry.contains(pool_id)
    }

    pub fn total_shares(&self, pool_id: &PoolId) -> Result<u128> {
        Ok(self.registry.lookup(pool_id)?.total_shares())
    }

    pub fn pool(&self, pool_id: &PoolId) -> Result<&Pool> {
        self.registry.lookup(pool_id)
    }

    pub fn pool_snapshot(&self, pool_id: &PoolId) -> Result<PoolSnapshot> {
        Ok(self.registry.lookup(pool_id)?.snapshot())
    }

    pub fn pool_count(&self) -> usize {
        self.registry.len()
    }

    /// Accumulators as of now, including time elapsed since the last update
    pub fn observe(&self, pool_id: &PoolId) -> Result<Observation> {
        let pool = self.registry.lookup(pool_id)?;
        Ok(oracle::current_cumulative_prices(pool, self.clock.now()))
    }

    /// Time-weighted average prices from `since` until now
    pub fn consult(
        &self,
        pool_id: &PoolId,
        since: &Observation,
    ) -> Result<(TwapPrice, TwapPrice, TwapWindow)> {
        let now = self.observe(pool_id)?;
        oracle::average_price(since, &now)
    }

    pub fn quote_exact_in(&self, pool_id: &PoolId, asset_in: &AssetId, amount_in: u128) -> Result<u128> {
        self.registry.lookup(pool_id)?.quote_exact_in(asset_in, amount_in)
    }

    pub fn quote_exact_out(&self, pool_id: &PoolId, asset_in: &AssetId, amount_out: u128) -> Result<u128> {
        self.registry.lookup(pool_id)?.quote_exact_out(asset_in, amount_out)
    }

    pub fn spot_price(&self, pool_id: &PoolId, base: &AssetId) -> Result<Decimal> {
        self.registry.lookup(pool_id)?.spot_price(base)
    }

    // ===== Internals =====

    /// Run `op` against a guarded working copy of the pool, committing the
    /// copy and the settlement together or discarding both
    fn execute<T, F>(&mut self, pool_id: &PoolId, operation: &'static str, op: F) -> Result<T>
    where
        F: FnOnce(&mut Pool, &mut Settlement<'_, L>, u64, &mut Vec<PoolEvent>) -> Result<T>,
    {
        let now = self.clock.now();
        let stored = self.registry.lookup_mut(pool_id)?;
        let guard = PoolGuard::acquire(stored)?;

        let mut working = stored.clone();
        let mut events = Vec::new();
        let mut settlement = Settlement::new(&mut self.ledger, working.id().custody_account());

        match op(&mut working, &mut settlement, now, &mut events) {
            Ok(value) => {
                settlement.commit();
                *stored = working;
                drop(guard);
                self.publish(&events);
                Ok(value)
            }
            Err(e) => {
                // Dropping the settlement reverses its transfers
                drop(settlement);
                drop(guard);
                warn!(pool = %pool_id, operation, error = %e, "operation rejected");
                Err(e)
            }
        }
    }

    fn publish(&self, events: &[PoolEvent]) {
        for event in events {
            for sink in &self.sinks {
                sink.publish(event);
            }
        }
    }
}

fn mint_into<L: AssetLedger>(
    pool: &mut Pool,
    settlement: &mut Settlement<'_, L>,
    provider: AccountId,
    recipient: AccountId,
    now: u64,
    events: &mut Vec<PoolEvent>,
) -> Result<LiquidityReceipt> {
    let (asset_a, asset_b) = pool.assets();
    let (reserve_a, reserve_b) = pool.reserves();
    let (balance_a, balance_b) = settlement.custodied(&asset_a, &asset_b);

    let shares = liquidity::mint_shares(pool, balance_a, balance_b, recipient, now)?;
    // mint_shares rejects balances below the reserves
    let amount_a = balance_a - reserve_a;
    let amount_b = balance_b - reserve_b;

    events.push(synced(pool));
    events.push(PoolEvent::LiquidityAdded {
        pool: pool.id(),
        provider,
        amount_a,
        amount_b,
        shares_minted: shares,
    });
    Ok(LiquidityReceipt {
        pool_id: pool.id(),
        amount_a,
        amount_b,
        shares,
    })
}

fn settle_swap<L: AssetLedger>(
    pool: &mut Pool,
    settlement: &mut Settlement<'_, L>,
    plan: &SwapPlan,
    actor: AccountId,
    recipient: AccountId,
    now: u64,
    events: &mut Vec<PoolEvent>,
) -> Result<SwapReceipt> {
    check_recipient(pool, recipient)?;
    settlement.transfer_in(plan.asset_in, actor, plan.amount_in)?;
    settlement.transfer_out(plan.asset_out, recipient, plan.amount_out)?;

    let (asset_a, asset_b) = pool.assets();
    let (balance_a, balance_b) = settlement.custodied(&asset_a, &asset_b);
    swap::settle(pool, plan, balance_a, balance_b, now)?;

    events.push(synced(pool));
    events.push(PoolEvent::SwapExecuted {
        pool: pool.id(),
        actor,
        recipient,
        asset_in: plan.asset_in,
        asset_out: plan.asset_out,
        amount_in: plan.amount_in,
        amount_out: plan.amount_out,
    });
    Ok(SwapReceipt {
        pool_id: pool.id(),
        asset_in: plan.asset_in,
        asset_out: plan.asset_out,
        amount_in: plan.amount_in,
        amount_out: plan.amount_out,
    })
}

/// Payouts to the pool's own custody account would move nothing
fn check_recipient(pool: &Pool, recipient: AccountId) -> Result<()> {
    if recipient == pool.id().custody_account() {
        return Err(AmmError::InvalidRecipient(recipient));
    }
    Ok(())
}

fn synced(pool: &Pool) -> PoolEvent {
    let (reserve_a, reserve_b) = pool.reserves();
    PoolEvent::Synced {
        pool: pool.id(),
        reserve_a,
        reserve_b,
    }
}

fn log_swap(actor: AccountId, receipt: &SwapReceipt) {
    info!(
        pool = %receipt.pool_id,
        actor = %actor,
        asset_in = %receipt.asset_in,
        asset_out = %receipt.asset_out,
        amount_in = receipt.amount_in,
        amount_out = receipt.amount_out,
        "swap executed"
    );
}
