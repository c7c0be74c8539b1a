//! # CPMM Engine - Constant-Product Pool Accounting and Pricing
//!
//! ## Purpose
//!
//! Accounting and pricing core for constant-product liquidity pools: canonical
//! pool identity, liquidity-share minting and burning, fee-adjusted swap
//! pricing and the time-weighted price accumulator. All amounts are integers
//! with explicit rounding in the pool's favour; intermediate products use
//! 256-bit arithmetic.
//!
//! ## Integration Points
//!
//! - **Custody**: the host supplies an [`AssetLedger`]; the engine only moves
//!   assets through it and never holds balances itself
//! - **Time**: a [`Clock`] feeds the price accumulator ([`SystemClock`] or
//!   [`ManualClock`])
//! - **Notifications**: committed operations publish [`PoolEvent`]s to any
//!   number of [`EventSink`]s
//! - **Configuration**: [`AmmEngine::from_config`] wires clock and sinks from
//!   `cpmm_config::EngineConfig`
//!
//! ## Architecture Role
//!
//! ```text
//! AmmEngine ──► PoolRegistry ──► Pool
//!     │              (create / lookup)
//!     ├──► liquidity   quote_deposit, mint_shares, burn_shares
//!     ├──► swap        plan_exact_in / plan_exact_out, settle
//!     ├──► oracle      update_accumulator, average_price
//!     └──► Settlement  ──► AssetLedger (host)
//!
//! ConstantProductMath is the shared leaf of every path.
//! ```
//!
//! Each mutating operation holds the pool's reentrancy guard, works on a copy
//! of the pool and journals its transfers. Nothing is kept unless the whole
//! operation succeeds.

pub mod clock;
pub mod custody;
pub mod engine;
pub mod error;
pub mod events;
mod guard;
pub mod liquidity;
pub mod math;
pub mod oracle;
pub mod pool;
pub mod pool_traits;
pub mod registry;
pub mod swap;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use custody::{AssetLedger, InMemoryLedger};
pub use engine::{AmmEngine, DepositBounds, LiquidityReceipt, SwapReceipt};
pub use error::{AmmError, ErrorKind, Result, TransferError};
pub use events::{EventLog, EventSink, PoolEvent, TracingSink};
pub use math::{ConstantProductMath, MINIMUM_LIQUIDITY, U256};
pub use oracle::{Observation, TwapPrice, TwapWindow};
pub use pool::{Pool, PoolSnapshot, Side};
pub use pool_traits::PricedPool;
pub use registry::PoolRegistry;
pub use types::{AccountId, AssetId, PoolId};

/// Common types for price display
pub use rust_decimal::Decimal;
