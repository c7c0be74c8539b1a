//! Time-weighted price accumulator
//!
//! Each pool integrates its instantaneous relative price over time. Prices are
//! UQ112x112 fixed point (`reserve_other * 2^112 / reserve_self`), timestamps
//! are truncated to 32 bits and elapsed time is computed modulo 2^32. The
//! accumulators themselves wrap modulo 2^256, so consumers must difference
//! two observations with wrapping subtraction, as [`average_price`] does.

use crate::error::{AmmError, Result};
use crate::math::{ConstantProductMath, RESOLUTION, TIMESTAMP_MODULUS, U256};
use crate::pool::Pool;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decimal places kept when converting UQ112x112 to `Decimal`
const DECIMAL_SCALE: u32 = 18;

/// Truncate a timestamp into the 32-bit accumulator domain
pub fn truncate_timestamp(now: u64) -> u32 {
    (now % TIMESTAMP_MODULUS) as u32
}

/// `numerator / denominator` as UQ112x112; `denominator` must be non-zero
pub fn encode_price(numerator: u128, denominator: u128) -> U256 {
    (U256::from(numerator) << RESOLUTION) / U256::from(denominator)
}

/// Accumulate price over the elapsed interval using the pool's current
/// reserves, then record `now` as the last update.
pub fn update_accumulator(pool: &mut Pool, now: u64) {
    let timestamp = truncate_timestamp(now);
    let elapsed = timestamp.wrapping_sub(pool.last_update_timestamp);

    if elapsed > 0 && pool.reserve_a != 0 && pool.reserve_b != 0 {
        let (price_a, price_b) = accumulated_over(pool.reserve_a, pool.reserve_b, elapsed);
        pool.price_a_cumulative = pool.price_a_cumulative.overflowing_add(price_a).0;
        pool.price_b_cumulative = pool.price_b_cumulative.overflowing_add(price_b).0;

        debug!(
            pool = %pool.id,
            elapsed,
            "price accumulators advanced"
        );
    }

    pool.last_update_timestamp = timestamp;
}

/// Accumulators as they would read after an update at `now`, without
/// touching the pool
pub fn current_cumulative_prices(pool: &Pool, now: u64) -> Observation {
    let timestamp = truncate_timestamp(now);
    let mut price_a_cumulative = pool.price_a_cumulative;
    let mut price_b_cumulative = pool.price_b_cumulative;

    let elapsed = timestamp.wrapping_sub(pool.last_update_timestamp);
    if elapsed > 0 && pool.reserve_a != 0 && pool.reserve_b != 0 {
        let (price_a, price_b) = accumulated_over(pool.reserve_a, pool.reserve_b, elapsed);
        price_a_cumulative = price_a_cumulative.overflowing_add(price_a).0;
        price_b_cumulative = price_b_cumulative.overflowing_add(price_b).0;
    }

    Observation {
        timestamp,
        price_a_cumulative,
        price_b_cumulative,
    }
}

fn accumulated_over(reserve_a: u128, reserve_b: u128, elapsed: u32) -> (U256, U256) {
    // Reserves are capped at 2^112 - 1, so price * elapsed stays below 2^256
    let elapsed = U256::from(elapsed);
    (
        encode_price(reserve_b, reserve_a) * elapsed,
        encode_price(reserve_a, reserve_b) * elapsed,
    )
}

/// A sample of both accumulators at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub timestamp: u32,
    /// Integral of the price of asset A in units of asset B
    pub price_a_cumulative: U256,
    /// Integral of the price of asset B in units of asset A
    pub price_b_cumulative: U256,
}

/// Average UQ112x112 price over an observation window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwapPrice(U256);

impl TwapPrice {
    pub fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    /// Value of `amount` units at this price, rounded down
    pub fn quote(&self, amount: u128) -> Result<u128> {
        let value = self
            .0
            .checked_mul(U256::from(amount))
            .ok_or(AmmError::ArithmeticFault("twap quote overflow"))?;
        ConstantProductMath::narrow(value >> RESOLUTION, "twap quote exceeds u128")
    }

    /// Lossy conversion for display; `None` if out of `Decimal` range
    pub fn to_decimal(&self) -> Option<Decimal> {
        let scale = U256::from(10u64.pow(DECIMAL_SCALE));
        let scaled = self.0.checked_mul(scale)? >> RESOLUTION;
        if scaled.bits() > 127 {
            return None;
        }
        Decimal::try_from_i128_with_scale(scaled.low_u128() as i128, DECIMAL_SCALE)
            .ok()
            .map(|d| d.normalize())
    }
}

/// Time-weighted average prices of both assets between two observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwapWindow {
    pub elapsed: u32,
}

/// Compute both time-weighted averages between `start` and `end`
///
/// Returns `(price of A in B, price of B in A, window)`.
pub fn average_price(
    start: &Observation,
    end: &Observation,
) -> Result<(TwapPrice, TwapPrice, TwapWindow)> {
    let elapsed = end.timestamp.wrapping_sub(start.timestamp);
    if elapsed == 0 {
        return Err(AmmError::EmptyObservationWindow);
    }

    let divisor = U256::from(elapsed);
    let price_a = end
        .price_a_cumulative
        .overflowing_sub(start.price_a_cumulative)
        .0
        / divisor;
    let price_b = end
        .price_b_cumulative
        .overflowing_sub(start.price_b_cumulative)
        .0
        / divisor;

    Ok((TwapPrice(price_a), TwapPrice(price_b), TwapWindow { elapsed }))
}
