//! Swap planning and settlement
//!
//! A swap is planned against the pool's recorded reserves, settled through
//! custody by the engine, and then checked against the fee-adjusted constant
//! product before the custodied balances become the new reserves.

use crate::error::{AmmError, Result};
use crate::math::{ConstantProductMath, FEE_DENOMINATOR, FEE_NUMERATOR, MAX_RESERVE, U256};
use crate::pool::{Pool, Side};
use crate::types::AssetId;
use tracing::{debug, warn};

/// Fully quoted swap, ready to settle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapPlan {
    pub side_in: Side,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: u128,
    pub amount_out: u128,
}

/// Quote an exact-input swap and enforce the caller's minimum output
pub fn plan_exact_in(
    pool: &Pool,
    asset_in: &AssetId,
    amount_in: u128,
    min_amount_out: u128,
) -> Result<SwapPlan> {
    let orientation = pool.orient(asset_in)?;
    let amount_out =
        ConstantProductMath::quote_out(amount_in, orientation.reserve_in, orientation.reserve_out)?;

    if amount_out == 0 {
        return Err(AmmError::InsufficientOutput);
    }
    if amount_out < min_amount_out {
        warn!(
            pool = %pool.id(),
            amount_in,
            amount_out,
            min_amount_out,
            "swap below minimum output"
        );
        return Err(AmmError::SlippageExceeded {
            actual: amount_out,
            minimum: min_amount_out,
        });
    }

    debug!(pool = %pool.id(), amount_in, amount_out, "exact-in swap quoted");
    Ok(SwapPlan {
        side_in: orientation.side_in,
        asset_in: orientation.asset_in,
        asset_out: orientation.asset_out,
        amount_in,
        amount_out,
    })
}

/// Quote an exact-output swap and enforce the caller's maximum input
pub fn plan_exact_out(
    pool: &Pool,
    asset_in: &AssetId,
    amount_out: u128,
    max_amount_in: u128,
) -> Result<SwapPlan> {
    let orientation = pool.orient(asset_in)?;
    let amount_in =
        ConstantProductMath::quote_in(amount_out, orientation.reserve_in, orientation.reserve_out)?;

    if amount_in > max_amount_in {
        warn!(
            pool = %pool.id(),
            amount_in,
            amount_out,
            max_amount_in,
            "swap requires more than maximum input"
        );
        return Err(AmmError::ExcessiveInput {
            required: amount_in,
            maximum: max_amount_in,
        });
    }

    debug!(pool = %pool.id(), amount_in, amount_out, "exact-out swap quoted");
    Ok(SwapPlan {
        side_in: orientation.side_in,
        asset_in: orientation.asset_in,
        asset_out: orientation.asset_out,
        amount_in,
        amount_out,
    })
}

/// Check `(bal_in*1000 - received*3) * bal_out*1000 >= r_in * r_out * 1000^2`
///
/// `received` is what custody actually gained on the input side, so assets
/// transferred in directly count as input.
pub fn verify_constant_product(
    reserve_in: u128,
    reserve_out: u128,
    balance_in: u128,
    balance_out: u128,
) -> Result<()> {
    for balance in [balance_in, balance_out] {
        if balance > MAX_RESERVE {
            return Err(AmmError::ReserveOverflow(balance));
        }
    }
    let received = balance_in.saturating_sub(reserve_in);

    let scale = U256::from(FEE_DENOMINATOR);
    let adjusted_in = U256::from(balance_in) * scale - U256::from(received) * U256::from(FEE_NUMERATOR);
    let adjusted_out = U256::from(balance_out) * scale;
    let before = U256::from(reserve_in) * U256::from(reserve_out) * scale * scale;

    if adjusted_in * adjusted_out < before {
        return Err(AmmError::ConstantProductViolated);
    }
    Ok(())
}

/// Verify the invariant over post-settlement custody and adopt it as reserves
///
/// The accumulator advances over the pre-swap reserves first.
pub fn settle(pool: &mut Pool, plan: &SwapPlan, balance_a: u128, balance_b: u128, now: u64) -> Result<()> {
    let (reserve_a, reserve_b) = pool.reserves();
    let verified = match plan.side_in {
        Side::A => verify_constant_product(reserve_a, reserve_b, balance_a, balance_b),
        Side::B => verify_constant_product(reserve_b, reserve_a, balance_b, balance_a),
    };
    if let Err(e) = verified {
        warn!(pool = %pool.id(), error = %e, "swap settlement rejected");
        return Err(e);
    }

    pool.resync(balance_a, balance_b, now)
}
