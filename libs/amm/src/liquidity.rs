//! Liquidity share accounting
//!
//! Shares are minted against what custody actually received (custodied
//! balance minus reserves), not against quoted amounts, and burned pro rata
//! against current custodied balances so accrued fees and any directly
//! transferred assets flow to all current holders.

use crate::error::{AmmError, Result};
use crate::math::{ConstantProductMath, MINIMUM_LIQUIDITY, U256};
use crate::pool::{check_reserves, Pool};
use crate::types::AccountId;
use tracing::debug;

/// Amounts to deposit so the pool ratio is preserved
///
/// An empty pool accepts the desired amounts unchanged: the first depositor
/// sets the initial price.
pub fn quote_deposit(
    pool: &Pool,
    desired_a: u128,
    desired_b: u128,
    min_a: u128,
    min_b: u128,
) -> Result<(u128, u128)> {
    let (reserve_a, reserve_b) = pool.reserves();
    if reserve_a == 0 && reserve_b == 0 {
        return Ok((desired_a, desired_b));
    }

    let optimal_b = ConstantProductMath::quote(desired_a, reserve_a, reserve_b)?;
    if optimal_b <= desired_b {
        if optimal_b < min_b {
            return Err(AmmError::SlippageB {
                actual: optimal_b,
                minimum: min_b,
            });
        }
        return Ok((desired_a, optimal_b));
    }

    let optimal_a = ConstantProductMath::quote(desired_b, reserve_b, reserve_a)?;
    if optimal_a > desired_a {
        // optimal_b > desired_b implies optimal_a <= desired_a
        return Err(AmmError::ArithmeticFault("deposit quote exceeds desired amount"));
    }
    if optimal_a < min_a {
        return Err(AmmError::SlippageA {
            actual: optimal_a,
            minimum: min_a,
        });
    }
    Ok((optimal_a, desired_b))
}

/// Shares a deposit would mint given post-deposit custodied balances
pub fn shares_for_deposit(pool: &Pool, balance_a: u128, balance_b: u128) -> Result<u128> {
    let (reserve_a, reserve_b) = pool.reserves();
    let deposited_a = balance_a
        .checked_sub(reserve_a)
        .ok_or(AmmError::ArithmeticFault("custodied balance A below reserve"))?;
    let deposited_b = balance_b
        .checked_sub(reserve_b)
        .ok_or(AmmError::ArithmeticFault("custodied balance B below reserve"))?;

    let total = pool.total_shares();
    let shares = if total == 0 {
        let root = ConstantProductMath::integer_sqrt(U256::from(deposited_a) * U256::from(deposited_b));
        let root = ConstantProductMath::narrow(root, "genesis liquidity exceeds u128")?;
        // sqrt == MINIMUM_LIQUIDITY mints nothing and is rejected
        root.saturating_sub(MINIMUM_LIQUIDITY)
    } else {
        ConstantProductMath::min_of(
            ConstantProductMath::mul_div(deposited_a, total, reserve_a)?,
            ConstantProductMath::mul_div(deposited_b, total, reserve_b)?,
        )
    };

    if shares == 0 {
        return Err(AmmError::ZeroLiquidityMinted);
    }
    Ok(shares)
}

/// Mint shares for assets already moved into custody
///
/// The genesis deposit also locks [`MINIMUM_LIQUIDITY`] shares under
/// [`AccountId::ZERO`]. Reserves are resynchronised to the custodied balances.
pub fn mint_shares(
    pool: &mut Pool,
    balance_a: u128,
    balance_b: u128,
    recipient: AccountId,
    now: u64,
) -> Result<u128> {
    let shares = shares_for_deposit(pool, balance_a, balance_b)?;
    // Shares are only credited once the reserves are known to fit
    check_reserves(balance_a, balance_b)?;

    if pool.total_shares() == 0 {
        pool.credit_shares(AccountId::ZERO, MINIMUM_LIQUIDITY)?;
    }
    pool.credit_shares(recipient, shares)?;
    pool.resync(balance_a, balance_b, now)?;

    debug!(
        pool = %pool.id(),
        recipient = %recipient,
        shares,
        total_shares = pool.total_shares(),
        "liquidity minted"
    );
    Ok(shares)
}

/// Debit `shares` from `owner` and return the pro-rata amounts owed
///
/// The caller transfers the amounts out and then resynchronises reserves.
pub fn burn_shares(
    pool: &mut Pool,
    owner: AccountId,
    shares: u128,
    balance_a: u128,
    balance_b: u128,
) -> Result<(u128, u128)> {
    if owner.is_zero() {
        return Err(AmmError::LockedLiquidity);
    }
    if shares == 0 {
        return Err(AmmError::ZeroLiquidityBurned);
    }

    let available = pool.shares_of(&owner);
    if available < shares {
        return Err(AmmError::InsufficientShares {
            owner,
            available,
            requested: shares,
        });
    }

    let total = pool.total_shares();
    let amount_a = ConstantProductMath::mul_div(shares, balance_a, total)?;
    let amount_b = ConstantProductMath::mul_div(shares, balance_b, total)?;
    if amount_a == 0 || amount_b == 0 {
        return Err(AmmError::ZeroLiquidityBurned);
    }

    pool.debit_shares(owner, shares)?;

    debug!(
        pool = %pool.id(),
        owner = %owner,
        shares,
        amount_a,
        amount_b,
        "liquidity burned"
    );
    Ok((amount_a, amount_b))
}

/// Move shares between providers
pub fn transfer_shares(
    pool: &mut Pool,
    from: AccountId,
    to: AccountId,
    shares: u128,
) -> Result<()> {
    if from.is_zero() {
        return Err(AmmError::LockedLiquidity);
    }
    if shares == 0 {
        return Err(AmmError::InsufficientAmount);
    }
    pool.debit_shares(from, shares)?;
    pool.credit_shares(to, shares)
}
