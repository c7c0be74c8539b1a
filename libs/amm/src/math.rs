//! Constant product AMM math with exact integer rounding
//!
//! All intermediate products are computed in 256 bits, so u128 inputs never
//! wrap. Rounding always favours the pool: outputs round down, required
//! inputs round up.

use crate::error::{AmmError, Result};

#[allow(clippy::manual_div_ceil, clippy::assign_op_pattern)]
mod wide {
    uint::construct_uint! {
        /// 256-bit unsigned integer for intermediate products and accumulators
        pub struct U256(4);
    }
}

pub use wide::U256;

/// Fee charged on every swap input: 3/1000 = 0.3%
pub const FEE_NUMERATOR: u128 = 3;
pub const FEE_DENOMINATOR: u128 = 1000;
/// Share of the input that reaches the curve (997/1000)
pub const FEE_RETAINED: u128 = FEE_DENOMINATOR - FEE_NUMERATOR;

/// Shares permanently locked by the first deposit
pub const MINIMUM_LIQUIDITY: u128 = 1000;

/// Fractional bits of the UQ112x112 price encoding
pub const RESOLUTION: usize = 112;
/// 2^112
pub const Q112: U256 = U256([0, 1 << 48, 0, 0]);

/// Largest reserve a pool can hold (2^112 - 1)
pub const MAX_RESERVE: u128 = (1u128 << 112) - 1;

/// Accumulator timestamps wrap at 2^32
pub const TIMESTAMP_MODULUS: u64 = 1 << 32;

/// Constant product math functions
pub struct ConstantProductMath;

impl ConstantProductMath {
    /// `floor(sqrt(n))` via the Babylonian method
    pub fn integer_sqrt(n: U256) -> U256 {
        if n > U256::from(3u8) {
            let mut z = n;
            let mut x = n / 2 + 1;
            while x < z {
                z = x;
                x = (n / x + x) / 2;
            }
            z
        } else if !n.is_zero() {
            U256::one()
        } else {
            U256::zero()
        }
    }

    pub fn min_of(a: u128, b: u128) -> u128 {
        if a < b {
            a
        } else {
            b
        }
    }

    /// `floor(a * b / denominator)` without intermediate overflow
    pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128> {
        if denominator == 0 {
            return Err(AmmError::ArithmeticFault("division by zero"));
        }
        let product = U256::from(a) * U256::from(b);
        Self::narrow(product / U256::from(denominator), "mul_div result exceeds u128")
    }

    /// Amount of the other asset matching `amount_a` at the current ratio
    pub fn quote(amount_a: u128, reserve_a: u128, reserve_b: u128) -> Result<u128> {
        if amount_a == 0 {
            return Err(AmmError::InsufficientAmount);
        }
        if reserve_a == 0 || reserve_b == 0 {
            return Err(AmmError::InsufficientLiquidity);
        }
        Self::mul_div(amount_a, reserve_b, reserve_a)
    }

    /// Output for an exact input after the 0.3% fee
    ///
    /// `amount_out = floor(amount_in * 997 * reserve_out / (reserve_in * 1000 + amount_in * 997))`
    pub fn quote_out(amount_in: u128, reserve_in: u128, reserve_out: u128) -> Result<u128> {
        if amount_in == 0 {
            return Err(AmmError::InsufficientInput);
        }
        if reserve_in == 0 || reserve_out == 0 {
            return Err(AmmError::InsufficientLiquidity);
        }

        let amount_in_with_fee = U256::from(amount_in) * U256::from(FEE_RETAINED);
        let numerator = amount_in_with_fee
            .checked_mul(U256::from(reserve_out))
            .ok_or(AmmError::ArithmeticFault("quote_out numerator overflow"))?;
        let denominator = U256::from(reserve_in) * U256::from(FEE_DENOMINATOR) + amount_in_with_fee;

        Self::narrow(numerator / denominator, "quote_out result exceeds u128")
    }

    /// Input required for an exact output, rounded up in the pool's favour
    ///
    /// `amount_in = floor(reserve_in * amount_out * 1000 / ((reserve_out - amount_out) * 997)) + 1`
    pub fn quote_in(amount_out: u128, reserve_in: u128, reserve_out: u128) -> Result<u128> {
        if amount_out == 0 {
            return Err(AmmError::InsufficientOutput);
        }
        if reserve_in == 0 || reserve_out == 0 || amount_out >= reserve_out {
            return Err(AmmError::InsufficientLiquidity);
        }

        let numerator = (U256::from(reserve_in) * U256::from(amount_out))
            .checked_mul(U256::from(FEE_DENOMINATOR))
            .ok_or(AmmError::ArithmeticFault("quote_in numerator overflow"))?;
        let denominator = U256::from(reserve_out - amount_out) * U256::from(FEE_RETAINED);

        Self::narrow(numerator / denominator + 1, "quote_in result exceeds u128")
    }

    pub(crate) fn narrow(value: U256, context: &'static str) -> Result<u128> {
        if value.bits() > 128 {
            tracing::error!(%value, context, "256-bit result does not fit in u128");
            return Err(AmmError::ArithmeticFault(context));
        }
        Ok(value.low_u128())
    }
}
