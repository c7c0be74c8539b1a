//! Read-only pricing interface over a pool

use crate::error::{AmmError, Result};
use crate::math::{ConstantProductMath, FEE_DENOMINATOR, FEE_NUMERATOR};
use crate::pool::Pool;
use crate::types::AssetId;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Quoting against current reserves without mutating anything
pub trait PricedPool {
    /// Output for selling exactly `amount_in` of `asset_in`
    fn quote_exact_in(&self, asset_in: &AssetId, amount_in: u128) -> Result<u128>;

    /// Input of `asset_in` required to receive exactly `amount_out`
    fn quote_exact_out(&self, asset_in: &AssetId, amount_out: u128) -> Result<u128>;

    /// Marginal price of `base` in units of the other asset, before fees
    fn spot_price(&self, base: &AssetId) -> Result<Decimal>;

    /// Reserves as `(base, quote)`
    fn oriented_reserves(&self, base: &AssetId) -> Result<(u128, u128)>;

    /// Swap fee in basis points
    fn fee_bps(&self) -> u32 {
        (FEE_NUMERATOR * 10_000 / FEE_DENOMINATOR) as u32
    }
}

impl PricedPool for Pool {
    fn quote_exact_in(&self, asset_in: &AssetId, amount_in: u128) -> Result<u128> {
        let (reserve_in, reserve_out) = self.oriented_reserves(asset_in)?;
        ConstantProductMath::quote_out(amount_in, reserve_in, reserve_out)
    }

    fn quote_exact_out(&self, asset_in: &AssetId, amount_out: u128) -> Result<u128> {
        let (reserve_in, reserve_out) = self.oriented_reserves(asset_in)?;
        ConstantProductMath::quote_in(amount_out, reserve_in, reserve_out)
    }

    fn spot_price(&self, base: &AssetId) -> Result<Decimal> {
        let (reserve_base, reserve_quote) = self.oriented_reserves(base)?;
        if reserve_base == 0 || reserve_quote == 0 {
            return Err(AmmError::InsufficientLiquidity);
        }

        let base = Decimal::from_u128(reserve_base)
            .ok_or(AmmError::ArithmeticFault("reserve exceeds decimal range"))?;
        let quote = Decimal::from_u128(reserve_quote)
            .ok_or(AmmError::ArithmeticFault("reserve exceeds decimal range"))?;
        quote
            .checked_div(base)
            .ok_or(AmmError::ArithmeticFault("spot price out of decimal range"))
    }

    fn oriented_reserves(&self, base: &AssetId) -> Result<(u128, u128)> {
        let orientation = self.orient(base)?;
        Ok((orientation.reserve_in, orientation.reserve_out))
    }
}
