//! Engine error types
//!
//! Every failure is a synchronous rejection that leaves pools, shares,
//! accumulators and custody exactly as they were before the call.

use crate::types::{AccountId, AssetId, PoolId};
use thiserror::Error;

pub type Result<T, E = AmmError> = std::result::Result<T, E>;

/// Failure category, used by callers to decide whether to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request; never retried automatically
    InputValidation,
    /// Pool state does not permit the request; re-query and retry
    StatePrecondition,
    /// Economic bound violated; retry with adjusted bounds or abandon
    Slippage,
    /// Logic defect; should be unreachable
    Arithmetic,
    /// The transfer capability refused a movement
    Custody,
}

/// Errors raised by the asset transfer capability
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Insufficient balance of {asset} in {holder}: available {available}, requested {requested}")]
    InsufficientBalance {
        asset: AssetId,
        holder: AccountId,
        available: u128,
        requested: u128,
    },

    #[error("Account {0} is frozen")]
    Frozen(AccountId),

    #[error("Balance of {asset} in {holder} would overflow")]
    BalanceOverflow { asset: AssetId, holder: AccountId },
}

/// Unified engine error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmmError {
    #[error("Pool assets must differ")]
    IdenticalAssets,

    #[error("Null asset identifier")]
    ZeroAsset,

    #[error("Pool {0} already exists")]
    PoolAlreadyExists(PoolId),

    #[error("Pool {0} not found")]
    PoolNotFound(PoolId),

    #[error("Asset {asset} is not traded by pool {pool}")]
    InvalidAsset { pool: PoolId, asset: AssetId },

    #[error("Input amount must be positive")]
    InsufficientInput,

    #[error("Output amount must be positive")]
    InsufficientOutput,

    #[error("Amount must be positive")]
    InsufficientAmount,

    #[error("Recipient {0} is the pool's own custody account")]
    InvalidRecipient(AccountId),

    #[error("Insufficient liquidity for the requested amounts")]
    InsufficientLiquidity,

    #[error("Asset A amount {actual} below minimum {minimum}")]
    SlippageA { actual: u128, minimum: u128 },

    #[error("Asset B amount {actual} below minimum {minimum}")]
    SlippageB { actual: u128, minimum: u128 },

    #[error("Output {actual} below minimum {minimum}")]
    SlippageExceeded { actual: u128, minimum: u128 },

    #[error("Required input {required} exceeds maximum {maximum}")]
    ExcessiveInput { required: u128, maximum: u128 },

    #[error("Deposit mints zero liquidity shares")]
    ZeroLiquidityMinted,

    #[error("Withdrawal returns zero of an asset")]
    ZeroLiquidityBurned,

    #[error("Account {owner} holds {available} shares, requested {requested}")]
    InsufficientShares {
        owner: AccountId,
        available: u128,
        requested: u128,
    },

    #[error("Genesis liquidity is locked and cannot be moved")]
    LockedLiquidity,

    #[error("Pool {0} is locked by an operation in progress")]
    Locked(PoolId),

    #[error("Reserve {0} exceeds the 112-bit reserve limit")]
    ReserveOverflow(u128),

    #[error("Constant product decreased across swap")]
    ConstantProductViolated,

    #[error("Observation window is empty")]
    EmptyObservationWindow,

    #[error("Arithmetic fault: {0}")]
    ArithmeticFault(&'static str),

    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

impl AmmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AmmError::IdenticalAssets
            | AmmError::ZeroAsset
            | AmmError::InvalidAsset { .. }
            | AmmError::InvalidRecipient(_)
            | AmmError::InsufficientInput
            | AmmError::InsufficientOutput
            | AmmError::InsufficientAmount
            | AmmError::ZeroLiquidityMinted
            | AmmError::ZeroLiquidityBurned
            | AmmError::LockedLiquidity
            | AmmError::EmptyObservationWindow => ErrorKind::InputValidation,

            AmmError::PoolAlreadyExists(_)
            | AmmError::PoolNotFound(_)
            | AmmError::InsufficientLiquidity
            | AmmError::InsufficientShares { .. }
            | AmmError::Locked(_)
            | AmmError::ReserveOverflow(_) => ErrorKind::StatePrecondition,

            AmmError::SlippageA { .. }
            | AmmError::SlippageB { .. }
            | AmmError::SlippageExceeded { .. }
            | AmmError::ExcessiveInput { .. } => ErrorKind::Slippage,

            AmmError::ConstantProductViolated | AmmError::ArithmeticFault(_) => {
                ErrorKind::Arithmetic
            }

            AmmError::Transfer(_) => ErrorKind::Custody,
        }
    }

    /// Whether re-submitting with fresh state or bounds can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Slippage | ErrorKind::StatePrecondition
        )
    }
}
