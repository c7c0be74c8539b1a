//! Asset, account and pool identifiers
//!
//! Assets and accounts are 20-byte address-like values. A pool is identified
//! by the Keccak-256 digest of its canonically ordered asset pair, so the same
//! unordered pair always maps to the same [`PoolId`].

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

macro_rules! address_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
        )]
        pub struct $name([u8; 20]);

        impl $name {
            /// The null identifier
            pub const ZERO: Self = Self([0u8; 20]);

            pub const fn new(bytes: [u8; 20]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 20] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 20]
            }
        }

        impl From<[u8; 20]> for $name {
            fn from(bytes: [u8; 20]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }
    };
}

address_id!(
    /// Identifier of a fungible asset. Byte order defines the canonical pair order.
    AssetId
);

address_id!(
    /// Identifier of a provider, trader, recipient or custody account.
    ///
    /// [`AccountId::ZERO`] owns the permanently locked genesis shares.
    AccountId
);

/// Deterministic pool identifier: `keccak256(asset_a ‖ asset_b)` in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId([u8; 32]);

impl PoolId {
    /// Derive the identifier for an unordered pair
    pub fn derive(x: AssetId, y: AssetId) -> Self {
        let (asset_a, asset_b) = sort_assets(x, y);

        let mut hasher = Keccak256::new();
        hasher.update(asset_a.as_bytes());
        hasher.update(asset_b.as_bytes());

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Account under which the pool custodies its assets (last 20 digest bytes)
    pub fn custody_account(&self) -> AccountId {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&self.0[12..]);
        AccountId::new(bytes)
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Order two assets so the smaller identifier comes first
pub fn sort_assets(x: AssetId, y: AssetId) -> (AssetId, AssetId) {
    if x <= y {
        (x, y)
    } else {
        (y, x)
    }
}
