// SPDX-License-Identifier: GPL-3.0

//! Identifiers shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use subxt::config::substrate::H256;

/// Hash of the block a storage change was observed at.
pub type BlockHash = H256;

/// Identifier of an asset within a chain's configuration.
pub type AssetId = u32;

/// Identifier of a chain, usually its genesis hash in hex.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
	/// Create a chain identifier.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// The identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ChainId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

/// Raw account identifier (32 bytes for substrate accounts, 20 for ethereum ones).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Vec<u8>);

impl AccountId {
	/// Wrap raw account bytes.
	pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
		Self(bytes.into())
	}

	/// The raw account bytes.
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// `0x`-prefixed hex representation.
	pub fn to_hex(&self) -> String {
		format!("0x{}", hex::encode(&self.0))
	}
}

impl fmt::Display for AccountId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex())
	}
}

impl fmt::Debug for AccountId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "AccountId({})", self.to_hex())
	}
}

impl From<[u8; 32]> for AccountId {
	fn from(value: [u8; 32]) -> Self {
		Self(value.to_vec())
	}
}

/// An asset on a specific chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainAssetId {
	pub chain_id: ChainId,
	pub asset_id: AssetId,
}

impl ChainAssetId {
	pub fn new(chain_id: ChainId, asset_id: AssetId) -> Self {
		Self { chain_id, asset_id }
	}
}

impl fmt::Display for ChainAssetId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}", self.chain_id, self.asset_id)
	}
}

/// Identifier handed out for every logical attachment to a remote subscription.
///
/// The same identifier must be presented to detach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
	/// Allocate a fresh random identifier.
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for SubscriptionId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for SubscriptionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}
