// SPDX-License-Identifier: GPL-3.0

//! Storage key derivation.
//!
//! Three kinds of keys are involved in a remote subscription:
//!
//! - **Remote keys** ([`StorageKeyFactory`]): the raw storage keys sent to the node, derived from a
//!   storage path, the key parameters and the chain's runtime layout.
//! - **Local keys** ([`LocalStorageKeyFactory`]): strings naming where a decoded value is
//!   persisted. They only depend on the path, the parameters and the chain, never on the runtime.
//! - **Cache keys** ([`CacheKey`]): process-local deduplication keys grouping a set of storage
//!   paths under one physical subscription.

use crate::{
	coder::CoderFactory,
	error::KeyEncodingError,
	path::StoragePath,
	types::{AccountId, AssetId, ChainId},
};
use scale::Encode;
use sp_core::hashing::{blake2_128, blake2_256, twox_128};
use std::{collections::BTreeSet, fmt};

/// Builds remote storage keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct StorageKeyFactory;

impl StorageKeyFactory {
	/// The `twox128(module) ++ twox128(item)` prefix shared by every key of an entry.
	pub fn prefix(&self, path: &StoragePath) -> Vec<u8> {
		[twox_128(path.module.as_bytes()), twox_128(path.item.as_bytes())].concat()
	}

	/// Encode a remote storage key.
	///
	/// # Arguments
	/// * `path` - Storage entry the key belongs to.
	/// * `params` - Key parameters, already SCALE encoded, in declaration order.
	/// * `coder` - Coder factory of the chain the key targets.
	///
	/// # Returns
	/// The raw key, [`KeyEncodingError::PathNotInRuntime`] when the chain's runtime lacks the
	/// entry, or [`KeyEncodingError::ArityMismatch`] when the parameters don't fit its layout.
	pub fn encode(
		&self,
		path: &StoragePath,
		params: &[Vec<u8>],
		coder: &dyn CoderFactory,
	) -> Result<Vec<u8>, KeyEncodingError> {
		let layout = coder.entry_layout(path).ok_or_else(|| KeyEncodingError::PathNotInRuntime {
			module: path.module.to_string(),
			item: path.item.to_string(),
		})?;

		if layout.hashers.len() != params.len() {
			return Err(KeyEncodingError::ArityMismatch {
				path: path.to_string(),
				expected: layout.hashers.len(),
				actual: params.len(),
			});
		}

		let mut key = self.prefix(path);
		for (hasher, param) in layout.hashers.iter().zip(params) {
			key.extend(hasher.hash(param));
		}
		Ok(key)
	}
}

/// Builds local storage keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorageKeyFactory;

impl LocalStorageKeyFactory {
	/// Local key of an entry instance on a chain.
	///
	/// The key is `0x`-hex of `twox128(module) ++ twox128(item) ++ blake2_128(chain) ++ params`.
	pub fn create(&self, path: &StoragePath, params: &[Vec<u8>], chain_id: &ChainId) -> String {
		let mut key = StorageKeyFactory.prefix(path);
		key.extend(blake2_128(chain_id.as_str().as_bytes()));
		for param in params {
			key.extend_from_slice(param);
		}
		format!("0x{}", hex::encode(key))
	}

	/// Local key of an account-keyed entry on a chain.
	pub fn create_for_account(
		&self,
		path: &StoragePath,
		account: &AccountId,
		chain_id: &ChainId,
	) -> String {
		self.create(path, &[account.as_bytes().to_vec()], chain_id)
	}
}

/// Deduplication key of a remote subscription.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
	/// The key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for CacheKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for CacheKey {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl From<String> for CacheKey {
	fn from(value: String) -> Self {
		Self(value)
	}
}

/// Derives a [`CacheKey`] from the identity of a subscription.
///
/// Asset ids, paths and local keys are kept in sorted sets, so the order they are added in does
/// not matter. The key is `{prefix}-{hex(blake2_256(canonical encoding))}`.
///
/// # Example
///
/// ```ignore
/// let key = CacheKeyBuilder::new(strings::keys::BALANCES)
/// 	.account(&account)
/// 	.chain(&chain_id)
/// 	.assets([0, 1])
/// 	.paths([&StoragePath::SYSTEM_ACCOUNT, &StoragePath::BALANCES_LOCKS])
/// 	.build();
/// ```
#[derive(Clone, Debug)]
pub struct CacheKeyBuilder {
	prefix: &'static str,
	account: Option<Vec<u8>>,
	chain: Option<String>,
	assets: Option<BTreeSet<AssetId>>,
	paths: BTreeSet<(String, String)>,
	local_keys: BTreeSet<String>,
}

impl CacheKeyBuilder {
	/// Start a key for the subscription kind named by `prefix`.
	pub fn new(prefix: &'static str) -> Self {
		Self {
			prefix,
			account: None,
			chain: None,
			assets: None,
			paths: BTreeSet::new(),
			local_keys: BTreeSet::new(),
		}
	}

	/// Scope the key to an account.
	pub fn account(mut self, account: &AccountId) -> Self {
		self.account = Some(account.as_bytes().to_vec());
		self
	}

	/// Scope the key to a chain.
	pub fn chain(mut self, chain_id: &ChainId) -> Self {
		self.chain = Some(chain_id.as_str().to_string());
		self
	}

	/// Restrict the key to a set of assets. An empty set differs from no set at all.
	pub fn assets(mut self, assets: impl IntoIterator<Item = AssetId>) -> Self {
		self.assets.get_or_insert_with(BTreeSet::new).extend(assets);
		self
	}

	/// Add storage paths covered by the subscription.
	pub fn paths<'a>(mut self, paths: impl IntoIterator<Item = &'a StoragePath>) -> Self {
		self.paths
			.extend(paths.into_iter().map(|path| (path.module.to_string(), path.item.to_string())));
		self
	}

	/// Include local keys, which pin the exact entry instances (e.g. a controller account).
	pub fn local_keys<'a>(mut self, keys: impl IntoIterator<Item = &'a str>) -> Self {
		self.local_keys.extend(keys.into_iter().map(str::to_string));
		self
	}

	/// Hash the collected identity into a [`CacheKey`].
	pub fn build(self) -> CacheKey {
		let assets: Option<Vec<AssetId>> = self.assets.map(|set| set.into_iter().collect());
		let paths: Vec<(String, String)> = self.paths.into_iter().collect();
		let local_keys: Vec<String> = self.local_keys.into_iter().collect();
		let canonical =
			(self.prefix, self.account, self.chain, assets, paths, local_keys).encode();
		CacheKey(format!("{}-{}", self.prefix, hex::encode(blake2_256(&canonical))))
	}
}
