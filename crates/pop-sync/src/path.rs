// SPDX-License-Identifier: GPL-3.0

//! Logical storage paths, independent of how a chain encodes them.

use crate::strings::storage::{items, pallets};
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt};

/// A `(module, item)` pair naming a storage entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoragePath {
	pub module: Cow<'static, str>,
	pub item: Cow<'static, str>,
}

impl StoragePath {
	/// A path known at compile time.
	pub const fn new(module: &'static str, item: &'static str) -> Self {
		Self { module: Cow::Borrowed(module), item: Cow::Borrowed(item) }
	}

	/// A path whose module name is only known at runtime, e.g. an instance of the assets pallet.
	pub fn dynamic(module: impl Into<String>, item: &'static str) -> Self {
		Self { module: Cow::Owned(module.into()), item: Cow::Borrowed(item) }
	}

	pub const SYSTEM_ACCOUNT: StoragePath = StoragePath::new(pallets::SYSTEM, items::ACCOUNT);
	pub const BALANCES_LOCKS: StoragePath = StoragePath::new(pallets::BALANCES, items::LOCKS);
	pub const BALANCES_HOLDS: StoragePath = StoragePath::new(pallets::BALANCES, items::HOLDS);
	pub const BALANCES_FREEZES: StoragePath = StoragePath::new(pallets::BALANCES, items::FREEZES);
	pub const ORML_ACCOUNTS: StoragePath = StoragePath::new(pallets::TOKENS, items::ACCOUNTS);
	pub const ORML_LOCKS: StoragePath = StoragePath::new(pallets::TOKENS, items::LOCKS);
	pub const EQUILIBRIUM_RESERVED: StoragePath =
		StoragePath::new(pallets::EQ_BALANCES, items::RESERVED);
	pub const EQUILIBRIUM_LOCKED: StoragePath = StoragePath::new(pallets::EQ_BALANCES, items::LOCKED);
	pub const STAKING_BONDED: StoragePath = StoragePath::new(pallets::STAKING, items::BONDED);
	pub const STAKING_LEDGER: StoragePath = StoragePath::new(pallets::STAKING, items::LEDGER);
	pub const STAKING_NOMINATORS: StoragePath =
		StoragePath::new(pallets::STAKING, items::NOMINATORS);
	pub const STAKING_VALIDATORS: StoragePath =
		StoragePath::new(pallets::STAKING, items::VALIDATORS);
	pub const STAKING_PAYEE: StoragePath = StoragePath::new(pallets::STAKING, items::PAYEE);
	pub const PROXY_PROXIES: StoragePath = StoragePath::new(pallets::PROXY, items::PROXIES);
	pub const POOL_MEMBERS: StoragePath =
		StoragePath::new(pallets::NOMINATION_POOLS, items::POOL_MEMBERS);
	pub const BONDED_POOLS: StoragePath =
		StoragePath::new(pallets::NOMINATION_POOLS, items::BONDED_POOLS);
	pub const REWARD_POOLS: StoragePath =
		StoragePath::new(pallets::NOMINATION_POOLS, items::REWARD_POOLS);
	pub const SUB_POOLS: StoragePath =
		StoragePath::new(pallets::NOMINATION_POOLS, items::SUB_POOLS_STORAGE);
	pub const MAX_POOL_MEMBERS_PER_POOL: StoragePath =
		StoragePath::new(pallets::NOMINATION_POOLS, items::MAX_POOL_MEMBERS_PER_POOL);
	/// Local path under which bag list nodes are stored whatever the pallet is called on chain.
	pub const DEFAULT_BAG_LIST_NODE: StoragePath =
		StoragePath::new(pallets::BAGS_LIST, items::LIST_NODES);

	/// `Account` entry of an assets pallet instance.
	pub fn assets_account(pallet: &str) -> Self {
		Self::dynamic(pallet, items::ACCOUNT)
	}

	/// `Asset` (details) entry of an assets pallet instance.
	pub fn assets_details(pallet: &str) -> Self {
		Self::dynamic(pallet, items::ASSET)
	}

	/// `ListNodes` entry of a bags list pallet deployed under `module`.
	pub fn bag_list_node(module: &str) -> Self {
		Self::dynamic(module, items::LIST_NODES)
	}
}

impl fmt::Display for StoragePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}", self.module, self.item)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dynamic_paths_equal_static_ones() {
		assert_eq!(StoragePath::assets_account("System"), StoragePath::SYSTEM_ACCOUNT);
		assert_eq!(StoragePath::bag_list_node("BagsList"), StoragePath::DEFAULT_BAG_LIST_NODE);
	}

	#[test]
	fn displays_module_and_item() {
		assert_eq!(StoragePath::BALANCES_LOCKS.to_string(), "Balances.Locks");
	}
}
