// SPDX-License-Identifier: GPL-3.0

//! Pallet and storage item names.

/// Pallet names.
pub mod pallets {
	pub const SYSTEM: &str = "System";
	pub const BALANCES: &str = "Balances";
	pub const TOKENS: &str = "Tokens";
	pub const EQ_BALANCES: &str = "EqBalances";
	pub const STAKING: &str = "Staking";
	pub const PROXY: &str = "Proxy";
	pub const NOMINATION_POOLS: &str = "NominationPools";
	/// Default instance name of the assets pallet.
	pub const ASSETS: &str = "Assets";
	/// Default pallet name of the bags list, used for local keys of bag list nodes.
	pub const BAGS_LIST: &str = "BagsList";
	/// Names under which the bags list pallet is deployed across chains.
	pub const BAGS_LIST_MODULES: [&str; 3] = ["VoterList", "BagsList", "VoterBagsList"];
}

/// Storage item names.
pub mod items {
	pub const ACCOUNT: &str = "Account";
	pub const ASSET: &str = "Asset";
	pub const LOCKS: &str = "Locks";
	pub const HOLDS: &str = "Holds";
	pub const FREEZES: &str = "Freezes";
	pub const ACCOUNTS: &str = "Accounts";
	pub const RESERVED: &str = "Reserved";
	pub const LOCKED: &str = "Locked";
	pub const BONDED: &str = "Bonded";
	pub const LEDGER: &str = "Ledger";
	pub const NOMINATORS: &str = "Nominators";
	pub const VALIDATORS: &str = "Validators";
	pub const PAYEE: &str = "Payee";
	pub const LIST_NODES: &str = "ListNodes";
	pub const PROXIES: &str = "Proxies";
	pub const POOL_MEMBERS: &str = "PoolMembers";
	pub const BONDED_POOLS: &str = "BondedPools";
	pub const REWARD_POOLS: &str = "RewardPools";
	pub const SUB_POOLS_STORAGE: &str = "SubPoolsStorage";
	pub const MAX_POOL_MEMBERS_PER_POOL: &str = "MaxPoolMembersPerPool";
}
