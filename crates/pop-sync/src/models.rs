// SPDX-License-Identifier: GPL-3.0

//! Balance records persisted by the domain handlers.

use crate::{
	strings::store::prefixes,
	types::{AccountId, ChainAssetId},
	values::{
		AccountData, AssetAccount, AssetAccountStatus, BalanceLock, EquilibriumLock, IdAmount,
		OrmlAccountData, OrmlBalanceLock,
	},
};
use serde::{Deserialize, Serialize};

/// How the transferable amount of a balance is derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransferableMode {
	/// `free - frozen`.
	#[default]
	Regular,
	/// `free - max(frozen - reserved, 0)`.
	Fungible,
}

/// Balance of an account for one chain asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
	pub chain_asset_id: ChainAssetId,
	pub account_id: AccountId,
	pub free: u128,
	pub reserved: u128,
	pub frozen: u128,
	pub blocked: u128,
	pub transferable_mode: TransferableMode,
}

impl AssetBalance {
	/// A zero balance.
	pub fn empty(chain_asset_id: ChainAssetId, account_id: AccountId) -> Self {
		Self {
			chain_asset_id,
			account_id,
			free: 0,
			reserved: 0,
			frozen: 0,
			blocked: 0,
			transferable_mode: TransferableMode::Regular,
		}
	}

	/// Balance of a native token account.
	pub fn from_account_data(
		chain_asset_id: ChainAssetId,
		account_id: AccountId,
		data: &AccountData,
	) -> Self {
		let transferable_mode = if data.uses_new_logic() {
			TransferableMode::Fungible
		} else {
			TransferableMode::Regular
		};
		Self {
			chain_asset_id,
			account_id,
			free: data.free,
			reserved: data.reserved,
			frozen: data.locked(),
			blocked: 0,
			transferable_mode,
		}
	}

	/// Balance of an ORML token account.
	pub fn from_orml(chain_asset_id: ChainAssetId, account_id: AccountId, data: &OrmlAccountData) -> Self {
		Self {
			free: data.free,
			reserved: data.reserved,
			frozen: data.frozen,
			..Self::empty(chain_asset_id, account_id)
		}
	}

	/// Balance of a `pallet-assets` account. A frozen account or asset locks the whole balance.
	pub fn from_assets_account(
		chain_asset_id: ChainAssetId,
		account_id: AccountId,
		account: &AssetAccount,
		asset_frozen: bool,
	) -> Self {
		let frozen = account.status != AssetAccountStatus::Liquid || asset_frozen;
		let locked = if frozen { account.balance } else { 0 };
		Self {
			free: account.balance,
			frozen: locked,
			blocked: locked,
			..Self::empty(chain_asset_id, account_id)
		}
	}

	/// Amount that can be transferred.
	pub fn transferable(&self) -> u128 {
		let locked = match self.transferable_mode {
			TransferableMode::Regular => self.frozen,
			TransferableMode::Fungible => self.frozen.saturating_sub(self.reserved),
		};
		self.free.saturating_sub(locked.max(self.blocked))
	}

	/// Total balance of the account.
	pub fn total(&self) -> u128 {
		self.free.saturating_add(self.reserved)
	}

	/// Key the balance is persisted under.
	pub fn storage_key(chain_asset_id: &ChainAssetId, account_id: &AccountId) -> String {
		record_key(prefixes::ASSET_BALANCE, chain_asset_id, account_id)
	}
}

/// A balance lock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLock {
	/// Lock identifier, e.g. `staking ` or `democrac`.
	pub id: String,
	pub amount: u128,
}

impl AssetLock {
	pub fn storage_key(chain_asset_id: &ChainAssetId, account_id: &AccountId) -> String {
		record_key(prefixes::ASSET_LOCKS, chain_asset_id, account_id)
	}
}

impl From<&BalanceLock> for AssetLock {
	fn from(lock: &BalanceLock) -> Self {
		Self { id: lock_id(&lock.id), amount: lock.amount }
	}
}

impl From<&EquilibriumLock> for AssetLock {
	fn from(lock: &EquilibriumLock) -> Self {
		Self { id: lock_id(&lock.id), amount: lock.amount }
	}
}

impl From<&OrmlBalanceLock> for AssetLock {
	fn from(lock: &OrmlBalanceLock) -> Self {
		Self { id: lock_id(&lock.id), amount: lock.amount }
	}
}

/// An amount held or frozen for a runtime-defined reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReason {
	/// `0x`-hex of the encoded reason.
	pub reason: String,
	pub amount: u128,
}

impl AssetReason {
	pub fn holds_key(chain_asset_id: &ChainAssetId, account_id: &AccountId) -> String {
		record_key(prefixes::ASSET_HOLDS, chain_asset_id, account_id)
	}

	pub fn freezes_key(chain_asset_id: &ChainAssetId, account_id: &AccountId) -> String {
		record_key(prefixes::ASSET_FREEZES, chain_asset_id, account_id)
	}
}

impl From<&IdAmount> for AssetReason {
	fn from(entry: &IdAmount) -> Self {
		Self { reason: format!("0x{}", hex::encode(&entry.id)), amount: entry.amount }
	}
}

fn record_key(prefix: &str, chain_asset_id: &ChainAssetId, account_id: &AccountId) -> String {
	format!("{prefix}:{chain_asset_id}:{account_id}")
}

fn lock_id(id: &[u8; 8]) -> String {
	String::from_utf8_lossy(id).trim_end_matches(['\0', ' ']).to_string()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::values::{LockReasons, NEW_LOGIC_FLAG};

	fn chain_asset() -> ChainAssetId {
		ChainAssetId::new("polkadot".into(), 0)
	}

	#[test]
	fn fungible_balances_discount_reserved_from_frozen() {
		let data = AccountData { free: 100, reserved: 30, frozen: 50, flags: NEW_LOGIC_FLAG };
		let balance = AssetBalance::from_account_data(chain_asset(), AccountId::new(vec![1]), &data);
		assert_eq!(balance.transferable_mode, TransferableMode::Fungible);
		assert_eq!(balance.transferable(), 80);
		assert_eq!(balance.total(), 130);
	}

	#[test]
	fn regular_balances_subtract_frozen() {
		let data = AccountData { free: 100, reserved: 30, frozen: 20, flags: 50 };
		let balance = AssetBalance::from_account_data(chain_asset(), AccountId::new(vec![1]), &data);
		assert_eq!(balance.frozen, 50);
		assert_eq!(balance.transferable(), 50);
	}

	#[test]
	fn lock_ids_are_trimmed() {
		let lock = BalanceLock { id: *b"vesting\0", amount: 5, reasons: LockReasons::All };
		assert_eq!(AssetLock::from(&lock).id, "vesting");
	}

	#[test]
	fn balance_round_trips_through_json() {
		let balance = AssetBalance::empty(chain_asset(), AccountId::new(vec![1, 2]));
		let json = serde_json::to_vec(&balance).unwrap();
		assert_eq!(serde_json::from_slice::<AssetBalance>(&json).unwrap(), balance);
	}

	#[test]
	fn storage_keys_include_asset_and_account() {
		let key = AssetBalance::storage_key(&chain_asset(), &AccountId::new(vec![0xab]));
		assert_eq!(key, "asset-balance:polkadot-0:0xab");
	}
}
