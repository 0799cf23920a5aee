// SPDX-License-Identifier: GPL-3.0

//! `pallet-assets` balances.
//!
//! The balance of an account depends on two entries: the account entry of the asset and the
//! asset's details (which may freeze the whole asset). Both handlers feed an
//! [`AssetsBalanceUpdater`] that derives the balance once it has seen each entry at least once.

use super::{
	BalanceContext, RawStorageHandlingFactory, StorageChildHandler, SubscriptionHandlingFactory,
	persist_raw,
};
use crate::{
	error::HandlerError,
	models::AssetBalance,
	store::PersistenceStore,
	types::{BlockHash, ChainAssetId},
	values::{AssetAccount, AssetDetails, AssetStatus},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use scale::Decode;
use std::{collections::HashMap, sync::Arc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetsStorageKind {
	/// `<pallet>.Account`
	Account,
	/// `<pallet>.Asset`
	Details,
}

/// Latest value of each entry. The outer `Option` tells whether the entry was received yet.
#[derive(Default)]
struct AssetsState {
	account: Option<Option<Vec<u8>>>,
	details: Option<Option<Vec<u8>>>,
}

/// Merges the account and details entries of one asset into a balance.
pub struct AssetsBalanceUpdater {
	chain_asset_id: ChainAssetId,
	context: BalanceContext,
	state: Mutex<AssetsState>,
}

impl AssetsBalanceUpdater {
	pub fn new(chain_asset_id: ChainAssetId, context: BalanceContext) -> Self {
		Self { chain_asset_id, context, state: Mutex::default() }
	}

	/// Record a new value of `kind` and update the balance when both entries are known.
	pub async fn update(
		&self,
		kind: AssetsStorageKind,
		value: Option<Vec<u8>>,
		block: Option<BlockHash>,
		store: &dyn PersistenceStore,
	) -> Result<(), HandlerError> {
		let (account, details) = {
			let mut state = self.state.lock();
			match kind {
				AssetsStorageKind::Account => state.account = Some(value),
				AssetsStorageKind::Details => state.details = Some(value),
			}
			match (&state.account, &state.details) {
				(Some(account), Some(details)) => (account.clone(), details.clone()),
				_ => return Ok(()),
			}
		};

		let Some(account) = account else {
			return self.reset(store, block).await;
		};
		let label = self.chain_asset_id.to_string();
		let account = AssetAccount::decode(&mut &account[..]).map_err(|e| HandlerError::decode(&label, e))?;
		let asset_frozen = match details {
			Some(details) => {
				let account_len = self.context.account_id.as_bytes().len();
				AssetDetails::decode_status(&details, account_len)
					.map_err(|e| HandlerError::decode(&label, e))? ==
					AssetStatus::Frozen
			},
			None => false,
		};
		let balance = AssetBalance::from_assets_account(
			self.chain_asset_id.clone(),
			self.context.account_id.clone(),
			&account,
			asset_frozen,
		);
		self.context.update_balance(store, &balance, block).await?;
		Ok(())
	}

	/// The account entry is gone: zero an existing balance, otherwise leave nothing behind.
	async fn reset(&self, store: &dyn PersistenceStore, block: Option<BlockHash>) -> Result<(), HandlerError> {
		if self.context.balance(store, &self.chain_asset_id).await?.is_some() {
			let empty = AssetBalance::empty(self.chain_asset_id.clone(), self.context.account_id.clone());
			self.context.update_balance(store, &empty, block).await?;
		} else {
			store.delete(&AssetBalance::storage_key(&self.chain_asset_id, &self.context.account_id)).await?;
		}
		Ok(())
	}
}

/// Handlers for one `pallet-assets` asset.
#[derive(Clone)]
pub struct AssetsPalletHandlingFactory {
	updater: Arc<AssetsBalanceUpdater>,
	kinds: HashMap<String, AssetsStorageKind>,
}

impl AssetsPalletHandlingFactory {
	pub fn new(updater: Arc<AssetsBalanceUpdater>) -> Self {
		Self { updater, kinds: HashMap::new() }
	}

	pub fn with_kind(mut self, local_key: impl Into<String>, kind: AssetsStorageKind) -> Self {
		self.kinds.insert(local_key.into(), kind);
		self
	}
}

struct AssetsHandler {
	kind: AssetsStorageKind,
	local_key: String,
	updater: Arc<AssetsBalanceUpdater>,
	store: Arc<dyn PersistenceStore>,
}

#[async_trait]
impl StorageChildHandler for AssetsHandler {
	async fn handle(
		&self,
		value: Option<Vec<u8>>,
		block: Option<BlockHash>,
	) -> Result<(), HandlerError> {
		persist_raw(self.store.as_ref(), &self.local_key, value.as_deref()).await?;
		self.updater.update(self.kind, value, block, self.store.as_ref()).await
	}
}

impl SubscriptionHandlingFactory for AssetsPalletHandlingFactory {
	fn create_handler(
		&self,
		remote_key: &[u8],
		local_key: &str,
		store: Arc<dyn PersistenceStore>,
	) -> Arc<dyn StorageChildHandler> {
		let Some(kind) = self.kinds.get(local_key).copied() else {
			log::warn!("No assets storage kind registered for {local_key}");
			return RawStorageHandlingFactory.create_handler(remote_key, local_key, store);
		};
		Arc::new(AssetsHandler {
			kind,
			local_key: local_key.to_string(),
			updater: self.updater.clone(),
			store,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		events::EventCenter,
		values::AssetAccountStatus,
		store::MemoryStore,
		testing::ALICE,
		types::{AccountId, ChainId},
	};
	use scale::Encode;

	fn details(status: AssetStatus) -> Vec<u8> {
		details_of::<[u8; 32]>([0; 32], status)
	}

	fn details_of<A: Encode + Copy>(account: A, status: AssetStatus) -> Vec<u8> {
		AssetDetails {
			owner: account,
			issuer: account,
			admin: account,
			freezer: account,
			supply: 1_000,
			deposit: 0,
			min_balance: 1,
			is_sufficient: true,
			accounts: 1,
			sufficients: 1,
			approvals: 0,
			status,
		}
		.encode()
	}

	fn setup() -> (AssetsPalletHandlingFactory, Arc<MemoryStore>, String) {
		setup_for(ChainId::new("asset-hub"), AccountId::from(ALICE))
	}

	fn setup_for(chain_id: ChainId, account: AccountId) -> (AssetsPalletHandlingFactory, Arc<MemoryStore>, String) {
		let chain_asset_id = ChainAssetId::new(chain_id, 1);
		let key = AssetBalance::storage_key(&chain_asset_id, &account);
		let updater = Arc::new(AssetsBalanceUpdater::new(
			chain_asset_id,
			BalanceContext::new(account, EventCenter::default(), None),
		));
		let factory = AssetsPalletHandlingFactory::new(updater)
			.with_kind("account", AssetsStorageKind::Account)
			.with_kind("details", AssetsStorageKind::Details);
		(factory, Arc::new(MemoryStore::new()), key)
	}

	fn stored(store: &MemoryStore, key: &str) -> Option<AssetBalance> {
		store.value(key).map(|bytes| serde_json::from_slice(&bytes).unwrap())
	}

	#[tokio::test]
	async fn waits_for_both_entries() {
		let (factory, store, key) = setup();
		let account = AssetAccount { balance: 70, status: AssetAccountStatus::Liquid };
		factory
			.create_handler(&[0], "account", store.clone())
			.handle(Some(account.encode()), None)
			.await
			.unwrap();
		assert!(stored(&store, &key).is_none());

		factory
			.create_handler(&[1], "details", store.clone())
			.handle(Some(details(AssetStatus::Live)), None)
			.await
			.unwrap();
		let balance = stored(&store, &key).unwrap();
		assert_eq!((balance.free, balance.frozen, balance.blocked), (70, 0, 0));
	}

	#[tokio::test]
	async fn frozen_asset_freezes_balance() {
		let (factory, store, key) = setup();
		let account = AssetAccount { balance: 70, status: AssetAccountStatus::Liquid };
		factory.create_handler(&[1], "details", store.clone()).handle(Some(details(AssetStatus::Frozen)), None).await.unwrap();
		factory.create_handler(&[0], "account", store.clone()).handle(Some(account.encode()), None).await.unwrap();

		let balance = stored(&store, &key).unwrap();
		assert_eq!((balance.frozen, balance.blocked), (70, 70));
		assert_eq!(balance.transferable(), 0);
	}

	#[tokio::test]
	async fn frozen_account_freezes_balance() {
		let (factory, store, key) = setup();
		let account = AssetAccount { balance: 9, status: AssetAccountStatus::Blocked };
		factory.create_handler(&[1], "details", store.clone()).handle(None, None).await.unwrap();
		factory.create_handler(&[0], "account", store.clone()).handle(Some(account.encode()), None).await.unwrap();
		assert_eq!(stored(&store, &key).unwrap().frozen, 9);
	}

	#[tokio::test]
	async fn missing_account_zeroes_existing_balance() {
		let (factory, store, key) = setup();
		let account = AssetAccount { balance: 70, status: AssetAccountStatus::Liquid };
		let account_handler = factory.create_handler(&[0], "account", store.clone());
		factory.create_handler(&[1], "details", store.clone()).handle(Some(details(AssetStatus::Live)), None).await.unwrap();

		account_handler.handle(None, None).await.unwrap();
		assert!(stored(&store, &key).is_none());

		account_handler.handle(Some(account.encode()), None).await.unwrap();
		account_handler.handle(None, None).await.unwrap();
		assert_eq!(stored(&store, &key).unwrap().free, 0);
	}

	#[tokio::test]
	async fn details_decode_with_twenty_byte_accounts() {
		let (factory, store, key) = setup_for(ChainId::new("moonbeam"), AccountId::new([7; 20]));
		let account = AssetAccount { balance: 15, status: AssetAccountStatus::Liquid };
		factory
			.create_handler(&[1], "details", store.clone())
			.handle(Some(details_of([7u8; 20], AssetStatus::Frozen)), None)
			.await
			.unwrap();
		factory.create_handler(&[0], "account", store.clone()).handle(Some(account.encode()), None).await.unwrap();

		let balance = stored(&store, &key).unwrap();
		assert_eq!((balance.free, balance.frozen), (15, 15));
	}

	#[test]
	fn details_status_rejects_unknown_account_widths() {
		assert_eq!(AssetDetails::decode_status(&details(AssetStatus::Live), 32), Ok(AssetStatus::Live));
		assert!(AssetDetails::decode_status(&details(AssetStatus::Live), 16).is_err());
	}
}
