// SPDX-License-Identifier: GPL-3.0

//! ORML `Tokens` balances.

use super::{
	BalanceContext, RawStorageHandlingFactory, StorageChildHandler, SubscriptionHandlingFactory,
	native::decode_or_empty, persist_raw,
};
use crate::{
	error::HandlerError,
	models::{AssetBalance, AssetLock},
	store::PersistenceStore,
	types::{BlockHash, ChainAssetId},
	values::{OrmlAccountData, OrmlBalanceLock},
};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrmlStorageKind {
	/// `Tokens.Accounts`
	Accounts,
	/// `Tokens.Locks`
	Locks,
}

/// Handlers for one ORML currency.
#[derive(Clone)]
pub struct OrmlTokenHandlingFactory {
	chain_asset_id: ChainAssetId,
	context: BalanceContext,
	kinds: HashMap<String, OrmlStorageKind>,
}

impl OrmlTokenHandlingFactory {
	pub fn new(chain_asset_id: ChainAssetId, context: BalanceContext) -> Self {
		Self { chain_asset_id, context, kinds: HashMap::new() }
	}

	pub fn with_kind(mut self, local_key: impl Into<String>, kind: OrmlStorageKind) -> Self {
		self.kinds.insert(local_key.into(), kind);
		self
	}
}

struct OrmlHandler {
	kind: OrmlStorageKind,
	local_key: String,
	chain_asset_id: ChainAssetId,
	context: BalanceContext,
	store: Arc<dyn PersistenceStore>,
}

#[async_trait]
impl StorageChildHandler for OrmlHandler {
	async fn handle(
		&self,
		value: Option<Vec<u8>>,
		block: Option<BlockHash>,
	) -> Result<(), HandlerError> {
		let store = self.store.as_ref();
		persist_raw(store, &self.local_key, value.as_deref()).await?;
		let value = value.unwrap_or_default();
		match self.kind {
			OrmlStorageKind::Accounts => {
				let data = decode_or_empty::<OrmlAccountData>(&value, &self.local_key)?;
				let balance = AssetBalance::from_orml(
					self.chain_asset_id.clone(),
					self.context.account_id.clone(),
					&data,
				);
				self.context.update_balance(store, &balance, block).await?;
			},
			OrmlStorageKind::Locks => {
				let locks = decode_or_empty::<Vec<OrmlBalanceLock>>(&value, &self.local_key)?;
				let locks: Vec<AssetLock> = locks.iter().map(AssetLock::from).collect();
				self.context.update_locks(store, &self.chain_asset_id, &locks).await?;
			},
		}
		Ok(())
	}
}

impl SubscriptionHandlingFactory for OrmlTokenHandlingFactory {
	fn create_handler(
		&self,
		remote_key: &[u8],
		local_key: &str,
		store: Arc<dyn PersistenceStore>,
	) -> Arc<dyn StorageChildHandler> {
		let Some(kind) = self.kinds.get(local_key).copied() else {
			log::warn!("No ORML storage kind registered for {local_key}");
			return RawStorageHandlingFactory.create_handler(remote_key, local_key, store);
		};
		Arc::new(OrmlHandler {
			kind,
			local_key: local_key.to_string(),
			chain_asset_id: self.chain_asset_id.clone(),
			context: self.context.clone(),
			store,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		events::EventCenter,
		store::MemoryStore,
		testing::ALICE,
		types::{AccountId, ChainId},
	};
	use scale::Encode;

	#[tokio::test]
	async fn accounts_and_locks_are_persisted() {
		let chain_asset_id = ChainAssetId::new(ChainId::new("karura"), 4);
		let account = AccountId::from(ALICE);
		let factory = OrmlTokenHandlingFactory::new(
			chain_asset_id.clone(),
			BalanceContext::new(account.clone(), EventCenter::default(), None),
		)
		.with_kind("accounts", OrmlStorageKind::Accounts)
		.with_kind("locks", OrmlStorageKind::Locks);
		let store = Arc::new(MemoryStore::new());

		let data = OrmlAccountData { free: 40, reserved: 5, frozen: 10 };
		factory
			.create_handler(&[0], "accounts", store.clone())
			.handle(Some(data.encode()), None)
			.await
			.unwrap();
		let locks = vec![OrmlBalanceLock { id: *b"ormlvest", amount: 10 }];
		factory
			.create_handler(&[1], "locks", store.clone())
			.handle(Some(locks.encode()), None)
			.await
			.unwrap();

		let balance: AssetBalance = serde_json::from_slice(
			&store.value(&AssetBalance::storage_key(&chain_asset_id, &account)).unwrap(),
		)
		.unwrap();
		assert_eq!((balance.free, balance.reserved, balance.frozen), (40, 5, 10));
		assert_eq!(balance.transferable(), 30);
		let stored: Vec<AssetLock> = serde_json::from_slice(
			&store.value(&AssetLock::storage_key(&chain_asset_id, &account)).unwrap(),
		)
		.unwrap();
		assert_eq!(stored[0].id, "ormlvest");
	}
}
