// SPDX-License-Identifier: GPL-3.0

//! Persistence and notification shared by the balance handlers.

use super::{load_record, store_record};
use crate::{
	error::HandlerError,
	events::{EventCenter, SyncEvent},
	models::{AssetBalance, AssetLock, AssetReason},
	store::PersistenceStore,
	transaction::TransactionSubscription,
	types::{AccountId, BlockHash, ChainAssetId},
};
use std::sync::Arc;

/// Account whose balances a set of handlers maintains, with the collaborators notified on change.
#[derive(Clone)]
pub struct BalanceContext {
	pub account_id: AccountId,
	pub events: EventCenter,
	pub transaction: Option<Arc<dyn TransactionSubscription>>,
}

impl BalanceContext {
	pub fn new(
		account_id: AccountId,
		events: EventCenter,
		transaction: Option<Arc<dyn TransactionSubscription>>,
	) -> Self {
		Self { account_id, events, transaction }
	}

	/// The stored balance of an asset.
	pub async fn balance(
		&self,
		store: &dyn PersistenceStore,
		chain_asset_id: &ChainAssetId,
	) -> Result<Option<AssetBalance>, HandlerError> {
		load_record(store, &AssetBalance::storage_key(chain_asset_id, &self.account_id)).await
	}

	/// Persist a balance. When it differs from the stored one, publish the change and hand the
	/// block to the transaction subscription.
	pub async fn update_balance(
		&self,
		store: &dyn PersistenceStore,
		balance: &AssetBalance,
		block: Option<BlockHash>,
	) -> Result<bool, HandlerError> {
		let key = AssetBalance::storage_key(&balance.chain_asset_id, &self.account_id);
		if !store_record(store, &key, balance).await? {
			return Ok(false);
		}
		log::trace!("Balance of {} changed for {}", self.account_id, balance.chain_asset_id);
		self.events.notify(SyncEvent::AssetBalanceChanged {
			chain_asset_id: balance.chain_asset_id.clone(),
			account_id: self.account_id.clone(),
			block,
		});
		if let (Some(block), Some(transaction)) = (block, &self.transaction) {
			transaction.process(block);
		}
		Ok(true)
	}

	pub async fn update_locks(
		&self,
		store: &dyn PersistenceStore,
		chain_asset_id: &ChainAssetId,
		locks: &[AssetLock],
	) -> Result<(), HandlerError> {
		let key = AssetLock::storage_key(chain_asset_id, &self.account_id);
		if store_record(store, &key, &locks).await? {
			self.events.notify(SyncEvent::LocksChanged {
				chain_asset_id: chain_asset_id.clone(),
				account_id: self.account_id.clone(),
			});
		}
		Ok(())
	}

	pub async fn update_holds(
		&self,
		store: &dyn PersistenceStore,
		chain_asset_id: &ChainAssetId,
		holds: &[AssetReason],
	) -> Result<(), HandlerError> {
		let key = AssetReason::holds_key(chain_asset_id, &self.account_id);
		if store_record(store, &key, &holds).await? {
			self.events.notify(SyncEvent::HoldsChanged {
				chain_asset_id: chain_asset_id.clone(),
				account_id: self.account_id.clone(),
			});
		}
		Ok(())
	}

	pub async fn update_freezes(
		&self,
		store: &dyn PersistenceStore,
		chain_asset_id: &ChainAssetId,
		freezes: &[AssetReason],
	) -> Result<(), HandlerError> {
		let key = AssetReason::freezes_key(chain_asset_id, &self.account_id);
		if store_record(store, &key, &freezes).await? {
			self.events.notify(SyncEvent::FreezesChanged {
				chain_asset_id: chain_asset_id.clone(),
				account_id: self.account_id.clone(),
			});
		}
		Ok(())
	}
}
