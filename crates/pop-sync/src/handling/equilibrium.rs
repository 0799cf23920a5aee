// SPDX-License-Identifier: GPL-3.0

//! Equilibrium balances.
//!
//! All balances of an equilibrium account live in its `System.Account` entry, with one
//! `EqBalances.Reserved` entry per currency on the side. `EqBalances.Locked` holds the locks of
//! the utility asset.

use super::{
	BalanceContext, RawStorageHandlingFactory, StorageChildHandler, SubscriptionHandlingFactory,
	persist_raw,
};
use crate::{
	error::HandlerError,
	models::{AssetBalance, AssetLock},
	store::PersistenceStore,
	types::{AssetId, BlockHash, ChainAssetId, ChainId},
	values::{EquilibriumAccountInfo, EquilibriumLock},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use scale::Decode;
use std::{collections::HashMap, sync::Arc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EquilibriumStorageKind {
	/// `System.Account`, holding every currency balance.
	Balances,
	/// `EqBalances.Reserved` of one equilibrium currency.
	Reserved(u64),
	/// `EqBalances.Locked`, the locks of the utility asset.
	Locks,
}

#[derive(Default)]
struct EquilibriumState {
	account: Option<Option<EquilibriumAccountInfo>>,
	reserved: HashMap<u64, u128>,
}

/// Merges the account entry with the reserved entries into one balance per asset.
pub struct EquilibriumBalanceUpdater {
	chain_id: ChainId,
	/// Equilibrium currency id to wallet asset id.
	assets: HashMap<u64, AssetId>,
	/// Asset the account lock applies to.
	utility_asset: Option<AssetId>,
	context: BalanceContext,
	state: Mutex<EquilibriumState>,
}

impl EquilibriumBalanceUpdater {
	pub fn new(
		chain_id: ChainId,
		assets: HashMap<u64, AssetId>,
		utility_asset: Option<AssetId>,
		context: BalanceContext,
	) -> Self {
		Self { chain_id, assets, utility_asset, context, state: Mutex::default() }
	}

	async fn update(
		&self,
		kind: EquilibriumStorageKind,
		local_key: &str,
		value: Option<Vec<u8>>,
		block: Option<BlockHash>,
		store: &dyn PersistenceStore,
	) -> Result<(), HandlerError> {
		let balances = match kind {
			EquilibriumStorageKind::Balances => {
				let account = value
					.map(|value| EquilibriumAccountInfo::decode(&mut &value[..]))
					.transpose()
					.map_err(|e| HandlerError::decode(local_key, e))?;
				let mut state = self.state.lock();
				state.account = Some(account);
				self.merge(&state)
			},
			EquilibriumStorageKind::Reserved(currency) => {
				let reserved = value
					.map(|value| u128::decode(&mut &value[..]))
					.transpose()
					.map_err(|e| HandlerError::decode(local_key, e))?
					.unwrap_or_default();
				let mut state = self.state.lock();
				state.reserved.insert(currency, reserved);
				self.merge(&state)
			},
			EquilibriumStorageKind::Locks => return self.update_locks(local_key, value, store).await,
		};

		for balance in &balances {
			self.context.update_balance(store, balance, block).await?;
		}
		Ok(())
	}

	async fn update_locks(
		&self,
		local_key: &str,
		value: Option<Vec<u8>>,
		store: &dyn PersistenceStore,
	) -> Result<(), HandlerError> {
		let Some(utility_asset) = self.utility_asset else {
			log::debug!("No utility asset on {}, ignoring its locks", self.chain_id);
			return Ok(());
		};
		let locks = value
			.map(|value| Vec::<EquilibriumLock>::decode(&mut &value[..]))
			.transpose()
			.map_err(|e| HandlerError::decode(local_key, e))?
			.unwrap_or_default();
		let locks: Vec<AssetLock> = locks.iter().map(AssetLock::from).collect();
		let chain_asset_id = ChainAssetId::new(self.chain_id.clone(), utility_asset);
		self.context.update_locks(store, &chain_asset_id, &locks).await
	}

	/// Balances of every mapped asset, once the account and a reserved value were received.
	fn merge(&self, state: &EquilibriumState) -> Vec<AssetBalance> {
		let (Some(account), false) = (&state.account, state.reserved.is_empty()) else {
			return Vec::new();
		};
		let account = account.as_ref();
		let reserved = &state.reserved;
		let free: HashMap<u64, u128> = account
			.map(|info| info.balances().iter().map(|(currency, balance)| (*currency, balance.positive())).collect())
			.unwrap_or_default();
		let lock = account.map(EquilibriumAccountInfo::lock).unwrap_or_default();
		self.assets
			.iter()
			.map(|(currency, asset_id)| {
				let frozen = if Some(*asset_id) == self.utility_asset { lock } else { 0 };
				AssetBalance {
					free: free.get(currency).copied().unwrap_or_default(),
					reserved: reserved.get(currency).copied().unwrap_or_default(),
					frozen,
					..AssetBalance::empty(
						ChainAssetId::new(self.chain_id.clone(), *asset_id),
						self.context.account_id.clone(),
					)
				}
			})
			.collect()
	}
}

/// Handlers for the equilibrium account and reserved entries.
#[derive(Clone)]
pub struct EquilibriumHandlingFactory {
	updater: Arc<EquilibriumBalanceUpdater>,
	kinds: HashMap<String, EquilibriumStorageKind>,
}

impl EquilibriumHandlingFactory {
	pub fn new(updater: Arc<EquilibriumBalanceUpdater>) -> Self {
		Self { updater, kinds: HashMap::new() }
	}

	pub fn with_kind(mut self, local_key: impl Into<String>, kind: EquilibriumStorageKind) -> Self {
		self.kinds.insert(local_key.into(), kind);
		self
	}
}

struct EquilibriumHandler {
	kind: EquilibriumStorageKind,
	local_key: String,
	updater: Arc<EquilibriumBalanceUpdater>,
	store: Arc<dyn PersistenceStore>,
}

#[async_trait]
impl StorageChildHandler for EquilibriumHandler {
	async fn handle(
		&self,
		value: Option<Vec<u8>>,
		block: Option<BlockHash>,
	) -> Result<(), HandlerError> {
		persist_raw(self.store.as_ref(), &self.local_key, value.as_deref()).await?;
		self.updater.update(self.kind, &self.local_key, value, block, self.store.as_ref()).await
	}
}

impl SubscriptionHandlingFactory for EquilibriumHandlingFactory {
	fn create_handler(
		&self,
		remote_key: &[u8],
		local_key: &str,
		store: Arc<dyn PersistenceStore>,
	) -> Arc<dyn StorageChildHandler> {
		let Some(kind) = self.kinds.get(local_key).copied() else {
			log::warn!("No equilibrium storage kind registered for {local_key}");
			return RawStorageHandlingFactory.create_handler(remote_key, local_key, store);
		};
		Arc::new(EquilibriumHandler {
			kind,
			local_key: local_key.to_string(),
			updater: self.updater.clone(),
			store,
		})
	}
}
