// SPDX-License-Identifier: GPL-3.0

//! Native token balances: `System.Account` and the `Balances` locks, holds and freezes.

use super::{
	BalanceContext, RawStorageHandlingFactory, StorageChildHandler, SubscriptionHandlingFactory,
	persist_raw,
};
use crate::{
	error::HandlerError,
	models::{AssetBalance, AssetLock, AssetReason},
	store::PersistenceStore,
	types::{BlockHash, ChainAssetId},
	values::{AccountInfo, BalanceLock, decode_id_amounts},
};
use async_trait::async_trait;
use scale::Decode;
use std::{collections::HashMap, sync::Arc};

/// Storage entries handled for a native token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeStorageKind {
	/// `System.Account`
	Account,
	/// `Balances.Locks`
	Locks,
	/// `Balances.Holds`
	Holds,
	/// `Balances.Freezes`
	Freezes,
}

/// Handlers for the native token of a chain.
#[derive(Clone)]
pub struct NativeTokenHandlingFactory {
	chain_asset_id: ChainAssetId,
	context: BalanceContext,
	kinds: HashMap<String, NativeStorageKind>,
}

impl NativeTokenHandlingFactory {
	pub fn new(chain_asset_id: ChainAssetId, context: BalanceContext) -> Self {
		Self { chain_asset_id, context, kinds: HashMap::new() }
	}

	/// Handle values of `local_key` as `kind`.
	pub fn with_kind(mut self, local_key: impl Into<String>, kind: NativeStorageKind) -> Self {
		self.kinds.insert(local_key.into(), kind);
		self
	}
}

struct NativeHandler {
	kind: NativeStorageKind,
	local_key: String,
	chain_asset_id: ChainAssetId,
	context: BalanceContext,
	store: Arc<dyn PersistenceStore>,
}

#[async_trait]
impl StorageChildHandler for NativeHandler {
	async fn handle(
		&self,
		value: Option<Vec<u8>>,
		block: Option<BlockHash>,
	) -> Result<(), HandlerError> {
		let store = self.store.as_ref();
		persist_raw(store, &self.local_key, value.as_deref()).await?;
		let value = value.unwrap_or_default();
		match self.kind {
			NativeStorageKind::Account => {
				let balance = if value.is_empty() {
					AssetBalance::empty(self.chain_asset_id.clone(), self.context.account_id.clone())
				} else {
					let info = AccountInfo::decode(&mut &value[..])
						.map_err(|e| HandlerError::decode(&self.local_key, e))?;
					AssetBalance::from_account_data(
						self.chain_asset_id.clone(),
						self.context.account_id.clone(),
						&info.data,
					)
				};
				self.context.update_balance(store, &balance, block).await?;
			},
			NativeStorageKind::Locks => {
				let locks = decode_or_empty::<Vec<BalanceLock>>(&value, &self.local_key)?;
				let locks: Vec<AssetLock> = locks.iter().map(AssetLock::from).collect();
				self.context.update_locks(store, &self.chain_asset_id, &locks).await?;
			},
			NativeStorageKind::Holds => {
				let holds = decode_reasons(&value, &self.local_key)?;
				self.context.update_holds(store, &self.chain_asset_id, &holds).await?;
			},
			NativeStorageKind::Freezes => {
				let freezes = decode_reasons(&value, &self.local_key)?;
				self.context.update_freezes(store, &self.chain_asset_id, &freezes).await?;
			},
		}
		Ok(())
	}
}

impl SubscriptionHandlingFactory for NativeTokenHandlingFactory {
	fn create_handler(
		&self,
		remote_key: &[u8],
		local_key: &str,
		store: Arc<dyn PersistenceStore>,
	) -> Arc<dyn StorageChildHandler> {
		let Some(kind) = self.kinds.get(local_key).copied() else {
			log::warn!("No native storage kind registered for {local_key}");
			return RawStorageHandlingFactory.create_handler(remote_key, local_key, store);
		};
		Arc::new(NativeHandler {
			kind,
			local_key: local_key.to_string(),
			chain_asset_id: self.chain_asset_id.clone(),
			context: self.context.clone(),
			store,
		})
	}
}

/// Decode a value, treating a removed entry as the type's default.
pub(super) fn decode_or_empty<T: Decode + Default>(
	value: &[u8],
	local_key: &str,
) -> Result<T, HandlerError> {
	if value.is_empty() {
		return Ok(T::default());
	}
	T::decode(&mut &value[..]).map_err(|e| HandlerError::decode(local_key, e))
}

fn decode_reasons(value: &[u8], local_key: &str) -> Result<Vec<AssetReason>, HandlerError> {
	if value.is_empty() {
		return Ok(Vec::new());
	}
	let entries = decode_id_amounts(value).map_err(|e| HandlerError::decode(local_key, e))?;
	Ok(entries.iter().map(AssetReason::from).collect())
}
