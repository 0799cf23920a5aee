// SPDX-License-Identifier: GPL-3.0

//! Storage update handlers.
//!
//! A [`SubscriptionHandlingFactory`] produces one [`StorageChildHandler`] per subscribed key. The
//! handler receives every new value of its key, decodes it and persists the result.
//!
//! # Variants
//!
//! - [`RawStorageHandlingFactory`] - Persist the raw bytes under the local key.
//! - [`EmptyHandlingFactory`] - Ignore updates.
//! - [`EventEmittingHandlingFactory`] - Persist raw bytes, then publish [`SyncEvent::StorageChanged`].
//! - [`RoutingHandlingFactory`] - Dispatch on the local key to other factories.
//! - [`NativeTokenHandlingFactory`] - `System.Account` and `Balances` locks, holds and freezes.
//! - [`OrmlTokenHandlingFactory`] - ORML `Tokens` accounts and locks.
//! - [`AssetsPalletHandlingFactory`] - `pallet-assets` account and asset details.
//! - [`EquilibriumHandlingFactory`] - Equilibrium multi-asset account data.
//!
//! [`SyncEvent::StorageChanged`]: crate::events::SyncEvent::StorageChanged

mod assets;
mod balance;
mod equilibrium;
mod native;
mod orml;
mod raw;
mod routing;

pub use assets::{AssetsBalanceUpdater, AssetsPalletHandlingFactory, AssetsStorageKind};
pub use balance::BalanceContext;
pub use equilibrium::{EquilibriumBalanceUpdater, EquilibriumHandlingFactory, EquilibriumStorageKind};
pub use native::{NativeStorageKind, NativeTokenHandlingFactory};
pub use orml::{OrmlStorageKind, OrmlTokenHandlingFactory};
pub use raw::{EmptyHandlingFactory, EventEmittingHandlingFactory, RawStorageHandlingFactory};
pub use routing::RoutingHandlingFactory;

use crate::{error::HandlerError, store::PersistenceStore, types::BlockHash};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

/// Handles the values of one subscribed storage key.
#[async_trait]
pub trait StorageChildHandler: Send + Sync {
	/// Process a new value. `None` means the entry was removed.
	async fn handle(&self, value: Option<Vec<u8>>, block: Option<BlockHash>)
	-> Result<(), HandlerError>;
}

/// Creates the handler of each subscribed key.
pub trait SubscriptionHandlingFactory: Send + Sync {
	/// # Arguments
	/// * `remote_key` - Storage key the handler receives values of.
	/// * `local_key` - Key the request was registered under.
	/// * `store` - Where decoded values are persisted.
	fn create_handler(
		&self,
		remote_key: &[u8],
		local_key: &str,
		store: Arc<dyn PersistenceStore>,
	) -> Arc<dyn StorageChildHandler>;
}

/// Persist raw bytes under `local_key`, or delete the entry when the value is gone.
pub(crate) async fn persist_raw(
	store: &dyn PersistenceStore,
	local_key: &str,
	value: Option<&[u8]>,
) -> Result<(), HandlerError> {
	match value {
		Some(bytes) => store.put(local_key, bytes.to_vec()).await?,
		None => store.delete(local_key).await?,
	}
	Ok(())
}

/// Read a JSON record.
pub(crate) async fn load_record<T: DeserializeOwned>(
	store: &dyn PersistenceStore,
	key: &str,
) -> Result<Option<T>, HandlerError> {
	match store.get(key).await? {
		Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
		None => Ok(None),
	}
}

/// Write a JSON record unless an equal one is already stored. Returns whether it was written.
pub(crate) async fn store_record<T: Serialize>(
	store: &dyn PersistenceStore,
	key: &str,
	record: &T,
) -> Result<bool, HandlerError> {
	let encoded = serde_json::to_vec(record)?;
	if store.get(key).await?.as_deref() == Some(encoded.as_slice()) {
		return Ok(false);
	}
	store.put(key, encoded).await?;
	Ok(true)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::MemoryStore;

	#[tokio::test]
	async fn store_record_skips_unchanged_values() {
		let store = MemoryStore::new();
		assert!(store_record(&store, "key", &vec![1u8, 2]).await.unwrap());
		assert!(!store_record(&store, "key", &vec![1u8, 2]).await.unwrap());
		assert!(store_record(&store, "key", &vec![3u8]).await.unwrap());
		assert_eq!(load_record::<Vec<u8>>(&store, "key").await.unwrap(), Some(vec![3]));
	}

	#[tokio::test]
	async fn persist_raw_deletes_removed_values() {
		let store = MemoryStore::new();
		persist_raw(&store, "key", Some(&[1])).await.unwrap();
		assert_eq!(store.value("key"), Some(vec![1]));
		persist_raw(&store, "key", None).await.unwrap();
		assert!(store.is_empty());
	}
}
