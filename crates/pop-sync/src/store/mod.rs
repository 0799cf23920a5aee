// SPDX-License-Identifier: GPL-3.0

//! Key-value persistence targeted by storage update handlers.
//!
//! Values are stored under opaque string keys: the local key of a storage entry for raw values,
//! or a record key (see [`crate::models`]) for decoded balances.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use async_trait::async_trait;

/// Persistence backend shared by all handlers of a subscription service.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
	/// Store `value` under `key`, replacing any previous value.
	async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

	/// Remove the value under `key`. Removing a missing key is not an error.
	async fn delete(&self, key: &str) -> Result<(), StoreError>;

	/// Read the value under `key`.
	async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
}
