// SPDX-License-Identifier: GPL-3.0

//! SQLite-backed persistence store.

use super::{PersistenceStore, schema::chain_storage};
use crate::{
	error::StoreError,
	strings::store::{pragmas, sql},
};
use async_trait::async_trait;
use diesel::{prelude::*, sqlite::SqliteConnection};
use diesel_async::{
	RunQueryDsl, SimpleAsyncConnection,
	pooled_connection::{AsyncDieselConnectionManager, bb8::Pool},
	sync_connection_wrapper::SyncConnectionWrapper,
};
use std::path::Path;

type Connection = SyncConnectionWrapper<SqliteConnection>;

/// SQLite database URL for in-memory databases.
const IN_MEMORY: &str = ":memory:";

/// Connection pool size for in-memory databases.
///
/// Must be 1 because SQLite in-memory databases are connection-specific:
/// each connection creates a separate, isolated database instance.
const MEMORY_POOL_CONNECTIONS: u32 = 1;

#[derive(Insertable)]
#[diesel(table_name = chain_storage)]
struct StorageRow<'a> {
	key: &'a str,
	value: &'a [u8],
}

/// Persistence store keeping values in a SQLite database.
pub struct SqliteStore {
	pool: Pool<Connection>,
}

impl SqliteStore {
	/// Open or create a database at the specified path.
	///
	/// Creates the parent directory if it doesn't exist.
	///
	/// # Arguments
	/// * `path` - Location of the database file.
	/// * `max_connections` - Size of the connection pool.
	pub async fn open(path: &Path, max_connections: u32) -> Result<Self, StoreError> {
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let store = Self::connect(&path.to_string_lossy(), max_connections).await?;
		store.run_batch(pragmas::JOURNAL_MODE_WAL).await?;
		Ok(store)
	}

	/// Open a database living in memory for as long as the store.
	pub async fn in_memory() -> Result<Self, StoreError> {
		Self::connect(IN_MEMORY, MEMORY_POOL_CONNECTIONS).await
	}

	async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
		let manager = AsyncDieselConnectionManager::<Connection>::new(url);
		let pool = Pool::builder().max_size(max_connections.max(1)).build(manager).await?;
		let store = Self { pool };
		store.run_batch(pragmas::BUSY_TIMEOUT).await?;
		store.run_batch(sql::CREATE_STORAGE_TABLE).await?;
		Ok(store)
	}

	async fn run_batch(&self, statement: &str) -> Result<(), StoreError> {
		let mut conn = self.pool.get().await?;
		conn.batch_execute(statement).await?;
		Ok(())
	}
}

#[async_trait]
impl PersistenceStore for SqliteStore {
	async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
		let mut conn = self.pool.get().await?;
		diesel::replace_into(chain_storage::table)
			.values(StorageRow { key, value: &value })
			.execute(&mut *conn)
			.await?;
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StoreError> {
		let mut conn = self.pool.get().await?;
		diesel::delete(chain_storage::table.filter(chain_storage::key.eq(key)))
			.execute(&mut *conn)
			.await?;
		Ok(())
	}

	async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
		let mut conn = self.pool.get().await?;
		let value = chain_storage::table
			.filter(chain_storage::key.eq(key))
			.select(chain_storage::value)
			.first::<Vec<u8>>(&mut *conn)
			.await
			.optional()?;
		Ok(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn in_memory_put_get_delete() {
		let store = SqliteStore::in_memory().await.unwrap();
		assert_eq!(store.get("missing").await.unwrap(), None);

		store.put("key", vec![1, 2, 3]).await.unwrap();
		store.put("key", vec![4]).await.unwrap();
		assert_eq!(store.get("key").await.unwrap(), Some(vec![4]));

		store.delete("key").await.unwrap();
		assert_eq!(store.get("key").await.unwrap(), None);
	}

	#[tokio::test]
	async fn file_database_persists_across_reopen() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("sync.db");

		let store = SqliteStore::open(&path, 2).await.unwrap();
		store.put("balance", vec![9]).await.unwrap();
		drop(store);

		let reopened = SqliteStore::open(&path, 2).await.unwrap();
		assert_eq!(reopened.get("balance").await.unwrap(), Some(vec![9]));
	}
}
