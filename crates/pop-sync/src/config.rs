// SPDX-License-Identifier: GPL-3.0

//! Synchronization settings, loadable from a TOML file.
//!
//! ```toml
//! event_channel_capacity = 512
//! max_pool_connections = 4
//!
//! [store]
//! backend = "sqlite"
//! path = "/var/lib/wallet/storage.db"
//! ```

use crate::{
	error::{ConfigError, StoreError},
	events::{EVENT_CHANNEL_CAPACITY, EventCenter},
	store::{MemoryStore, PersistenceStore, SqliteStore},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};

/// Default size of the SQLite connection pool.
const DEFAULT_MAX_POOL_CONNECTIONS: u32 = 5;

/// Where decoded storage values are persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
	/// Values live in memory for the lifetime of the process.
	#[default]
	Memory,
	/// Values are kept in a SQLite database file.
	Sqlite { path: PathBuf },
}

/// Settings of the synchronization services.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
	/// Capacity of the [`EventCenter`] channel.
	pub event_channel_capacity: usize,
	/// Connection pool size of the SQLite store.
	pub max_pool_connections: u32,
	pub store: StoreConfig,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			event_channel_capacity: EVENT_CHANNEL_CAPACITY,
			max_pool_connections: DEFAULT_MAX_POOL_CONNECTIONS,
			store: StoreConfig::default(),
		}
	}
}

impl SyncConfig {
	/// Read the configuration from a TOML file. Missing fields take their default.
	pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
		let contents = std::fs::read_to_string(path)?;
		Ok(contents.parse()?)
	}

	/// Open the configured store.
	pub async fn build_store(&self) -> Result<Arc<dyn PersistenceStore>, StoreError> {
		Ok(match &self.store {
			StoreConfig::Memory => Arc::new(MemoryStore::new()),
			StoreConfig::Sqlite { path } => {
				log::debug!("Opening storage database at {}", path.display());
				Arc::new(SqliteStore::open(path, self.max_pool_connections).await?)
			},
		})
	}

	/// An event center sized as configured.
	pub fn event_center(&self) -> EventCenter {
		EventCenter::new(self.event_channel_capacity)
	}
}

impl std::str::FromStr for SyncConfig {
	type Err = toml::de::Error;

	fn from_str(contents: &str) -> Result<Self, Self::Err> {
		toml::from_str(contents)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn defaults() {
		let config = SyncConfig::default();
		assert_eq!(config.event_channel_capacity, 256);
		assert_eq!(config.max_pool_connections, 5);
		assert_eq!(config.store, StoreConfig::Memory);
	}

	#[test]
	fn missing_fields_take_defaults() {
		let config: SyncConfig = "event_channel_capacity = 16".parse().unwrap();
		assert_eq!(config.event_channel_capacity, 16);
		assert_eq!(config.max_pool_connections, 5);
		assert_eq!(config.store, StoreConfig::Memory);
	}

	#[test]
	fn parses_sqlite_store() {
		let config: SyncConfig = r#"
			max_pool_connections = 2

			[store]
			backend = "sqlite"
			path = "/tmp/storage.db"
		"#
		.parse()
		.unwrap();
		assert_eq!(config.max_pool_connections, 2);
		assert_eq!(config.store, StoreConfig::Sqlite { path: "/tmp/storage.db".into() });
	}

	#[test]
	fn load_reports_invalid_toml() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("sync.toml");
		std::fs::write(&path, "event_channel_capacity = \"many\"").unwrap();
		assert!(matches!(SyncConfig::load(&path), Err(ConfigError::Parse(_))));
		assert!(matches!(
			SyncConfig::load(&dir.path().join("missing.toml")),
			Err(ConfigError::Io(_))
		));
	}

	#[tokio::test]
	async fn builds_configured_store() {
		let dir = tempdir().unwrap();
		let config = SyncConfig {
			store: StoreConfig::Sqlite { path: dir.path().join("nested").join("storage.db") },
			..Default::default()
		};
		let store = config.build_store().await.unwrap();
		store.put("key", vec![1, 2]).await.unwrap();
		assert_eq!(store.get("key").await.unwrap(), Some(vec![1, 2]));
	}

	#[tokio::test]
	async fn loaded_sqlite_config_opens_a_working_store() {
		let dir = tempdir().unwrap();
		let database = dir.path().join("db").join("storage.db");
		let path = dir.path().join("sync.toml");
		let contents = format!("max_pool_connections = 2\n\n[store]\nbackend = \"sqlite\"\npath = {:?}\n", database);
		std::fs::write(&path, contents).unwrap();

		let config = SyncConfig::load(&path).unwrap();
		assert_eq!(config.store, StoreConfig::Sqlite { path: database.clone() });
		let store = config.build_store().await.unwrap();
		store.put("balance", vec![7]).await.unwrap();
		assert_eq!(store.get("balance").await.unwrap(), Some(vec![7]));
		store.delete("balance").await.unwrap();
		assert_eq!(store.get("balance").await.unwrap(), None);
		assert!(database.exists());
	}
}
