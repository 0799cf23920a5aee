// SPDX-License-Identifier: GPL-3.0

use super::PersistenceStore;
use crate::error::StoreError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory persistence store.
#[derive(Debug, Default)]
pub struct MemoryStore {
	values: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored values.
	pub fn len(&self) -> usize {
		self.values.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.read().is_empty()
	}

	/// Read a value without going through the async interface.
	pub fn value(&self, key: &str) -> Option<Vec<u8>> {
		self.values.read().get(key).cloned()
	}
}

#[async_trait]
impl PersistenceStore for MemoryStore {
	async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
		self.values.write().insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StoreError> {
		self.values.write().remove(key);
		Ok(())
	}

	async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
		Ok(self.value(key))
	}
}
