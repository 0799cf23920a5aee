// SPDX-License-Identifier: GPL-3.0

use super::{StorageChildHandler, SubscriptionHandlingFactory, persist_raw};
use crate::{
	error::HandlerError,
	events::{EventCenter, SyncEvent},
	store::PersistenceStore,
	types::{BlockHash, ChainId},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Persists raw values under their local key.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawStorageHandlingFactory;

struct RawStorageHandler {
	local_key: String,
	store: Arc<dyn PersistenceStore>,
}

#[async_trait]
impl StorageChildHandler for RawStorageHandler {
	async fn handle(
		&self,
		value: Option<Vec<u8>>,
		_block: Option<BlockHash>,
	) -> Result<(), HandlerError> {
		persist_raw(self.store.as_ref(), &self.local_key, value.as_deref()).await
	}
}

impl SubscriptionHandlingFactory for RawStorageHandlingFactory {
	fn create_handler(
		&self,
		_remote_key: &[u8],
		local_key: &str,
		store: Arc<dyn PersistenceStore>,
	) -> Arc<dyn StorageChildHandler> {
		Arc::new(RawStorageHandler { local_key: local_key.to_string(), store })
	}
}

/// Ignores every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyHandlingFactory;

struct EmptyHandler;

#[async_trait]
impl StorageChildHandler for EmptyHandler {
	async fn handle(
		&self,
		_value: Option<Vec<u8>>,
		_block: Option<BlockHash>,
	) -> Result<(), HandlerError> {
		Ok(())
	}
}

impl SubscriptionHandlingFactory for EmptyHandlingFactory {
	fn create_handler(
		&self,
		_remote_key: &[u8],
		_local_key: &str,
		_store: Arc<dyn PersistenceStore>,
	) -> Arc<dyn StorageChildHandler> {
		Arc::new(EmptyHandler)
	}
}

/// Persists raw values, then announces the change on the event center.
#[derive(Clone, Debug)]
pub struct EventEmittingHandlingFactory {
	chain_id: ChainId,
	events: EventCenter,
}

impl EventEmittingHandlingFactory {
	pub fn new(chain_id: ChainId, events: EventCenter) -> Self {
		Self { chain_id, events }
	}
}

struct EventEmittingHandler {
	chain_id: ChainId,
	local_key: String,
	store: Arc<dyn PersistenceStore>,
	events: EventCenter,
}

#[async_trait]
impl StorageChildHandler for EventEmittingHandler {
	async fn handle(
		&self,
		value: Option<Vec<u8>>,
		block: Option<BlockHash>,
	) -> Result<(), HandlerError> {
		persist_raw(self.store.as_ref(), &self.local_key, value.as_deref()).await?;
		self.events.notify(SyncEvent::StorageChanged {
			chain_id: self.chain_id.clone(),
			local_key: self.local_key.clone(),
			block,
		});
		Ok(())
	}
}

impl SubscriptionHandlingFactory for EventEmittingHandlingFactory {
	fn create_handler(
		&self,
		_remote_key: &[u8],
		local_key: &str,
		store: Arc<dyn PersistenceStore>,
	) -> Arc<dyn StorageChildHandler> {
		Arc::new(EventEmittingHandler {
			chain_id: self.chain_id.clone(),
			local_key: local_key.to_string(),
			store,
			events: self.events.clone(),
		})
	}
}
