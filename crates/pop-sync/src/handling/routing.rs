// SPDX-License-Identifier: GPL-3.0

use super::{
	RawStorageHandlingFactory, StorageChildHandler, SubscriptionHandlingFactory,
};
use crate::store::PersistenceStore;
use std::{collections::HashMap, sync::Arc};

/// Dispatches handler creation on the local key.
///
/// Local keys without a route get a [`RawStorageHandlingFactory`] handler.
#[derive(Clone, Default)]
pub struct RoutingHandlingFactory {
	routes: HashMap<String, Arc<dyn SubscriptionHandlingFactory>>,
}

impl RoutingHandlingFactory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Route `local_key` to `factory`.
	pub fn route(mut self, local_key: impl Into<String>, factory: Arc<dyn SubscriptionHandlingFactory>) -> Self {
		self.routes.insert(local_key.into(), factory);
		self
	}

	/// Route every key of `local_keys` to `factory`.
	pub fn insert_all<I, K>(&mut self, local_keys: I, factory: Arc<dyn SubscriptionHandlingFactory>)
	where
		I: IntoIterator<Item = K>,
		K: Into<String>,
	{
		for local_key in local_keys {
			self.routes.insert(local_key.into(), factory.clone());
		}
	}

	pub fn len(&self) -> usize {
		self.routes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}
}

impl SubscriptionHandlingFactory for RoutingHandlingFactory {
	fn create_handler(
		&self,
		remote_key: &[u8],
		local_key: &str,
		store: Arc<dyn PersistenceStore>,
	) -> Arc<dyn StorageChildHandler> {
		match self.routes.get(local_key) {
			Some(factory) => factory.create_handler(remote_key, local_key, store),
			None => RawStorageHandlingFactory.create_handler(remote_key, local_key, store),
		}
	}
}
