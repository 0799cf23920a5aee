// SPDX-License-Identifier: GPL-3.0

//! A live storage subscription together with the handlers of its keys.

use crate::{
	error::TransportError,
	handling::StorageChildHandler,
	transport::{
		Connection, STORAGE_SUBSCRIPTION, StorageUpdate, StorageUpdateSink, SubscriptionHandle,
	},
};
use async_trait::async_trait;
use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

/// Handler of one subscribed key.
pub struct ChildHandler {
	pub remote_key: Vec<u8>,
	pub local_key: String,
	pub handler: Arc<dyn StorageChildHandler>,
}

/// Dispatches notifications to the handler registered for each changed key.
struct UpdateRouter {
	handlers: Vec<ChildHandler>,
	closed: AtomicBool,
}

impl UpdateRouter {
	async fn dispatch(&self, update: StorageUpdate) {
		if self.closed.load(Ordering::Acquire) {
			log::trace!("Dropping update received after unsubscribe");
			return;
		}
		for change in update.changes {
			for child in self.handlers.iter().filter(|child| child.remote_key == change.key) {
				if let Err(err) = child.handler.handle(change.value.clone(), update.block_hash).await {
					log::warn!("Failed to handle update of {}: {err}", child.local_key);
				}
			}
		}
	}
}

#[async_trait]
impl StorageUpdateSink for UpdateRouter {
	async fn on_update(&self, update: StorageUpdate) {
		self.dispatch(update).await
	}

	fn on_failure(&self, error: TransportError, unsubscribed: bool) {
		if unsubscribed {
			log::error!("Storage subscription ended: {error}");
		} else {
			log::warn!("Storage subscription error: {error}");
		}
	}
}

/// A physical storage subscription and its per-key handlers.
///
/// Dropping the container unsubscribes.
pub struct StorageSubscriptionContainer {
	connection: Arc<dyn Connection>,
	handle: SubscriptionHandle,
	router: Arc<UpdateRouter>,
	unsubscribed: AtomicBool,
}

impl StorageSubscriptionContainer {
	/// Subscribe to the remote keys of `handlers` through `connection`.
	pub async fn subscribe(
		connection: Arc<dyn Connection>,
		handlers: Vec<ChildHandler>,
	) -> Result<Self, TransportError> {
		let params = handlers
			.iter()
			.map(|child| format!("0x{}", hex::encode(&child.remote_key)))
			.collect();
		let router = Arc::new(UpdateRouter { handlers, closed: AtomicBool::new(false) });
		let handle = connection.subscribe(STORAGE_SUBSCRIPTION, params, router.clone()).await?;
		log::debug!("Subscribed to {} storage keys", router.handlers.len());
		Ok(Self { connection, handle, router, unsubscribed: AtomicBool::new(false) })
	}

	/// Route a batch of changes to the matching handlers. Unknown keys are ignored.
	pub async fn process_update(&self, update: StorageUpdate) {
		self.router.dispatch(update).await
	}

	/// Cancel the subscription. Only the first call has an effect.
	pub fn unsubscribe(&self) {
		if self.unsubscribed.swap(true, Ordering::AcqRel) {
			return;
		}
		self.router.closed.store(true, Ordering::Release);
		self.connection.cancel(self.handle);
		log::debug!("Unsubscribed from {} storage keys", self.router.handlers.len());
	}

	/// Whether [`Self::unsubscribe`] has not been called yet.
	pub fn is_subscribed(&self) -> bool {
		!self.unsubscribed.load(Ordering::Acquire)
	}

	/// Transport handle of the underlying subscription.
	pub fn handle(&self) -> SubscriptionHandle {
		self.handle
	}

	/// Remote keys in subscription order.
	pub fn remote_keys(&self) -> impl Iterator<Item = &[u8]> {
		self.router.handlers.iter().map(|child| child.remote_key.as_slice())
	}
}

impl Drop for StorageSubscriptionContainer {
	fn drop(&mut self) {
		self.unsubscribe();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		testing::{MockConnection, RecordingHandler},
		transport::StorageChange,
	};

	fn child(remote_key: u8, handler: &Arc<RecordingHandler>) -> ChildHandler {
		ChildHandler {
			remote_key: vec![remote_key],
			local_key: format!("local-{remote_key}"),
			handler: handler.clone(),
		}
	}

	#[tokio::test]
	async fn routes_changes_to_matching_handlers() {
		let connection = Arc::new(MockConnection::new());
		let (a, b) = (Arc::new(RecordingHandler::default()), Arc::new(RecordingHandler::default()));
		let container =
			StorageSubscriptionContainer::subscribe(connection.clone(), vec![child(1, &a), child(2, &b)])
				.await
				.unwrap();
		assert_eq!(connection.subscribed_params(), vec![vec!["0x01".to_string(), "0x02".to_string()]]);

		container
			.process_update(StorageUpdate {
				block_hash: None,
				changes: vec![
					StorageChange { key: vec![1], value: Some(vec![10]) },
					StorageChange { key: vec![3], value: Some(vec![30]) },
					StorageChange { key: vec![2], value: None },
				],
			})
			.await;

		assert_eq!(a.values(), vec![Some(vec![10])]);
		assert_eq!(b.values(), vec![None]);
	}

	#[tokio::test]
	async fn unsubscribe_is_idempotent_and_runs_on_drop() {
		let connection = Arc::new(MockConnection::new());
		let handler = Arc::new(RecordingHandler::default());
		let container =
			StorageSubscriptionContainer::subscribe(connection.clone(), vec![child(1, &handler)])
				.await
				.unwrap();
		let handle = container.handle();

		container.unsubscribe();
		container.unsubscribe();
		assert!(!container.is_subscribed());
		drop(container);

		assert_eq!(connection.cancelled(), vec![handle]);
	}

	#[tokio::test]
	async fn updates_after_unsubscribe_are_dropped() {
		let connection = Arc::new(MockConnection::new());
		let handler = Arc::new(RecordingHandler::default());
		let container =
			StorageSubscriptionContainer::subscribe(connection.clone(), vec![child(1, &handler)])
				.await
				.unwrap();

		container.unsubscribe();
		connection
			.push(StorageUpdate {
				block_hash: None,
				changes: vec![StorageChange { key: vec![1], value: Some(vec![1]) }],
			})
			.await;

		assert!(handler.values().is_empty());
	}

	#[tokio::test]
	async fn handler_errors_are_contained() {
		let connection = Arc::new(MockConnection::new());
		let failing = Arc::new(RecordingHandler::failing());
		let healthy = Arc::new(RecordingHandler::default());
		let container = StorageSubscriptionContainer::subscribe(
			connection,
			vec![child(1, &failing), child(2, &healthy)],
		)
		.await
		.unwrap();

		container
			.process_update(StorageUpdate {
				block_hash: None,
				changes: vec![
					StorageChange { key: vec![1], value: Some(vec![1]) },
					StorageChange { key: vec![2], value: Some(vec![2]) },
				],
			})
			.await;

		assert_eq!(failing.values(), vec![Some(vec![1])]);
		assert_eq!(healthy.values(), vec![Some(vec![2])]);
	}
}
