// SPDX-License-Identifier: GPL-3.0

//! [`Connection`] implementation over a JSON-RPC client.

use super::{
	Connection, StorageChangeSet, StorageUpdate, StorageUpdateSink, SubscriptionHandle,
	SubscriptionMethod,
};
use crate::error::{RpcClientError, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
};
use subxt::{backend::rpc::RpcClient, ext::subxt_rpcs::client::RpcParams};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Storage subscriptions multiplexed over one RPC client.
///
/// Every subscription is driven by its own task that forwards notifications to the sink until
/// cancelled or until the node closes the subscription.
pub struct RpcConnection {
	client: RpcClient,
	next_handle: AtomicU64,
	active: Arc<Mutex<HashMap<SubscriptionHandle, CancellationToken>>>,
}

impl RpcConnection {
	/// Wrap an existing RPC client.
	pub fn new(client: RpcClient) -> Self {
		Self { client, next_handle: AtomicU64::new(0), active: Arc::default() }
	}

	/// Connect to a node.
	///
	/// # Arguments
	/// * `endpoint` - WebSocket URL of the node's RPC endpoint.
	pub async fn connect(endpoint: &Url) -> Result<Self, RpcClientError> {
		let client = RpcClient::from_url(endpoint.as_str()).await.map_err(|e| {
			RpcClientError::ConnectionFailed { endpoint: endpoint.to_string(), message: e.to_string() }
		})?;
		Ok(Self::new(client))
	}

	/// Number of subscriptions currently forwarded.
	pub fn active_subscriptions(&self) -> usize {
		self.active.lock().len()
	}
}

#[async_trait]
impl Connection for RpcConnection {
	async fn subscribe(
		&self,
		method: SubscriptionMethod,
		params: Vec<String>,
		sink: Arc<dyn StorageUpdateSink>,
	) -> Result<SubscriptionHandle, TransportError> {
		let failed = |message: String| TransportError::SubscriptionFailed {
			method: method.subscribe,
			message,
		};
		let mut rpc_params = RpcParams::new();
		rpc_params.push(params).map_err(|e| failed(e.to_string()))?;
		let mut subscription = self
			.client
			.subscribe::<StorageChangeSet>(method.subscribe, rpc_params, method.unsubscribe)
			.await
			.map_err(|e| failed(e.to_string()))?;

		let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
		let token = CancellationToken::new();
		self.active.lock().insert(handle, token.clone());

		let active = self.active.clone();
		tokio::spawn(async move {
			loop {
				let notification = tokio::select! {
					_ = token.cancelled() => break,
					notification = subscription.next() => notification,
				};
				match notification {
					Some(Ok(change_set)) => match StorageUpdate::try_from(change_set) {
						Ok(update) => sink.on_update(update).await,
						Err(err) => sink.on_failure(err, false),
					},
					Some(Err(err)) => sink.on_failure(
						TransportError::SubscriptionFailed {
							method: method.subscribe,
							message: err.to_string(),
						},
						false,
					),
					None => {
						sink.on_failure(TransportError::Closed, true);
						break;
					},
				}
			}
			active.lock().remove(&handle);
			log::debug!("Storage subscription {} finished", handle.0);
		});

		Ok(handle)
	}

	fn cancel(&self, handle: SubscriptionHandle) {
		if let Some(token) = self.active.lock().remove(&handle) {
			token.cancel();
		}
	}
}
