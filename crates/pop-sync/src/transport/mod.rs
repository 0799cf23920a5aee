// SPDX-License-Identifier: GPL-3.0

//! Physical storage subscriptions.
//!
//! A [`Connection`] accepts a list of storage keys and delivers batches of changes to a
//! [`StorageUpdateSink`] until the subscription is cancelled. Connections are shared: many
//! subscriptions may be multiplexed over one connection, each cancelling only its own handle.

mod rpc;

pub use rpc::RpcConnection;

use crate::{
	error::TransportError,
	strings::rpc::methods,
	types::BlockHash,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pair of JSON-RPC methods opening and closing a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionMethod {
	pub subscribe: &'static str,
	pub unsubscribe: &'static str,
}

/// Storage change subscription (`state_subscribeStorage`).
pub const STORAGE_SUBSCRIPTION: SubscriptionMethod = SubscriptionMethod {
	subscribe: methods::STATE_SUBSCRIBE_STORAGE,
	unsubscribe: methods::STATE_UNSUBSCRIBE_STORAGE,
};

/// Identifies one subscription on a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// New value of one storage key. `None` means the value was removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageChange {
	pub key: Vec<u8>,
	pub value: Option<Vec<u8>>,
}

/// A batch of storage changes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageUpdate {
	pub block_hash: Option<BlockHash>,
	pub changes: Vec<StorageChange>,
}

/// Storage change notification as sent by the node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageChangeSet {
	pub block: Option<BlockHash>,
	pub changes: Vec<(String, Option<String>)>,
}

impl TryFrom<StorageChangeSet> for StorageUpdate {
	type Error = TransportError;

	fn try_from(change_set: StorageChangeSet) -> Result<Self, Self::Error> {
		let changes = change_set
			.changes
			.into_iter()
			.map(|(key, value)| {
				Ok(StorageChange { key: decode_hex(&key)?, value: value.as_deref().map(decode_hex).transpose()? })
			})
			.collect::<Result<Vec<_>, TransportError>>()?;
		Ok(StorageUpdate { block_hash: change_set.block, changes })
	}
}

fn decode_hex(value: &str) -> Result<Vec<u8>, TransportError> {
	hex::decode(value.trim_start_matches("0x"))
		.map_err(|err| TransportError::InvalidNotification(format!("{value}: {err}")))
}

/// Receiver of the notifications of one subscription.
#[async_trait]
pub trait StorageUpdateSink: Send + Sync {
	/// A batch of changes arrived.
	async fn on_update(&self, update: StorageUpdate);

	/// The subscription failed. `unsubscribed` tells whether it is gone for good.
	fn on_failure(&self, error: TransportError, unsubscribed: bool);
}

/// A connection to a node able to open storage subscriptions.
#[async_trait]
pub trait Connection: Send + Sync {
	/// Open a subscription.
	///
	/// # Arguments
	/// * `method` - Subscribe/unsubscribe method pair.
	/// * `params` - `0x`-prefixed hex of every remote storage key.
	/// * `sink` - Receiver of notifications until [`Connection::cancel`] is called.
	async fn subscribe(
		&self,
		method: SubscriptionMethod,
		params: Vec<String>,
		sink: Arc<dyn StorageUpdateSink>,
	) -> Result<SubscriptionHandle, TransportError>;

	/// Cancel a subscription. Unknown handles are ignored.
	fn cancel(&self, handle: SubscriptionHandle);
}
