// SPDX-License-Identifier: GPL-3.0

//! In-process event center for storage synchronization.
//!
//! Handlers publish events after persisting decoded values. Delivery is fire-and-forget: with no
//! subscriber listening, events are simply dropped.

use crate::types::{AccountId, BlockHash, ChainAssetId, ChainId};
use tokio::sync::broadcast;

/// Default capacity of the event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events emitted by storage update handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
	/// The persisted balance of an account changed.
	AssetBalanceChanged {
		chain_asset_id: ChainAssetId,
		account_id: AccountId,
		/// Block the change was observed at, if known.
		block: Option<BlockHash>,
	},
	/// The balance locks of an account changed.
	LocksChanged { chain_asset_id: ChainAssetId, account_id: AccountId },
	/// The holds of an account changed.
	HoldsChanged { chain_asset_id: ChainAssetId, account_id: AccountId },
	/// The freezes of an account changed.
	FreezesChanged { chain_asset_id: ChainAssetId, account_id: AccountId },
	/// A raw storage value persisted under `local_key` changed.
	StorageChanged { chain_id: ChainId, local_key: String, block: Option<BlockHash> },
}

/// Publish/subscribe hub for [`SyncEvent`]s.
///
/// Cloning is cheap; all clones publish to the same subscribers.
#[derive(Debug, Clone)]
pub struct EventCenter {
	sender: broadcast::Sender<SyncEvent>,
}

impl EventCenter {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}

	/// Publish an event to all current subscribers.
	pub fn notify(&self, event: SyncEvent) {
		// Sending only fails when nobody listens.
		let _ = self.sender.send(event);
	}

	/// Subscribe to events published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventCenter {
	fn default() -> Self {
		Self::new(EVENT_CHANNEL_CAPACITY)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn subscribers_receive_events() {
		let events = EventCenter::default();
		let mut receiver = events.subscribe();
		let event = SyncEvent::StorageChanged {
			chain_id: ChainId::new("polkadot"),
			local_key: "0x01".into(),
			block: None,
		};

		events.notify(event.clone());
		assert_eq!(receiver.recv().await.unwrap(), event);
	}

	#[test]
	fn notify_without_subscribers_is_fine() {
		EventCenter::new(1).notify(SyncEvent::LocksChanged {
			chain_asset_id: ChainAssetId::new(ChainId::new("polkadot"), 0),
			account_id: AccountId::new(vec![1]),
		});
	}
}
