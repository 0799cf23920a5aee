// SPDX-License-Identifier: GPL-3.0

use super::{RemoteSubscription, attach_event_emitting};
use crate::{
	events::EventCenter,
	key::{CacheKeyBuilder, LocalStorageKeyFactory},
	path::StoragePath,
	request::{KeyParam, SubscriptionRequest},
	service::{Completion, RemoteSubscriptionService},
	strings::{keys, storage::pallets},
	types::{AccountId, ChainId},
};
use std::sync::Arc;

/// Subscribes to the staking state of a stash and its controller.
pub struct StakingRemoteSubscriptionService {
	service: Arc<RemoteSubscriptionService>,
	events: EventCenter,
	local_keys: LocalStorageKeyFactory,
}

impl StakingRemoteSubscriptionService {
	pub fn new(service: Arc<RemoteSubscriptionService>, events: EventCenter) -> Self {
		Self { service, events, local_keys: LocalStorageKeyFactory }
	}

	/// Subscribe to the staking entries of `stash`.
	///
	/// Bag list nodes are requested under every known module name. The names a chain lacks are
	/// skipped during setup.
	///
	/// # Arguments
	/// * `chain_id` - Chain to subscribe on.
	/// * `stash` - Stash account.
	/// * `controller` - Controller account, usually the stash itself.
	/// * `completion` - Receiver of the outcome.
	pub fn attach_to_account(
		&self,
		chain_id: &ChainId,
		stash: &AccountId,
		controller: &AccountId,
		completion: Option<Completion>,
	) -> RemoteSubscription {
		let requests = self.requests(chain_id, stash, controller);
		let cache_key = CacheKeyBuilder::new(keys::STAKING).account(stash);
		attach_event_emitting(&self.service, &self.events, chain_id, requests, cache_key, completion)
	}

	pub fn detach_from_account(&self, subscription: &RemoteSubscription, completion: Option<Completion>) {
		self.service.detach(&subscription.cache_key, subscription.id, completion);
	}

	fn requests(
		&self,
		chain_id: &ChainId,
		stash: &AccountId,
		controller: &AccountId,
	) -> Vec<SubscriptionRequest> {
		let keyed = |path: StoragePath, account: &AccountId| {
			let local_key = self.local_keys.create_for_account(&path, account, chain_id);
			SubscriptionRequest::map(path, local_key, KeyParam::from(account))
		};
		let mut requests = vec![
			keyed(StoragePath::STAKING_BONDED, stash),
			keyed(StoragePath::SYSTEM_ACCOUNT, stash),
			keyed(StoragePath::STAKING_LEDGER, controller),
		];
		if controller != stash {
			requests.push(keyed(StoragePath::SYSTEM_ACCOUNT, controller));
		}
		requests.extend([
			keyed(StoragePath::STAKING_NOMINATORS, stash),
			keyed(StoragePath::STAKING_VALIDATORS, stash),
			keyed(StoragePath::STAKING_PAYEE, stash),
		]);
		let bag_node_key =
			self.local_keys.create_for_account(&StoragePath::DEFAULT_BAG_LIST_NODE, stash, chain_id);
		requests.extend(pallets::BAGS_LIST_MODULES.into_iter().map(|module| {
			SubscriptionRequest::map(
				StoragePath::bag_list_node(module),
				bag_node_key.clone(),
				KeyParam::from(stash),
			)
		}));
		requests
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		chain::StaticChainRegistry,
		store::MemoryStore,
		testing::{ALICE, BOB},
	};

	fn service() -> StakingRemoteSubscriptionService {
		let service = RemoteSubscriptionService::with_current_runtime(
			Arc::new(StaticChainRegistry::new()),
			Arc::new(MemoryStore::new()),
		);
		StakingRemoteSubscriptionService::new(Arc::new(service), EventCenter::default())
	}

	#[tokio::test]
	async fn controller_account_only_when_distinct() {
		let service = service();
		let chain_id = ChainId::new("polkadot");
		let (alice, bob) = (AccountId::from(ALICE), AccountId::from(BOB));

		let same = service.requests(&chain_id, &alice, &alice);
		let distinct = service.requests(&chain_id, &alice, &bob);

		assert_eq!(same.len(), 9);
		assert_eq!(distinct.len(), 10);
		let ledger = distinct.iter().find(|request| request.path() == &StoragePath::STAKING_LEDGER);
		assert_eq!(
			ledger.map(SubscriptionRequest::local_key),
			Some(
				LocalStorageKeyFactory
					.create_for_account(&StoragePath::STAKING_LEDGER, &bob, &chain_id)
					.as_str()
			)
		);
	}

	#[tokio::test]
	async fn bag_list_nodes_share_one_local_key() {
		let service = service();
		let chain_id = ChainId::new("polkadot");
		let alice = AccountId::from(ALICE);

		let requests = service.requests(&chain_id, &alice, &alice);
		let nodes: Vec<_> =
			requests.iter().filter(|request| request.path().item == "ListNodes").collect();

		assert_eq!(nodes.len(), 3);
		assert!(nodes.iter().all(|request| request.local_key() == nodes[0].local_key()));
	}

	#[tokio::test]
	async fn same_account_shares_the_subscription() {
		let service = service();
		let chain_id = ChainId::new("polkadot");
		let alice = AccountId::from(ALICE);

		let first = service.attach_to_account(&chain_id, &alice, &alice, None);
		let second = service.attach_to_account(&chain_id, &alice, &alice, None);

		assert_eq!(first.cache_key, second.cache_key);
		assert_eq!(service.service.subscriber_count(&first.cache_key), 2);
		service.detach_from_account(&first, None);
		service.detach_from_account(&second, None);
		assert!(service.service.is_empty());
	}
}
