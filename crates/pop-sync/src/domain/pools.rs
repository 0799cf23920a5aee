// SPDX-License-Identifier: GPL-3.0

use super::{RemoteSubscription, attach_event_emitting};
use crate::{
	events::EventCenter,
	key::{CacheKeyBuilder, LocalStorageKeyFactory},
	path::StoragePath,
	request::{KeyParam, SubscriptionRequest},
	service::{Completion, RemoteSubscriptionService},
	strings::keys,
	types::{AccountId, ChainId},
};
use scale::Encode;
use std::sync::Arc;

/// Identifier of a nomination pool.
pub type PoolId = u32;

/// Subscribes to nomination pool memberships and pools.
pub struct NominationPoolsRemoteSubscriptionService {
	service: Arc<RemoteSubscriptionService>,
	events: EventCenter,
	local_keys: LocalStorageKeyFactory,
}

impl NominationPoolsRemoteSubscriptionService {
	pub fn new(service: Arc<RemoteSubscriptionService>, events: EventCenter) -> Self {
		Self { service, events, local_keys: LocalStorageKeyFactory }
	}

	/// Subscribe to the pool membership of `account`.
	pub fn attach_to_pool_member(
		&self,
		chain_id: &ChainId,
		account: &AccountId,
		completion: Option<Completion>,
	) -> RemoteSubscription {
		let path = StoragePath::POOL_MEMBERS;
		let local_key = self.local_keys.create_for_account(&path, account, chain_id);
		let requests = vec![SubscriptionRequest::map(path, local_key, KeyParam::from(account))];
		let cache_key = CacheKeyBuilder::new(keys::POOL_MEMBER).account(account);
		attach_event_emitting(&self.service, &self.events, chain_id, requests, cache_key, completion)
	}

	pub fn detach_from_pool_member(
		&self,
		subscription: &RemoteSubscription,
		completion: Option<Completion>,
	) {
		self.service.detach(&subscription.cache_key, subscription.id, completion);
	}

	/// Subscribe to the state of a pool, together with the pool member limit.
	pub fn attach_to_pool(
		&self,
		chain_id: &ChainId,
		pool_id: PoolId,
		completion: Option<Completion>,
	) -> RemoteSubscription {
		let requests = self.pool_requests(chain_id, pool_id);
		let cache_key = CacheKeyBuilder::new(keys::POOL);
		attach_event_emitting(&self.service, &self.events, chain_id, requests, cache_key, completion)
	}

	pub fn detach_from_pool(&self, subscription: &RemoteSubscription, completion: Option<Completion>) {
		self.service.detach(&subscription.cache_key, subscription.id, completion);
	}

	fn pool_requests(&self, chain_id: &ChainId, pool_id: PoolId) -> Vec<SubscriptionRequest> {
		let mut requests: Vec<_> =
			[StoragePath::BONDED_POOLS, StoragePath::REWARD_POOLS, StoragePath::SUB_POOLS]
				.into_iter()
				.map(|path| {
					let local_key = self.local_keys.create(&path, &[pool_id.encode()], chain_id);
					SubscriptionRequest::map(path, local_key, KeyParam::U32(pool_id))
				})
				.collect();
		let limit = StoragePath::MAX_POOL_MEMBERS_PER_POOL;
		let limit_key = self.local_keys.create(&limit, &[], chain_id);
		requests.push(SubscriptionRequest::unkeyed(limit, limit_key));
		requests
	}
}
