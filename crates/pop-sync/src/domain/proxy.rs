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
use std::sync::Arc;

/// Subscribes to the proxies of an account.
pub struct ProxyRemoteSubscriptionService {
	service: Arc<RemoteSubscriptionService>,
	events: EventCenter,
}

impl ProxyRemoteSubscriptionService {
	pub fn new(service: Arc<RemoteSubscriptionService>, events: EventCenter) -> Self {
		Self { service, events }
	}

	pub fn attach_to_proxies(
		&self,
		chain_id: &ChainId,
		account: &AccountId,
		completion: Option<Completion>,
	) -> RemoteSubscription {
		let path = StoragePath::PROXY_PROXIES;
		let local_key = LocalStorageKeyFactory.create_for_account(&path, account, chain_id);
		let requests = vec![SubscriptionRequest::map(path, local_key, KeyParam::from(account))];
		let cache_key = CacheKeyBuilder::new(keys::PROXY).account(account);
		attach_event_emitting(&self.service, &self.events, chain_id, requests, cache_key, completion)
	}

	pub fn detach_from_proxies(&self, subscription: &RemoteSubscription, completion: Option<Completion>) {
		self.service.detach(&subscription.cache_key, subscription.id, completion);
	}
}
