// SPDX-License-Identifier: GPL-3.0

//! Domain services translating wallet entities into remote subscriptions.
//!
//! Each service builds the [`SubscriptionRequest`]s of an entity, derives its [`CacheKey`] and
//! attaches through the shared [`RemoteSubscriptionService`]. [`WalletRemoteSubscription`] is the
//! exception: it opens a private subscription per caller and persists nothing.

mod balances;
mod pools;
mod proxy;
mod staking;
mod updating;
mod wallet;

pub use balances::BalanceRemoteSubscriptionService;
pub use pools::{NominationPoolsRemoteSubscriptionService, PoolId};
pub use proxy::ProxyRemoteSubscriptionService;
pub use staking::StakingRemoteSubscriptionService;
pub use updating::{AssetsUpdatingService, ChainSubscription};
pub use wallet::{WalletBalanceSubscription, WalletBalanceUpdate, WalletRemoteSubscription};

use crate::{
	events::EventCenter,
	handling::EventEmittingHandlingFactory,
	key::{CacheKey, CacheKeyBuilder},
	request::SubscriptionRequest,
	service::{Completion, RemoteSubscriptionService},
	types::{ChainId, SubscriptionId},
};
use std::sync::Arc;

/// An attachment made by a domain service. Hand it back to detach.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteSubscription {
	pub id: SubscriptionId,
	pub cache_key: CacheKey,
}

/// Attach `requests` with handlers persisting raw values and publishing storage change events.
///
/// The cache key is completed with the chain, the paths and the local keys of the requests.
pub(crate) fn attach_event_emitting(
	service: &RemoteSubscriptionService,
	events: &EventCenter,
	chain_id: &ChainId,
	requests: Vec<SubscriptionRequest>,
	cache_key: CacheKeyBuilder,
	completion: Option<Completion>,
) -> RemoteSubscription {
	let cache_key = cache_key
		.chain(chain_id)
		.paths(requests.iter().map(SubscriptionRequest::path))
		.local_keys(requests.iter().map(SubscriptionRequest::local_key))
		.build();
	let factory = Arc::new(EventEmittingHandlingFactory::new(chain_id.clone(), events.clone()));
	let id = service.attach(requests, chain_id, &cache_key, completion, Some(factory));
	RemoteSubscription { id, cache_key }
}
