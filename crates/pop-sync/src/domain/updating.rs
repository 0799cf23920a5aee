// SPDX-License-Identifier: GPL-3.0

//! Keeps the balance subscriptions of the selected account in line with the known chains.

use super::{BalanceRemoteSubscriptionService, RemoteSubscription};
use crate::{
	chain::{ChainChange, ChainModel, ChainRegistry, MetaAccount, RegistryEvent},
	key::CacheKey,
	service::Completion,
	strings::keys,
	transaction::TransactionSubscriptionFactory,
	types::{AccountId, AssetId, ChainId, SubscriptionId},
};
use parking_lot::Mutex;
use std::{
	collections::{BTreeSet, HashMap},
	sync::Arc,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Balance subscription held for one chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainSubscription {
	pub id: SubscriptionId,
	pub cache_key: CacheKey,
	/// Account the subscription tracks.
	pub account_id: AccountId,
	/// Assets the subscription was requested for.
	pub asset_ids: BTreeSet<AssetId>,
}

impl ChainSubscription {
	fn remote(&self) -> RemoteSubscription {
		RemoteSubscription { id: self.id, cache_key: self.cache_key.clone() }
	}
}

#[derive(Default)]
struct State {
	account: Option<MetaAccount>,
	subscribed_chains: HashMap<ChainId, ChainSubscription>,
}

struct Inner {
	balances: Arc<BalanceRemoteSubscriptionService>,
	registry: Arc<dyn ChainRegistry>,
	transactions: Option<Arc<dyn TransactionSubscriptionFactory>>,
	state: Mutex<State>,
}

/// Subscribes the selected account to the balances of every enabled asset of every chain.
///
/// Chain changes are picked up from the registry once [`AssetsUpdatingService::start`] is called.
pub struct AssetsUpdatingService {
	inner: Arc<Inner>,
	listener: Mutex<Option<DropGuard>>,
}

impl AssetsUpdatingService {
	/// # Arguments
	/// * `balances` - Service attaching the balance subscriptions.
	/// * `transactions` - Source of the per chain transaction subscriptions, if any.
	pub fn new(
		balances: Arc<BalanceRemoteSubscriptionService>,
		transactions: Option<Arc<dyn TransactionSubscriptionFactory>>,
	) -> Self {
		let registry = balances.service().registry().clone();
		Self {
			inner: Arc::new(Inner { balances, registry, transactions, state: Mutex::default() }),
			listener: Mutex::new(None),
		}
	}

	/// Evaluate every known chain and follow registry events until [`Self::stop`].
	pub fn start(&self) {
		let mut listener = self.listener.lock();
		if listener.is_some() {
			return;
		}
		// Subscribe before evaluating so no change slips in between.
		let events = self.inner.registry.subscribe_events();
		self.inner.evaluate_all();
		let token = CancellationToken::new();
		self.inner
			.balances
			.service()
			.runtime()
			.spawn(Inner::listen(self.inner.clone(), events, token.clone()));
		*listener = Some(token.drop_guard());
	}

	/// Stop following the registry and detach every subscription.
	pub fn stop(&self) {
		drop(self.listener.lock().take());
		self.inner.detach_all();
	}

	/// Apply chain insertions, updates and removals.
	pub fn handle_chain_changes(&self, changes: &[ChainChange]) {
		self.inner.handle_chain_changes(changes)
	}

	/// Subscribe a chain whose runtime just became available, unless already subscribed.
	pub fn handle_runtime_ready(&self, chain_id: &ChainId) {
		self.inner.handle_runtime_ready(chain_id)
	}

	/// Replace the selected account, moving every subscription over to it.
	pub fn update_account(&self, account: MetaAccount) {
		let subscriptions: Vec<_> = {
			let mut state = self.inner.state.lock();
			state.account = Some(account);
			state.subscribed_chains.drain().collect()
		};
		for (_, subscription) in subscriptions {
			self.inner.balances.detach(&subscription.remote(), None);
		}
		self.inner.evaluate_all();
	}

	/// The subscription held for a chain.
	pub fn subscription(&self, chain_id: &ChainId) -> Option<ChainSubscription> {
		self.inner.state.lock().subscribed_chains.get(chain_id).cloned()
	}

	/// Assets subscribed to on a chain.
	pub fn subscribed_assets(&self, chain_id: &ChainId) -> BTreeSet<AssetId> {
		self.subscription(chain_id).map(|subscription| subscription.asset_ids).unwrap_or_default()
	}
}

impl Drop for AssetsUpdatingService {
	fn drop(&mut self) {
		self.stop();
	}
}

impl Inner {
	async fn listen(
		inner: Arc<Inner>,
		mut events: broadcast::Receiver<RegistryEvent>,
		token: CancellationToken,
	) {
		loop {
			let event = tokio::select! {
				_ = token.cancelled() => break,
				event = events.recv() => event,
			};
			match event {
				Ok(RegistryEvent::ChainsChanged(changes)) => inner.handle_chain_changes(&changes),
				Ok(RegistryEvent::RuntimeReady(chain_id)) => inner.handle_runtime_ready(&chain_id),
				Err(RecvError::Lagged(skipped)) => {
					log::warn!("Missed {skipped} registry events, re-evaluating all chains");
					inner.evaluate_all();
				},
				Err(RecvError::Closed) => break,
			}
		}
		log::debug!("Stopped following registry events");
	}

	fn handle_chain_changes(&self, changes: &[ChainChange]) {
		for change in changes {
			match change {
				ChainChange::Insert(chain) | ChainChange::Update(chain) => self.evaluate(chain),
				ChainChange::Delete(chain_id) => {
					let removed = self.state.lock().subscribed_chains.remove(chain_id);
					if let Some(subscription) = removed {
						log::debug!("Chain {chain_id} removed, detaching its balances");
						self.balances.detach(&subscription.remote(), None);
					}
				},
			}
		}
	}

	fn handle_runtime_ready(&self, chain_id: &ChainId) {
		if self.state.lock().subscribed_chains.contains_key(chain_id) {
			return;
		}
		if let Some(chain) = self.registry.chain(chain_id) {
			self.evaluate(&chain);
		}
	}

	fn evaluate_all(&self) {
		for chain in self.registry.chains() {
			self.evaluate(&chain);
		}
	}

	fn detach_all(&self) {
		let subscriptions: Vec<_> = self.state.lock().subscribed_chains.drain().collect();
		for (_, subscription) in subscriptions {
			self.balances.detach(&subscription.remote(), None);
		}
	}

	/// Bring the subscription of `chain` in line with its eligible assets.
	fn evaluate(&self, chain: &ChainModel) {
		let chain_id = &chain.chain_id;
		let ready = self.registry.runtime_provider(chain_id).is_some_and(|runtime| runtime.has_snapshot());
		if !ready {
			log::trace!("Runtime of {chain_id} not ready yet");
			return;
		}

		let mut state = self.state.lock();
		let account = state.account.as_ref().and_then(|account| account.account_for(chain)).cloned();
		let eligible: BTreeSet<AssetId> = match account {
			Some(_) => chain
				.assets
				.iter()
				.filter(|asset| asset.enabled && asset.is_subscribable())
				.map(|asset| asset.asset_id)
				.collect(),
			None => BTreeSet::new(),
		};
		let unchanged = match (state.subscribed_chains.get(chain_id), &account) {
			(Some(current), Some(account)) => current.account_id == *account && current.asset_ids == eligible,
			(None, _) => eligible.is_empty(),
			(Some(_), None) => false,
		};
		if unchanged {
			return;
		}

		// The old subscription goes first, cancelling its setup if still pending.
		if let Some(old) = state.subscribed_chains.remove(chain_id) {
			log::debug!("Assets of {chain_id} changed, detaching {}", old.cache_key);
			self.balances.detach(&old.remote(), None);
		}
		let Some(account) = account.filter(|_| !eligible.is_empty()) else {
			return;
		};

		let transaction = self.transactions.as_ref().and_then(|factory| factory.create(&account, chain));
		let target = chain_id.clone();
		let completion = Completion::new(move |result| {
			if let Err(err) = result {
				log::error!("Failed to subscribe to balances on {target}: {err}");
			}
		});
		let attached = self.balances.attach(
			keys::BALANCES,
			&account,
			chain,
			Some(&eligible),
			transaction,
			Some(completion),
		);
		if let Some(subscription) = attached {
			log::debug!("Subscribed {} assets of {chain_id}", eligible.len());
			state.subscribed_chains.insert(
				chain_id.clone(),
				ChainSubscription {
					id: subscription.id,
					cache_key: subscription.cache_key,
					account_id: account,
					asset_ids: eligible,
				},
			);
		}
	}
}
