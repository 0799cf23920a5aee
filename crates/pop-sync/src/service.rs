// SPDX-License-Identifier: GPL-3.0

//! Remote subscription lifecycle management.
//!
//! [`RemoteSubscriptionService`] deduplicates subscriptions by [`CacheKey`]: every attach with the
//! same key shares one physical subscription, which is torn down once the last subscriber
//! detaches.
//!
//! # Lifecycle
//!
//! ```text
//!            attach                     setup succeeded
//!  Absent ─────────────▶ Pending ─────────────────────────▶ Active
//!    ▲                     │  │                               │
//!    │   setup failed      │  │ last detach                   │ last detach
//!    ├─────────────────────┘  │ (setup cancelled)             │ (container unsubscribed)
//!    ◀────────────────────────┴───────────────────────────────┘
//! ```
//!
//! The setup of a Pending subscription runs on a tokio task: it resolves the chain's runtime,
//! encodes every remote key, opens the transport subscription and builds the
//! [`StorageSubscriptionContainer`]. The Pending record owns the task's cancellation token, so
//! removing the record cancels the setup. Each setup carries a generation number; a setup that
//! completes after its record was removed or replaced finds no matching record and tears down
//! whatever it built.
//!
//! All state lives behind one mutex that is never held across an `.await`. Completions are
//! delivered after the lock is released.

use crate::{
	chain::ChainRegistry,
	container::{ChildHandler, StorageSubscriptionContainer},
	error::{KeyEncodingError, SubscriptionError, SubscriptionResult},
	handling::{RawStorageHandlingFactory, SubscriptionHandlingFactory},
	key::{CacheKey, StorageKeyFactory},
	request::{CoderProvider, KeyPair, SubscriptionRequest},
	store::PersistenceStore,
	types::{ChainId, SubscriptionId},
};
use futures::future::{FutureExt, join_all};
use parking_lot::Mutex;
use std::{
	collections::{HashMap, HashSet},
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
};
use tokio::{runtime::Handle, sync::oneshot};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Callback receiving the outcome of an attach or detach.
pub struct Completion {
	handle: Option<Handle>,
	callback: Box<dyn FnOnce(SubscriptionResult) + Send>,
}

impl Completion {
	/// Run `callback` on the service's runtime.
	pub fn new(callback: impl FnOnce(SubscriptionResult) + Send + 'static) -> Self {
		Self { handle: None, callback: Box::new(callback) }
	}

	/// Run `callback` on a specific runtime.
	pub fn on(handle: Handle, callback: impl FnOnce(SubscriptionResult) + Send + 'static) -> Self {
		Self { handle: Some(handle), callback: Box::new(callback) }
	}

	/// A completion forwarding the outcome to a oneshot channel.
	pub fn channel() -> (Self, oneshot::Receiver<SubscriptionResult>) {
		let (sender, receiver) = oneshot::channel();
		let completion = Self::new(move |result| {
			// The receiver may be gone.
			let _ = sender.send(result);
		});
		(completion, receiver)
	}

	fn deliver(self, result: SubscriptionResult, default: &Handle) {
		let Completion { handle, callback } = self;
		let handle = handle.unwrap_or_else(|| default.clone());
		handle.spawn(async move { callback(result) });
	}
}

/// Observable state of a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionState {
	/// Setup is in progress.
	Pending,
	/// The physical subscription is open.
	Active,
}

enum Record {
	Pending {
		generation: u64,
		ids: HashSet<SubscriptionId>,
		completions: HashMap<SubscriptionId, Completion>,
		setup: DropGuard,
	},
	Active {
		ids: HashSet<SubscriptionId>,
		container: StorageSubscriptionContainer,
	},
}

impl Record {
	fn ids(&self) -> &HashSet<SubscriptionId> {
		match self {
			Record::Pending { ids, .. } | Record::Active { ids, .. } => ids,
		}
	}
}

/// Everything a setup task needs.
struct Setup {
	requests: Vec<SubscriptionRequest>,
	chain_id: ChainId,
	cache_key: CacheKey,
	generation: u64,
	handling_factory: Arc<dyn SubscriptionHandlingFactory>,
}

struct Shared {
	registry: Arc<dyn ChainRegistry>,
	store: Arc<dyn PersistenceStore>,
	runtime: Handle,
	key_factory: StorageKeyFactory,
	records: Mutex<HashMap<CacheKey, Record>>,
	generation: AtomicU64,
}

/// Reference-counted, deduplicated storage subscriptions.
pub struct RemoteSubscriptionService {
	shared: Arc<Shared>,
}

impl RemoteSubscriptionService {
	/// Create a service running setups on `runtime`.
	///
	/// # Arguments
	/// * `registry` - Source of each chain's runtime and connection.
	/// * `store` - Where handlers persist decoded values.
	/// * `runtime` - Runtime setup tasks and completions are spawned on.
	pub fn new(
		registry: Arc<dyn ChainRegistry>,
		store: Arc<dyn PersistenceStore>,
		runtime: Handle,
	) -> Self {
		Self {
			shared: Arc::new(Shared {
				registry,
				store,
				runtime,
				key_factory: StorageKeyFactory,
				records: Mutex::default(),
				generation: AtomicU64::new(0),
			}),
		}
	}

	/// Create a service running setups on the current tokio runtime.
	///
	/// # Panics
	/// When called outside of a tokio runtime.
	pub fn with_current_runtime(
		registry: Arc<dyn ChainRegistry>,
		store: Arc<dyn PersistenceStore>,
	) -> Self {
		Self::new(registry, store, Handle::current())
	}

	/// Registry resolving the runtime and connection of each chain.
	pub fn registry(&self) -> &Arc<dyn ChainRegistry> {
		&self.shared.registry
	}

	/// Store handlers persist values into.
	pub fn store(&self) -> &Arc<dyn PersistenceStore> {
		&self.shared.store
	}

	/// Runtime setup tasks and completions run on.
	pub fn runtime(&self) -> &Handle {
		&self.shared.runtime
	}

	/// Attach to the subscription identified by `cache_key`, starting it if needed.
	///
	/// Returns immediately. `completion` receives `Ok(())` once the subscription is active, or the
	/// setup error.
	///
	/// # Arguments
	/// * `requests` - Storage entries to subscribe to. Only used when the subscription is started.
	/// * `chain_id` - Chain the entries belong to.
	/// * `cache_key` - Identity of the subscription.
	/// * `completion` - Receiver of the outcome.
	/// * `handling_factory` - Handler factory for the keys, [`RawStorageHandlingFactory`] if
	///   `None`.
	pub fn attach(
		&self,
		requests: Vec<SubscriptionRequest>,
		chain_id: &ChainId,
		cache_key: &CacheKey,
		completion: Option<Completion>,
		handling_factory: Option<Arc<dyn SubscriptionHandlingFactory>>,
	) -> SubscriptionId {
		let id = SubscriptionId::new();
		let ready = {
			let mut records = self.shared.records.lock();
			match records.get_mut(cache_key) {
				Some(Record::Active { ids, .. }) => {
					ids.insert(id);
					completion
				},
				Some(Record::Pending { ids, completions, .. }) => {
					ids.insert(id);
					if let Some(completion) = completion {
						completions.insert(id, completion);
					}
					None
				},
				None => {
					let generation = self.shared.generation.fetch_add(1, Ordering::Relaxed);
					let token = CancellationToken::new();
					let setup = Setup {
						requests,
						chain_id: chain_id.clone(),
						cache_key: cache_key.clone(),
						generation,
						handling_factory: handling_factory
							.unwrap_or_else(|| Arc::new(RawStorageHandlingFactory)),
					};
					// The task can only complete through the lock, after the record below exists.
					self.shared.runtime.spawn(Shared::run_setup(self.shared.clone(), setup, token.clone()));
					log::debug!("Starting subscription {cache_key} on {chain_id}");
					records.insert(
						cache_key.clone(),
						Record::Pending {
							generation,
							ids: HashSet::from([id]),
							completions: completion
								.map(|completion| HashMap::from([(id, completion)]))
								.unwrap_or_default(),
							setup: token.drop_guard(),
						},
					);
					None
				},
			}
		};
		if let Some(completion) = ready {
			completion.deliver(Ok(()), &self.shared.runtime);
		}
		id
	}

	/// Detach `id` from the subscription identified by `cache_key`.
	///
	/// The last detach cancels a pending setup or unsubscribes an active subscription. Unknown
	/// keys and ids are ignored. `completion` always receives `Ok(())`.
	pub fn detach(&self, cache_key: &CacheKey, id: SubscriptionId, completion: Option<Completion>) {
		let removed = {
			let mut records = self.shared.records.lock();
			let now_empty = match records.get_mut(cache_key) {
				Some(Record::Active { ids, .. }) => ids.remove(&id) && ids.is_empty(),
				Some(Record::Pending { ids, completions, .. }) => {
					completions.remove(&id);
					ids.remove(&id) && ids.is_empty()
				},
				None => false,
			};
			if now_empty { records.remove(cache_key) } else { None }
		};
		// Dropped outside the lock: cancels the setup or unsubscribes the container.
		if let Some(record) = removed {
			match record {
				Record::Pending { .. } => log::debug!("Cancelled pending subscription {cache_key}"),
				Record::Active { .. } => log::debug!("Closed subscription {cache_key}"),
			}
		}
		if let Some(completion) = completion {
			completion.deliver(Ok(()), &self.shared.runtime);
		}
	}

	/// State of the subscription identified by `cache_key`, if any.
	pub fn state(&self, cache_key: &CacheKey) -> Option<SubscriptionState> {
		self.shared.records.lock().get(cache_key).map(|record| match record {
			Record::Pending { .. } => SubscriptionState::Pending,
			Record::Active { .. } => SubscriptionState::Active,
		})
	}

	/// Number of ids attached to the subscription identified by `cache_key`.
	pub fn subscriber_count(&self, cache_key: &CacheKey) -> usize {
		self.shared.records.lock().get(cache_key).map_or(0, |record| record.ids().len())
	}

	/// Number of subscriptions, pending or active.
	pub fn len(&self) -> usize {
		self.shared.records.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Drop for RemoteSubscriptionService {
	fn drop(&mut self) {
		let records: Vec<_> = self.shared.records.lock().drain().collect();
		if !records.is_empty() {
			log::debug!("Dropping {} subscriptions", records.len());
		}
	}
}

impl Shared {
	async fn run_setup(shared: Arc<Shared>, setup: Setup, token: CancellationToken) {
		let result = tokio::select! {
			_ = token.cancelled() => {
				log::debug!("Setup of {} cancelled", setup.cache_key);
				return;
			},
			result = shared.establish(&setup) => result,
		};
		shared.complete(&setup.cache_key, setup.generation, result);
	}

	async fn establish(&self, setup: &Setup) -> Result<StorageSubscriptionContainer, SubscriptionError> {
		let chain_id = &setup.chain_id;
		let provider = self.registry.runtime_provider(chain_id).ok_or_else(|| {
			SubscriptionError::RuntimeUnavailable {
				chain_id: chain_id.clone(),
				message: "no runtime provider".into(),
			}
		})?;
		let coder: CoderProvider =
			async move { provider.fetch_coder_factory().await }.boxed().shared();
		coder.clone().await.map_err(|err| SubscriptionError::runtime(chain_id, err))?;

		let results = join_all(
			setup
				.requests
				.iter()
				.map(|request| request.key_encoding(self.key_factory, coder.clone())),
		)
		.await;
		let pairs = surviving_pairs(&setup.requests, results)?;

		let connection = self
			.registry
			.connection(chain_id)
			.ok_or_else(|| SubscriptionError::ConnectionUnavailable(chain_id.clone()))?;
		let handlers = pairs
			.into_iter()
			.map(|KeyPair { remote_key, local_key }| ChildHandler {
				handler: setup.handling_factory.create_handler(
					&remote_key,
					&local_key,
					self.store.clone(),
				),
				remote_key,
				local_key,
			})
			.collect();
		Ok(StorageSubscriptionContainer::subscribe(connection, handlers).await?)
	}

	/// Publish the outcome of a setup if its Pending record is still current.
	fn complete(
		&self,
		cache_key: &CacheKey,
		generation: u64,
		result: Result<StorageSubscriptionContainer, SubscriptionError>,
	) {
		let mut stale = None;
		let delivered = {
			let mut records = self.records.lock();
			match records.remove(cache_key) {
				Some(Record::Pending { generation: current, ids, completions, setup })
					if current == generation && !ids.is_empty() =>
				{
					let _ = setup.disarm();
					match result {
						Ok(container) => {
							records.insert(cache_key.clone(), Record::Active { ids, container });
							Some((completions, Ok(())))
						},
						Err(err) => Some((completions, Err(err))),
					}
				},
				other => {
					if let Some(record) = other {
						records.insert(cache_key.clone(), record);
					}
					stale = result.ok();
					None
				},
			}
		};

		if let Some(container) = stale {
			log::debug!("Discarding stale subscription {cache_key}");
			drop(container);
			return;
		}
		let Some((completions, result)) = delivered else { return };
		match &result {
			Ok(()) => log::debug!("Subscription {cache_key} active"),
			Err(err) => log::error!("Subscription {cache_key} failed: {err}"),
		}
		for completion in completions.into_values() {
			completion.deliver(result.clone(), &self.runtime);
		}
	}
}

/// Pair every request with its encoding result and keep the successful ones.
///
/// Each result must carry the local key of its request. Requests whose path is missing from the
/// runtime or whose key failed to encode are dropped.
fn surviving_pairs(
	requests: &[SubscriptionRequest],
	results: Vec<Result<KeyPair, KeyEncodingError>>,
) -> Result<Vec<KeyPair>, SubscriptionError> {
	if results.len() != requests.len() {
		return Err(SubscriptionError::RemoteKeysNotMatchLocal {
			expected: format!("{} requests", requests.len()),
			actual: format!("{} keys", results.len()),
		});
	}
	let mut pairs = Vec::with_capacity(requests.len());
	for (request, result) in requests.iter().zip(results) {
		match result {
			Ok(pair) if pair.local_key != request.local_key() =>
				return Err(SubscriptionError::RemoteKeysNotMatchLocal {
					expected: request.local_key().to_string(),
					actual: pair.local_key,
				}),
			Ok(pair) => pairs.push(pair),
			Err(err) if err.is_missing_path() => log::warn!("Skipping {}: {err}", request.local_key()),
			Err(err) => log::error!("Failed to encode key of {}: {err}", request.local_key()),
		}
	}
	if pairs.is_empty() {
		return Err(SubscriptionError::NoStorageKeys);
	}
	Ok(pairs)
}
