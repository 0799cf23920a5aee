// SPDX-License-Identifier: GPL-3.0

//! Shared testing utilities for pop-sync tests.
//!
//! The mocks stand in for a node: [`MockConnection`] records subscriptions and replays updates,
//! [`MockRuntimeProvider`] serves a coder factory and can hold a setup pending until released.

use crate::{
	chain::{AssetModel, AssetType, ChainModel, StaticChainRegistry},
	coder::{CoderFactory, StaticCoderFactory},
	error::{HandlerError, RuntimeError, TransportError},
	handling::StorageChildHandler,
	runtime::RuntimeProvider,
	transaction::TransactionSubscription,
	transport::{Connection, StorageUpdate, StorageUpdateSink, SubscriptionHandle, SubscriptionMethod},
	types::{BlockHash, ChainId},
	values::{AccountData, AccountInfo, NEW_LOGIC_FLAG},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use scale::Encode;
use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
};
use tokio::sync::watch;

/// Alice's public key (Sr25519).
pub const ALICE: [u8; 32] = [
	0xd4, 0x35, 0x93, 0xc7, 0x15, 0xfd, 0xd3, 0x1c, 0x61, 0x14, 0x1a, 0xbd, 0x04, 0xa9, 0x9f, 0xd6,
	0x82, 0x2c, 0x85, 0x58, 0x85, 0x4c, 0xcd, 0xe3, 0x9a, 0x56, 0x84, 0xe7, 0xa5, 0x6d, 0xa2, 0x7d,
];

/// Bob's public key (Sr25519).
pub const BOB: [u8; 32] = [
	0x8e, 0xaf, 0x04, 0x15, 0x16, 0x87, 0x73, 0x63, 0x26, 0xc9, 0xfe, 0xa1, 0x7e, 0x25, 0xfc, 0x52,
	0x87, 0x61, 0x36, 0x93, 0xc9, 0x12, 0x90, 0x9c, 0xb2, 0x26, 0xaa, 0x47, 0x94, 0xf2, 0x6a, 0x48,
];

/// Compute Blake2_128Concat storage key for System::Account.
///
/// The key format is: twox128("System") ++ twox128("Account") ++ blake2_128(account) ++ account
pub fn account_storage_key(account: &[u8; 32]) -> Vec<u8> {
	let mut key = Vec::new();
	key.extend(sp_core::twox_128(b"System"));
	key.extend(sp_core::twox_128(b"Account"));
	key.extend(sp_core::blake2_128(account));
	key.extend(account);
	key
}

/// SCALE encoded `AccountInfo` in the fungible layout.
pub fn account_info(free: u128, reserved: u128, frozen: u128) -> Vec<u8> {
	AccountInfo {
		providers: 1,
		data: AccountData { free, reserved, frozen, flags: NEW_LOGIC_FLAG },
		..Default::default()
	}
	.encode()
}

/// A chain with its utility token only.
pub fn native_chain(chain_id: &str) -> ChainModel {
	ChainModel {
		chain_id: ChainId::new(chain_id),
		name: chain_id.to_string(),
		assets: vec![AssetModel {
			asset_id: 0,
			symbol: "UNIT".into(),
			enabled: true,
			asset_type: AssetType::Native,
		}],
		is_ethereum_based: false,
	}
}

/// A registry knowing `chain`, reachable through `connection` with `runtime`.
pub fn registry_with(
	chain: ChainModel,
	connection: Arc<dyn Connection>,
	runtime: Arc<dyn RuntimeProvider>,
) -> Arc<StaticChainRegistry> {
	let registry = Arc::new(StaticChainRegistry::new());
	let chain_id = chain.chain_id.clone();
	registry.add_chain(chain);
	registry.set_connection(&chain_id, connection);
	registry.set_runtime_provider(&chain_id, runtime);
	registry
}

struct MockSubscription {
	handle: SubscriptionHandle,
	params: Vec<String>,
	sink: Arc<dyn StorageUpdateSink>,
}

#[derive(Default)]
struct ConnectionState {
	subscriptions: Vec<MockSubscription>,
	cancelled: Vec<SubscriptionHandle>,
}

/// In-memory [`Connection`] recording every subscribe and cancel.
///
/// A gated connection holds every subscribe until [`MockConnection::open`] is called.
pub struct MockConnection {
	state: Mutex<ConnectionState>,
	next_handle: AtomicU64,
	gate: watch::Sender<bool>,
	failing: bool,
}

impl Default for MockConnection {
	fn default() -> Self {
		Self {
			state: Mutex::default(),
			next_handle: AtomicU64::new(0),
			gate: watch::Sender::new(true),
			failing: false,
		}
	}
}

impl MockConnection {
	pub fn new() -> Self {
		Self::default()
	}

	/// A connection rejecting every subscription.
	pub fn failing() -> Self {
		Self { failing: true, ..Default::default() }
	}

	/// A connection whose subscribes wait for [`Self::open`].
	pub fn gated() -> Self {
		let connection = Self::new();
		connection.gate.send_replace(false);
		connection
	}

	/// Release held and future subscribes.
	pub fn open(&self) {
		self.gate.send_replace(true);
	}

	/// Parameters of every subscription opened so far, cancelled ones included.
	pub fn subscribed_params(&self) -> Vec<Vec<String>> {
		self.state.lock().subscriptions.iter().map(|sub| sub.params.clone()).collect()
	}

	pub fn subscription_count(&self) -> usize {
		self.state.lock().subscriptions.len()
	}

	pub fn cancelled(&self) -> Vec<SubscriptionHandle> {
		self.state.lock().cancelled.clone()
	}

	/// Subscriptions opened and not cancelled.
	pub fn active_count(&self) -> usize {
		let state = self.state.lock();
		state.subscriptions.iter().filter(|sub| !state.cancelled.contains(&sub.handle)).count()
	}

	/// Deliver `update` to every sink ever registered, cancelled ones included.
	pub async fn push(&self, update: StorageUpdate) {
		let sinks: Vec<_> = self.state.lock().subscriptions.iter().map(|sub| sub.sink.clone()).collect();
		for sink in sinks {
			sink.on_update(update.clone()).await;
		}
	}
}

#[async_trait]
impl Connection for MockConnection {
	async fn subscribe(
		&self,
		method: SubscriptionMethod,
		params: Vec<String>,
		sink: Arc<dyn StorageUpdateSink>,
	) -> Result<SubscriptionHandle, TransportError> {
		let mut gate = self.gate.subscribe();
		// The sender lives as long as the connection.
		let _ = gate.wait_for(|open| *open).await;
		if self.failing {
			return Err(TransportError::SubscriptionFailed {
				method: method.subscribe,
				message: "connection refused".into(),
			});
		}
		let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
		self.state.lock().subscriptions.push(MockSubscription { handle, params, sink });
		Ok(handle)
	}

	fn cancel(&self, handle: SubscriptionHandle) {
		self.state.lock().cancelled.push(handle);
	}
}

/// [`RuntimeProvider`] serving a fixed coder factory.
///
/// A gated provider holds every fetch until [`MockRuntimeProvider::open`] is called.
pub struct MockRuntimeProvider {
	coder: Arc<dyn CoderFactory>,
	gate: watch::Sender<bool>,
	failure: Option<RuntimeError>,
	snapshot: AtomicBool,
	fetches: AtomicUsize,
}

impl MockRuntimeProvider {
	/// A provider serving [`StaticCoderFactory::polkadot_sdk_defaults`].
	pub fn new() -> Self {
		Self::with_coder(StaticCoderFactory::polkadot_sdk_defaults())
	}

	pub fn with_coder(coder: impl CoderFactory + 'static) -> Self {
		Self {
			coder: Arc::new(coder),
			gate: watch::Sender::new(true),
			failure: None,
			snapshot: AtomicBool::new(true),
			fetches: AtomicUsize::new(0),
		}
	}

	/// A provider whose fetches wait for [`Self::open`].
	pub fn gated() -> Self {
		let provider = Self::new();
		provider.gate.send_replace(false);
		provider
	}

	/// A provider failing every fetch with `error`.
	pub fn failing(error: RuntimeError) -> Self {
		Self { failure: Some(error), ..Self::new() }
	}

	/// Release held and future fetches.
	pub fn open(&self) {
		self.gate.send_replace(true);
	}

	pub fn set_snapshot(&self, available: bool) {
		self.snapshot.store(available, Ordering::Release);
	}

	pub fn fetch_count(&self) -> usize {
		self.fetches.load(Ordering::Acquire)
	}
}

impl Default for MockRuntimeProvider {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl RuntimeProvider for MockRuntimeProvider {
	async fn fetch_coder_factory(&self) -> Result<Arc<dyn CoderFactory>, RuntimeError> {
		self.fetches.fetch_add(1, Ordering::AcqRel);
		let mut gate = self.gate.subscribe();
		// The sender lives as long as the provider.
		let _ = gate.wait_for(|open| *open).await;
		match &self.failure {
			Some(error) => Err(error.clone()),
			None => Ok(self.coder.clone()),
		}
	}

	fn has_snapshot(&self) -> bool {
		self.snapshot.load(Ordering::Acquire)
	}
}

/// Handler recording every value it receives.
#[derive(Default)]
pub struct RecordingHandler {
	values: Mutex<Vec<Option<Vec<u8>>>>,
	failing: bool,
}

impl RecordingHandler {
	/// A handler recording values, then failing.
	pub fn failing() -> Self {
		Self { failing: true, ..Default::default() }
	}

	pub fn values(&self) -> Vec<Option<Vec<u8>>> {
		self.values.lock().clone()
	}
}

#[async_trait]
impl StorageChildHandler for RecordingHandler {
	async fn handle(&self, value: Option<Vec<u8>>, _block: Option<BlockHash>) -> Result<(), HandlerError> {
		self.values.lock().push(value);
		if self.failing {
			return Err(HandlerError::decode("recording", "rejected".into()));
		}
		Ok(())
	}
}

/// Transaction subscription recording the blocks it is asked to process.
#[derive(Default)]
pub struct RecordingTransactionSubscription {
	blocks: Mutex<Vec<BlockHash>>,
}

impl RecordingTransactionSubscription {
	pub fn blocks(&self) -> Vec<BlockHash> {
		self.blocks.lock().clone()
	}
}

impl TransactionSubscription for RecordingTransactionSubscription {
	fn process(&self, block_hash: BlockHash) {
		self.blocks.lock().push(block_hash);
	}
}
