// SPDX-License-Identifier: GPL-3.0

//! Assets updating service reacting to chain, runtime and account changes.

use pop_sync::{
	AssetsUpdatingService, BalanceRemoteSubscriptionService, EventCenter, MemoryStore, MetaAccount,
	RemoteSubscriptionService, StaticChainRegistry, SubscriptionState,
	chain::{AssetModel, AssetType, ChainChange, ChainModel},
	testing::{ALICE, MockConnection, MockRuntimeProvider, native_chain, registry_with},
	transaction::{TransactionSubscription, TransactionSubscriptionFactory},
	types::{AccountId, BlockHash, ChainId},
};
use std::{
	collections::BTreeSet,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

fn chain_with_token(token_enabled: bool) -> ChainModel {
	let mut chain = native_chain("asset-hub");
	chain.assets.push(AssetModel {
		asset_id: 1,
		symbol: "USDC".into(),
		enabled: token_enabled,
		asset_type: AssetType::Statemine { pallet_name: None, id: "1337".into() },
	});
	chain
}

fn updating_service(
	registry: Arc<StaticChainRegistry>,
	transactions: Option<Arc<dyn TransactionSubscriptionFactory>>,
) -> (AssetsUpdatingService, Arc<RemoteSubscriptionService>) {
	let _ = env_logger::builder().is_test(true).try_init();
	let service = Arc::new(RemoteSubscriptionService::with_current_runtime(
		registry,
		Arc::new(MemoryStore::new()),
	));
	let balances = Arc::new(BalanceRemoteSubscriptionService::new(service.clone(), EventCenter::default()));
	(AssetsUpdatingService::new(balances, transactions), service)
}

/// Poll `condition` until it holds, failing the test after a second.
async fn eventually(condition: impl Fn() -> bool) {
	for _ in 0..100 {
		if condition() {
			return;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	panic!("condition not met in time");
}

#[tokio::test]
async fn asset_change_while_pending_detaches_before_attaching() {
	let connection = Arc::new(MockConnection::new());
	let runtime = Arc::new(MockRuntimeProvider::gated());
	let registry = registry_with(chain_with_token(true), connection.clone(), runtime.clone());
	let (updating, service) = updating_service(registry, None);
	let chain_id = ChainId::new("asset-hub");

	updating.update_account(MetaAccount::substrate(AccountId::from(ALICE)));
	let old = updating.subscription(&chain_id).unwrap();
	assert_eq!(old.asset_ids, BTreeSet::from([0, 1]));
	assert_eq!(service.state(&old.cache_key), Some(SubscriptionState::Pending));

	updating.handle_chain_changes(&[ChainChange::Update(chain_with_token(false))]);
	let new = updating.subscription(&chain_id).unwrap();
	assert_eq!(new.asset_ids, BTreeSet::from([0]));
	assert_ne!(old.cache_key, new.cache_key);
	assert_eq!(service.state(&old.cache_key), None);
	assert_eq!(service.state(&new.cache_key), Some(SubscriptionState::Pending));
	assert_eq!(service.len(), 1);

	runtime.open();
	eventually(|| service.state(&new.cache_key) == Some(SubscriptionState::Active)).await;
	assert_eq!(connection.subscription_count(), 1);
	assert_eq!(connection.subscribed_params()[0].len(), 4);
}

#[derive(Default)]
struct CountingFactory {
	created: AtomicUsize,
}

struct NoopTransactions;

impl TransactionSubscription for NoopTransactions {
	fn process(&self, _block_hash: BlockHash) {}
}

impl TransactionSubscriptionFactory for CountingFactory {
	fn create(&self, _account: &AccountId, _chain: &ChainModel) -> Option<Arc<dyn TransactionSubscription>> {
		self.created.fetch_add(1, Ordering::SeqCst);
		Some(Arc::new(NoopTransactions))
	}
}

#[tokio::test]
async fn follows_registry_events_until_stopped() {
	let registry = Arc::new(StaticChainRegistry::new());
	let transactions = Arc::new(CountingFactory::default());
	let (updating, service) = updating_service(registry.clone(), Some(transactions.clone()));
	let chain = native_chain("polkadot");
	let chain_id = chain.chain_id.clone();
	let connection = Arc::new(MockConnection::new());
	updating.update_account(MetaAccount::substrate(AccountId::from(ALICE)));
	updating.start();

	registry.set_connection(&chain_id, connection.clone());
	registry.add_chain(chain);
	// Without a runtime the chain waits.
	tokio::time::sleep(Duration::from_millis(20)).await;
	assert!(updating.subscription(&chain_id).is_none());

	registry.set_runtime_provider(&chain_id, Arc::new(MockRuntimeProvider::new()));
	eventually(|| connection.active_count() == 1).await;
	assert_eq!(updating.subscribed_assets(&chain_id), BTreeSet::from([0]));
	assert_eq!(transactions.created.load(Ordering::SeqCst), 1);

	registry.remove_chain(&chain_id);
	eventually(|| updating.subscription(&chain_id).is_none()).await;
	assert_eq!(connection.active_count(), 0);
	assert!(service.is_empty());

	updating.stop();
}

#[tokio::test]
async fn stop_detaches_everything() {
	let connection = Arc::new(MockConnection::new());
	let registry = registry_with(native_chain("polkadot"), connection.clone(), Arc::new(MockRuntimeProvider::new()));
	let (updating, service) = updating_service(registry, None);
	updating.update_account(MetaAccount::substrate(AccountId::from(ALICE)));
	updating.start();
	eventually(|| connection.active_count() == 1).await;

	updating.stop();

	assert!(service.is_empty());
	assert_eq!(connection.active_count(), 0);
}

#[tokio::test]
async fn ethereum_chains_need_an_ethereum_account() {
	let mut chain = native_chain("moonbeam");
	chain.is_ethereum_based = true;
	let registry = registry_with(chain.clone(), Arc::new(MockConnection::new()), Arc::new(MockRuntimeProvider::new()));
	let (updating, _service) = updating_service(registry, None);

	updating.update_account(MetaAccount::substrate(AccountId::from(ALICE)));
	assert!(updating.subscription(&chain.chain_id).is_none());

	updating.update_account(MetaAccount {
		substrate: Some(AccountId::from(ALICE)),
		ethereum: Some(AccountId::new([9u8; 20])),
	});
	assert_eq!(updating.subscribed_assets(&chain.chain_id), BTreeSet::from([0]));
}
