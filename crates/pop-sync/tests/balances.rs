// SPDX-License-Identifier: GPL-3.0

//! End-to-end balance synchronization against a mocked node.

use pop_sync::{
	BalanceRemoteSubscriptionService, ChainId, Completion, EventCenter, MemoryStore,
	PersistenceStore, RemoteSubscriptionService, SyncEvent,
	chain::{AssetModel, AssetType, ChainModel},
	models::{AssetBalance, TransferableMode},
	testing::{
		ALICE, MockConnection, MockRuntimeProvider, RecordingTransactionSubscription,
		account_info, account_storage_key, native_chain, registry_with,
	},
	transport::{StorageChange, StorageUpdate},
	types::{AccountId, BlockHash, ChainAssetId},
};
use std::{collections::BTreeSet, sync::Arc};

struct Fixture {
	balances: BalanceRemoteSubscriptionService,
	service: Arc<RemoteSubscriptionService>,
	connection: Arc<MockConnection>,
	store: Arc<MemoryStore>,
	events: EventCenter,
}

fn fixture(chain: ChainModel) -> Fixture {
	let _ = env_logger::builder().is_test(true).try_init();
	let connection = Arc::new(MockConnection::new());
	let registry = registry_with(chain, connection.clone(), Arc::new(MockRuntimeProvider::new()));
	let store = Arc::new(MemoryStore::new());
	let service = Arc::new(RemoteSubscriptionService::with_current_runtime(registry, store.clone()));
	let events = EventCenter::default();
	Fixture {
		balances: BalanceRemoteSubscriptionService::new(service.clone(), events.clone()),
		service,
		connection,
		store,
		events,
	}
}

async fn stored_balance(store: &MemoryStore, chain_asset_id: &ChainAssetId) -> Option<AssetBalance> {
	let key = AssetBalance::storage_key(chain_asset_id, &AccountId::from(ALICE));
	let bytes = store.get(&key).await.unwrap()?;
	Some(serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn native_balance_updates_are_persisted_and_published() {
	let chain = native_chain("polkadot");
	let fx = fixture(chain.clone());
	let alice = AccountId::from(ALICE);
	let transaction = Arc::new(RecordingTransactionSubscription::default());
	let mut events = fx.events.subscribe();
	let (completion, done) = Completion::channel();

	let id = fx
		.balances
		.attach_to_balances(&alice, &chain, None, Some(transaction.clone()), Some(completion))
		.unwrap();
	assert_eq!(done.await.unwrap(), Ok(()));
	let params = fx.connection.subscribed_params();
	assert_eq!(params.len(), 1);
	assert_eq!(params[0].len(), 4);
	assert_eq!(params[0][0], format!("0x{}", hex::encode(account_storage_key(&ALICE))));

	let block = BlockHash::from_low_u64_be(11);
	fx.connection
		.push(StorageUpdate {
			block_hash: Some(block),
			changes: vec![StorageChange {
				key: account_storage_key(&ALICE),
				value: Some(account_info(1_000, 200, 300)),
			}],
		})
		.await;

	let chain_asset_id = chain.chain_asset_id(0);
	let balance = stored_balance(&fx.store, &chain_asset_id).await.unwrap();
	assert_eq!((balance.free, balance.reserved, balance.frozen), (1_000, 200, 300));
	assert_eq!(balance.transferable_mode, TransferableMode::Fungible);
	assert_eq!(balance.transferable(), 900);
	assert_eq!(
		events.recv().await.unwrap(),
		SyncEvent::AssetBalanceChanged { chain_asset_id, account_id: alice.clone(), block: Some(block) }
	);
	assert_eq!(transaction.blocks(), vec![block]);

	let (completion, done) = Completion::channel();
	fx.balances.detach_from_balances(id, &alice, &chain, None, Some(completion));
	assert_eq!(done.await.unwrap(), Ok(()));
	assert!(fx.service.is_empty());
	assert_eq!(fx.connection.active_count(), 0);
}

#[tokio::test]
async fn identical_balance_requests_share_a_subscription() {
	let chain = native_chain("polkadot");
	let fx = fixture(chain.clone());
	let alice = AccountId::from(ALICE);
	let (completion, done) = Completion::channel();

	let first = fx.balances.attach_to_balances(&alice, &chain, None, None, None).unwrap();
	let second = fx.balances.attach_to_balances(&alice, &chain, None, None, Some(completion)).unwrap();
	done.await.unwrap().unwrap();
	assert_eq!(fx.connection.subscription_count(), 1);
	assert_eq!(fx.service.len(), 1);

	fx.balances.detach_from_balances(first, &alice, &chain, None, None);
	assert_eq!(fx.connection.active_count(), 1);
	fx.balances.detach_from_balances(second, &alice, &chain, None, None);
	assert_eq!(fx.connection.active_count(), 0);
}

#[tokio::test]
async fn asset_sets_get_their_own_subscriptions() {
	let mut chain = native_chain("asset-hub");
	chain.assets.push(AssetModel {
		asset_id: 1,
		symbol: "USDT".into(),
		enabled: true,
		asset_type: AssetType::Statemine { pallet_name: None, id: "1984".into() },
	});
	let fx = fixture(chain.clone());
	let alice = AccountId::from(ALICE);
	let (native_done_tx, native_done) = Completion::channel();
	let (all_done_tx, all_done) = Completion::channel();

	let native = BTreeSet::from([0]);
	fx.balances.attach_to_balances(&alice, &chain, Some(&native), None, Some(native_done_tx)).unwrap();
	fx.balances.attach_to_balances(&alice, &chain, None, None, Some(all_done_tx)).unwrap();

	assert_eq!(native_done.await.unwrap(), Ok(()));
	assert_eq!(all_done.await.unwrap(), Ok(()));
	assert_eq!(fx.service.len(), 2);
	let mut sizes: Vec<_> = fx.connection.subscribed_params().iter().map(Vec::len).collect();
	sizes.sort();
	assert_eq!(sizes, vec![4, 6]);
}

#[tokio::test]
async fn single_asset_subscription_uses_its_own_key() {
	let chain = native_chain("polkadot");
	let fx = fixture(chain.clone());
	let alice = AccountId::from(ALICE);
	let (completion, done) = Completion::channel();

	let all = fx.balances.attach_to_balances(&alice, &chain, None, None, None).unwrap();
	let single = fx.balances.attach_to_asset_balance(&alice, &chain, 0, None, Some(completion)).unwrap();
	done.await.unwrap().unwrap();
	assert_eq!(fx.service.len(), 2);

	fx.balances.detach_from_asset_balance(single, &alice, &chain, 0, None);
	fx.balances.detach_from_balances(all, &alice, &chain, None, None);
	assert!(fx.service.is_empty());
}

#[tokio::test]
async fn chains_without_supported_assets_attach_nothing() {
	let chain = ChainModel {
		chain_id: ChainId::new("moonbeam"),
		name: "Moonbeam".into(),
		assets: vec![AssetModel {
			asset_id: 0,
			symbol: "GLMR".into(),
			enabled: true,
			asset_type: AssetType::Evm,
		}],
		is_ethereum_based: true,
	};
	let fx = fixture(chain.clone());

	let id = fx.balances.attach_to_balances(&AccountId::new([7u8; 20]), &chain, None, None, None);

	assert!(id.is_none());
	assert!(fx.service.is_empty());
}
