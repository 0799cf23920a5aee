// SPDX-License-Identifier: GPL-3.0

//! Balance subscriptions of an account on a chain.

use super::RemoteSubscription;
use crate::{
	chain::{AssetType, ChainModel},
	events::EventCenter,
	handling::{
		AssetsBalanceUpdater, AssetsPalletHandlingFactory, AssetsStorageKind, BalanceContext,
		EquilibriumBalanceUpdater, EquilibriumHandlingFactory, EquilibriumStorageKind,
		NativeStorageKind, NativeTokenHandlingFactory, OrmlStorageKind, OrmlTokenHandlingFactory,
		RoutingHandlingFactory,
	},
	key::{CacheKey, CacheKeyBuilder, LocalStorageKeyFactory},
	path::StoragePath,
	request::{KeyComponent, KeyParam, SubscriptionRequest},
	service::{Completion, RemoteSubscriptionService},
	strings::{keys, storage::pallets},
	transaction::TransactionSubscription,
	types::{AccountId, AssetId, ChainAssetId, SubscriptionId},
};
use scale::Encode;
use std::{collections::BTreeSet, sync::Arc};

/// Requests and handlers covering the balances of a set of assets.
#[derive(Default)]
struct BalancePlan {
	requests: Vec<SubscriptionRequest>,
	router: RoutingHandlingFactory,
	/// Assets with at least one request.
	assets: BTreeSet<AssetId>,
}

impl BalancePlan {
	fn cache_key(&self, prefix: &'static str, account: &AccountId, chain: &ChainModel) -> CacheKey {
		CacheKeyBuilder::new(prefix)
			.account(account)
			.chain(&chain.chain_id)
			.assets(self.assets.iter().copied())
			.paths(self.requests.iter().map(SubscriptionRequest::path))
			.build()
	}
}

/// Subscribes to the balances of an account.
pub struct BalanceRemoteSubscriptionService {
	service: Arc<RemoteSubscriptionService>,
	events: EventCenter,
	local_keys: LocalStorageKeyFactory,
}

impl BalanceRemoteSubscriptionService {
	pub fn new(service: Arc<RemoteSubscriptionService>, events: EventCenter) -> Self {
		Self { service, events, local_keys: LocalStorageKeyFactory }
	}

	pub fn service(&self) -> &Arc<RemoteSubscriptionService> {
		&self.service
	}

	/// Subscribe to the balances of `account` on `chain`.
	///
	/// Returns `None` when none of the assets can be subscribed to.
	///
	/// # Arguments
	/// * `account` - Account to track.
	/// * `chain` - Chain the assets belong to.
	/// * `asset_ids` - Assets to track, all assets of the chain if `None`.
	/// * `transaction` - Notified of the blocks native balances change at.
	/// * `completion` - Receiver of the outcome.
	pub fn attach_to_balances(
		&self,
		account: &AccountId,
		chain: &ChainModel,
		asset_ids: Option<&BTreeSet<AssetId>>,
		transaction: Option<Arc<dyn TransactionSubscription>>,
		completion: Option<Completion>,
	) -> Option<SubscriptionId> {
		self.attach(keys::BALANCES, account, chain, asset_ids, transaction, completion)
			.map(|subscription| subscription.id)
	}

	pub fn detach_from_balances(
		&self,
		id: SubscriptionId,
		account: &AccountId,
		chain: &ChainModel,
		asset_ids: Option<&BTreeSet<AssetId>>,
		completion: Option<Completion>,
	) {
		let cache_key = self.plan(account, chain, asset_ids, None).cache_key(keys::BALANCES, account, chain);
		self.service.detach(&cache_key, id, completion);
	}

	/// Subscribe to the balance of a single asset.
	pub fn attach_to_asset_balance(
		&self,
		account: &AccountId,
		chain: &ChainModel,
		asset_id: AssetId,
		transaction: Option<Arc<dyn TransactionSubscription>>,
		completion: Option<Completion>,
	) -> Option<SubscriptionId> {
		let asset_ids = BTreeSet::from([asset_id]);
		self.attach(keys::ASSET_BALANCE, account, chain, Some(&asset_ids), transaction, completion)
			.map(|subscription| subscription.id)
	}

	pub fn detach_from_asset_balance(
		&self,
		id: SubscriptionId,
		account: &AccountId,
		chain: &ChainModel,
		asset_id: AssetId,
		completion: Option<Completion>,
	) {
		let asset_ids = BTreeSet::from([asset_id]);
		let cache_key = self
			.plan(account, chain, Some(&asset_ids), None)
			.cache_key(keys::ASSET_BALANCE, account, chain);
		self.service.detach(&cache_key, id, completion);
	}

	/// Detach a subscription returned by [`Self::attach`].
	pub(crate) fn detach(&self, subscription: &RemoteSubscription, completion: Option<Completion>) {
		self.service.detach(&subscription.cache_key, subscription.id, completion);
	}

	pub(crate) fn attach(
		&self,
		prefix: &'static str,
		account: &AccountId,
		chain: &ChainModel,
		asset_ids: Option<&BTreeSet<AssetId>>,
		transaction: Option<Arc<dyn TransactionSubscription>>,
		completion: Option<Completion>,
	) -> Option<RemoteSubscription> {
		let plan = self.plan(account, chain, asset_ids, transaction);
		if plan.requests.is_empty() {
			log::debug!("No balances to subscribe to for {account} on {}", chain.chain_id);
			return None;
		}
		let cache_key = plan.cache_key(prefix, account, chain);
		let id = self.service.attach(
			plan.requests,
			&chain.chain_id,
			&cache_key,
			completion,
			Some(Arc::new(plan.router)),
		);
		Some(RemoteSubscription { id, cache_key })
	}

	fn plan(
		&self,
		account: &AccountId,
		chain: &ChainModel,
		asset_ids: Option<&BTreeSet<AssetId>>,
		transaction: Option<Arc<dyn TransactionSubscription>>,
	) -> BalancePlan {
		let context = BalanceContext::new(account.clone(), self.events.clone(), transaction);
		let mut plan = BalancePlan::default();
		let mut equilibrium = Vec::new();
		let selected = chain
			.assets
			.iter()
			.filter(|asset| asset_ids.is_none_or(|ids| ids.contains(&asset.asset_id)));
		for asset in selected {
			let chain_asset_id = chain.chain_asset_id(asset.asset_id);
			let added = match &asset.asset_type {
				AssetType::Native => {
					self.plan_native(&mut plan, account, chain, chain_asset_id, &context);
					true
				},
				AssetType::Orml { currency_id_scale } => self.plan_orml(
					&mut plan,
					account,
					chain,
					chain_asset_id,
					currency_id_scale,
					&context,
				),
				AssetType::Statemine { pallet_name, id } => self.plan_assets(
					&mut plan,
					account,
					chain,
					chain_asset_id,
					pallet_name.as_deref().unwrap_or(pallets::ASSETS),
					id,
					&context,
				),
				AssetType::Equilibrium { id } => {
					equilibrium.push((*id, asset.asset_id));
					true
				},
				AssetType::Evm => {
					log::error!(
						"Balance subscriptions are not supported for {} on {}",
						asset.symbol,
						chain.chain_id
					);
					false
				},
			};
			if added {
				plan.assets.insert(asset.asset_id);
			}
		}
		if !equilibrium.is_empty() {
			self.plan_equilibrium(&mut plan, account, chain, &equilibrium, &context);
		}
		plan
	}

	fn plan_native(
		&self,
		plan: &mut BalancePlan,
		account: &AccountId,
		chain: &ChainModel,
		chain_asset_id: ChainAssetId,
		context: &BalanceContext,
	) {
		let entries = [
			(StoragePath::SYSTEM_ACCOUNT, NativeStorageKind::Account),
			(StoragePath::BALANCES_LOCKS, NativeStorageKind::Locks),
			(StoragePath::BALANCES_HOLDS, NativeStorageKind::Holds),
			(StoragePath::BALANCES_FREEZES, NativeStorageKind::Freezes),
		];
		let mut factory = NativeTokenHandlingFactory::new(chain_asset_id, context.clone());
		let mut local_keys = Vec::with_capacity(entries.len());
		for (path, kind) in entries {
			let local_key = self.local_keys.create_for_account(&path, account, &chain.chain_id);
			factory = factory.with_kind(local_key.clone(), kind);
			plan.requests.push(SubscriptionRequest::map(path, local_key.clone(), KeyParam::from(account)));
			local_keys.push(local_key);
		}
		plan.router.insert_all(local_keys, Arc::new(factory));
	}

	fn plan_orml(
		&self,
		plan: &mut BalancePlan,
		account: &AccountId,
		chain: &ChainModel,
		chain_asset_id: ChainAssetId,
		currency_id_scale: &str,
		context: &BalanceContext,
	) -> bool {
		let currency = KeyParam::Hex(currency_id_scale.to_string());
		let currency_bytes = match currency.raw_bytes() {
			Ok(bytes) => bytes,
			Err(err) => {
				log::error!("Invalid ORML currency of {chain_asset_id}: {err}");
				return false;
			},
		};
		let mut factory = OrmlTokenHandlingFactory::new(chain_asset_id, context.clone());
		let mut local_keys = Vec::with_capacity(2);
		for (path, kind) in [
			(StoragePath::ORML_ACCOUNTS, OrmlStorageKind::Accounts),
			(StoragePath::ORML_LOCKS, OrmlStorageKind::Locks),
		] {
			let local_key = self.local_keys.create(
				&path,
				&[account.as_bytes().to_vec(), currency_bytes.clone()],
				&chain.chain_id,
			);
			factory = factory.with_kind(local_key.clone(), kind);
			plan.requests.push(SubscriptionRequest::double_map(
				path,
				local_key.clone(),
				KeyParam::from(account),
				KeyComponent::identity(currency.clone()),
			));
			local_keys.push(local_key);
		}
		plan.router.insert_all(local_keys, Arc::new(factory));
		true
	}

	#[allow(clippy::too_many_arguments)]
	fn plan_assets(
		&self,
		plan: &mut BalancePlan,
		account: &AccountId,
		chain: &ChainModel,
		chain_asset_id: ChainAssetId,
		pallet: &str,
		asset_id: &str,
		context: &BalanceContext,
	) -> bool {
		let asset = KeyParam::AssetId(asset_id.to_string());
		let encoded_asset = match asset.encode_default() {
			Ok(bytes) => bytes,
			Err(err) => {
				log::error!("Invalid asset id of {chain_asset_id}: {err}");
				return false;
			},
		};
		let account_path = StoragePath::assets_account(pallet);
		let details_path = StoragePath::assets_details(pallet);
		let account_key = self.local_keys.create(
			&account_path,
			&[encoded_asset.clone(), account.as_bytes().to_vec()],
			&chain.chain_id,
		);
		let details_key = self.local_keys.create(&details_path, &[encoded_asset], &chain.chain_id);

		let updater = Arc::new(AssetsBalanceUpdater::new(chain_asset_id, context.clone()));
		let factory = AssetsPalletHandlingFactory::new(updater)
			.with_kind(account_key.clone(), AssetsStorageKind::Account)
			.with_kind(details_key.clone(), AssetsStorageKind::Details);
		plan.requests.push(SubscriptionRequest::double_map(
			account_path,
			account_key.clone(),
			asset.clone(),
			KeyParam::from(account),
		));
		plan.requests.push(SubscriptionRequest::map(details_path, details_key.clone(), asset));
		plan.router.insert_all([account_key, details_key], Arc::new(factory));
		true
	}

	/// One updater covers every equilibrium asset, as all balances share `System.Account`.
	/// `EqBalances.Locked` rides along for the utility asset.
	fn plan_equilibrium(
		&self,
		plan: &mut BalancePlan,
		account: &AccountId,
		chain: &ChainModel,
		assets: &[(u64, AssetId)],
		context: &BalanceContext,
	) {
		let updater = Arc::new(EquilibriumBalanceUpdater::new(
			chain.chain_id.clone(),
			assets.iter().copied().collect(),
			chain.utility_asset().map(|asset| asset.asset_id),
			context.clone(),
		));
		let balances_key =
			self.local_keys.create_for_account(&StoragePath::SYSTEM_ACCOUNT, account, &chain.chain_id);
		let locks_key =
			self.local_keys.create_for_account(&StoragePath::EQUILIBRIUM_LOCKED, account, &chain.chain_id);
		let mut factory = EquilibriumHandlingFactory::new(updater)
			.with_kind(balances_key.clone(), EquilibriumStorageKind::Balances)
			.with_kind(locks_key.clone(), EquilibriumStorageKind::Locks);
		plan.requests.push(SubscriptionRequest::map(
			StoragePath::SYSTEM_ACCOUNT,
			balances_key.clone(),
			KeyParam::from(account),
		));
		plan.requests.push(SubscriptionRequest::map(
			StoragePath::EQUILIBRIUM_LOCKED,
			locks_key.clone(),
			KeyParam::from(account),
		));
		let mut local_keys = vec![balances_key, locks_key];
		for (currency, _) in assets {
			let local_key = self.local_keys.create(
				&StoragePath::EQUILIBRIUM_RESERVED,
				&[account.as_bytes().to_vec(), currency.encode()],
				&chain.chain_id,
			);
			factory = factory.with_kind(local_key.clone(), EquilibriumStorageKind::Reserved(*currency));
			plan.requests.push(SubscriptionRequest::double_map(
				StoragePath::EQUILIBRIUM_RESERVED,
				local_key.clone(),
				KeyParam::from(account),
				KeyParam::U64(*currency),
			));
			local_keys.push(local_key);
		}
		plan.router.insert_all(local_keys, Arc::new(factory));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		chain::AssetModel,
		testing::{ALICE, BOB},
		types::ChainId,
	};

	fn asset(asset_id: AssetId, asset_type: AssetType) -> AssetModel {
		AssetModel { asset_id, symbol: format!("A{asset_id}"), enabled: true, asset_type }
	}

	fn chain() -> ChainModel {
		ChainModel {
			chain_id: ChainId::new("asset-hub"),
			name: "Asset Hub".into(),
			assets: vec![
				asset(0, AssetType::Native),
				asset(1, AssetType::Statemine { pallet_name: None, id: "1984".into() }),
				asset(2, AssetType::Orml { currency_id_scale: "0x0001".into() }),
				asset(3, AssetType::Evm),
			],
			is_ethereum_based: false,
		}
	}

	fn service() -> BalanceRemoteSubscriptionService {
		let registry = Arc::new(crate::chain::StaticChainRegistry::new());
		let store = Arc::new(crate::store::MemoryStore::new());
		BalanceRemoteSubscriptionService::new(
			Arc::new(RemoteSubscriptionService::new(
				registry,
				store,
				tokio::runtime::Handle::current(),
			)),
			EventCenter::default(),
		)
	}

	#[tokio::test]
	async fn requests_follow_asset_types() {
		let service = service();
		let plan = service.plan(&AccountId::from(ALICE), &chain(), None, None);

		let paths: Vec<String> = plan.requests.iter().map(|r| r.path().to_string()).collect();
		assert_eq!(
			paths,
			vec![
				"System.Account",
				"Balances.Locks",
				"Balances.Holds",
				"Balances.Freezes",
				"Assets.Account",
				"Assets.Asset",
				"Tokens.Accounts",
				"Tokens.Locks",
			]
		);
		assert_eq!(plan.assets, BTreeSet::from([0, 1, 2]));
		assert_eq!(plan.router.len(), 8);
	}

	#[tokio::test]
	async fn equilibrium_assets_share_the_account_request() {
		let service = service();
		let chain = ChainModel {
			chain_id: ChainId::new("equilibrium"),
			name: "Equilibrium".into(),
			assets: vec![
				asset(0, AssetType::Equilibrium { id: 25_969 }),
				asset(1, AssetType::Equilibrium { id: 6_648_164 }),
			],
			is_ethereum_based: false,
		};

		let plan = service.plan(&AccountId::from(ALICE), &chain, None, None);

		let paths: Vec<String> = plan.requests.iter().map(|r| r.path().to_string()).collect();
		assert_eq!(
			paths,
			vec!["System.Account", "EqBalances.Locked", "EqBalances.Reserved", "EqBalances.Reserved"]
		);
		assert_eq!(plan.assets, BTreeSet::from([0, 1]));
		assert_eq!(plan.router.len(), 4);
	}

	#[tokio::test]
	async fn cache_key_depends_on_assets_and_account() {
		let service = service();
		let chain = chain();
		let alice = AccountId::from(ALICE);
		let key = |account: &AccountId, assets: Option<&BTreeSet<AssetId>>| {
			service.plan(account, &chain, assets, None).cache_key(keys::BALANCES, account, &chain)
		};

		let native = BTreeSet::from([0]);
		let native_and_assets = BTreeSet::from([0, 1]);
		assert_eq!(key(&alice, Some(&native)), key(&alice, Some(&native)));
		assert_ne!(key(&alice, Some(&native)), key(&alice, Some(&native_and_assets)));
		assert_ne!(key(&alice, Some(&native)), key(&AccountId::from(BOB), Some(&native)));
		assert!(key(&alice, None).as_str().starts_with("balances-"));
	}

	#[tokio::test]
	async fn unsupported_assets_only_yield_nothing() {
		let service = service();
		let evm_only = BTreeSet::from([3]);
		let id = service.attach_to_balances(&AccountId::from(ALICE), &chain(), Some(&evm_only), None, None);
		assert!(id.is_none());
	}
}
