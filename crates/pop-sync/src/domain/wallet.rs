// SPDX-License-Identifier: GPL-3.0

//! Standalone balance subscriptions delivering decoded balances to a callback.
//!
//! Unlike [`BalanceRemoteSubscriptionService`](super::BalanceRemoteSubscriptionService), nothing is
//! persisted or shared between callers: every [`WalletRemoteSubscription::subscribe_balance`]
//! opens its own storage subscription, closed when the returned [`WalletBalanceSubscription`] is
//! dropped.

use crate::{
	chain::{AssetType, ChainModel, ChainRegistry},
	container::{ChildHandler, StorageSubscriptionContainer},
	error::{HandlerError, SubscriptionError},
	handling::StorageChildHandler,
	key::StorageKeyFactory,
	models::AssetBalance,
	path::StoragePath,
	request::{KeyComponent, KeyParam, SubscriptionRequest},
	strings::storage::pallets,
	types::{AccountId, AssetId, BlockHash, ChainAssetId},
	values::{AccountInfo, AssetAccount, AssetDetails, AssetStatus, OrmlAccountData},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use scale::Decode;
use std::sync::Arc;

/// A balance notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletBalanceUpdate {
	/// `None` when the account has no balance entry.
	pub balance: Option<AssetBalance>,
	/// Block the change was observed at, when the node reported one.
	pub block_hash: Option<BlockHash>,
}

type BalanceCallback = Arc<dyn Fn(WalletBalanceUpdate) + Send + Sync>;

/// Storage entry a [`WalletBalanceHandler`] decodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WalletEntry {
	/// `System.Account`
	NativeAccount,
	/// `Tokens.Accounts`
	OrmlAccount,
	/// `<pallet>.Account`
	AssetsAccount,
	/// `<pallet>.Asset`
	AssetsDetails,
}

/// Latest assets pallet entries. Each notification only carries the entry that changed.
#[derive(Default)]
struct AssetsEntries {
	account: Option<AssetAccount>,
	asset_frozen: bool,
}

struct BalanceTarget {
	chain_asset_id: ChainAssetId,
	account_id: AccountId,
	callback: BalanceCallback,
	assets: Mutex<AssetsEntries>,
}

struct WalletBalanceHandler {
	entry: WalletEntry,
	label: String,
	target: Arc<BalanceTarget>,
}

impl WalletBalanceHandler {
	fn decode<T: Decode>(&self, value: Option<Vec<u8>>) -> Result<Option<T>, HandlerError> {
		value
			.map(|bytes| T::decode(&mut &bytes[..]))
			.transpose()
			.map_err(|e| HandlerError::decode(&self.label, e))
	}

	fn balance(&self, value: Option<Vec<u8>>) -> Result<Option<AssetBalance>, HandlerError> {
		let target = &self.target;
		Ok(match self.entry {
			WalletEntry::NativeAccount => self.decode::<AccountInfo>(value)?.map(|info| {
				AssetBalance::from_account_data(
					target.chain_asset_id.clone(),
					target.account_id.clone(),
					&info.data,
				)
			}),
			WalletEntry::OrmlAccount => self.decode::<OrmlAccountData>(value)?.map(|data| {
				AssetBalance::from_orml(target.chain_asset_id.clone(), target.account_id.clone(), &data)
			}),
			WalletEntry::AssetsAccount => {
				let account = self.decode::<AssetAccount>(value)?;
				let mut entries = target.assets.lock();
				entries.account = account;
				target.assets_balance(&entries)
			},
			WalletEntry::AssetsDetails => {
				let asset_frozen = match value {
					Some(bytes) => {
						AssetDetails::decode_status(&bytes, target.account_id.as_bytes().len())
							.map_err(|e| HandlerError::decode(&self.label, e))? ==
							AssetStatus::Frozen
					},
					None => false,
				};
				let mut entries = target.assets.lock();
				entries.asset_frozen = asset_frozen;
				target.assets_balance(&entries)
			},
		})
	}
}

impl BalanceTarget {
	fn assets_balance(&self, entries: &AssetsEntries) -> Option<AssetBalance> {
		entries.account.as_ref().map(|account| {
			AssetBalance::from_assets_account(
				self.chain_asset_id.clone(),
				self.account_id.clone(),
				account,
				entries.asset_frozen,
			)
		})
	}
}

#[async_trait]
impl StorageChildHandler for WalletBalanceHandler {
	async fn handle(
		&self,
		value: Option<Vec<u8>>,
		block: Option<BlockHash>,
	) -> Result<(), HandlerError> {
		let balance = self.balance(value)?;
		(self.target.callback)(WalletBalanceUpdate { balance, block_hash: block });
		Ok(())
	}
}

/// An open balance subscription. Dropping it unsubscribes.
pub struct WalletBalanceSubscription {
	container: StorageSubscriptionContainer,
}

impl WalletBalanceSubscription {
	/// Stop receiving updates. Only the first call has an effect.
	pub fn unsubscribe(&self) {
		self.container.unsubscribe()
	}

	pub fn is_subscribed(&self) -> bool {
		self.container.is_subscribed()
	}
}

/// Follows the balance of one account for one asset, outside of the shared subscriptions.
pub struct WalletRemoteSubscription {
	registry: Arc<dyn ChainRegistry>,
	key_factory: StorageKeyFactory,
}

impl WalletRemoteSubscription {
	pub fn new(registry: Arc<dyn ChainRegistry>) -> Self {
		Self { registry, key_factory: StorageKeyFactory }
	}

	/// Subscribe to the balance of `account` for `asset_id` on `chain`.
	///
	/// `callback` runs on the connection's notification task for every change of the underlying
	/// entries, starting with their current value.
	///
	/// # Arguments
	/// * `account` - Account to follow.
	/// * `chain` - Chain the asset belongs to.
	/// * `asset_id` - Asset to follow. Native, ORML and assets pallet tokens are supported.
	/// * `callback` - Receiver of every balance update.
	pub async fn subscribe_balance(
		&self,
		account: &AccountId,
		chain: &ChainModel,
		asset_id: AssetId,
		callback: impl Fn(WalletBalanceUpdate) + Send + Sync + 'static,
	) -> Result<WalletBalanceSubscription, SubscriptionError> {
		let chain_asset_id = chain.chain_asset_id(asset_id);
		let asset = chain
			.asset(asset_id)
			.ok_or_else(|| SubscriptionError::UnknownAsset(chain_asset_id.clone()))?;
		let entries = match &asset.asset_type {
			AssetType::Native => vec![(
				WalletEntry::NativeAccount,
				request_map(StoragePath::SYSTEM_ACCOUNT, KeyParam::from(account)),
			)],
			AssetType::Orml { currency_id_scale } => vec![(
				WalletEntry::OrmlAccount,
				request_double_map(
					StoragePath::ORML_ACCOUNTS,
					KeyParam::from(account),
					KeyComponent::identity(KeyParam::Hex(currency_id_scale.clone())),
				),
			)],
			AssetType::Statemine { pallet_name, id } => {
				let pallet = pallet_name.as_deref().unwrap_or(pallets::ASSETS);
				let asset = KeyParam::AssetId(id.clone());
				vec![
					(
						WalletEntry::AssetsAccount,
						request_double_map(
							StoragePath::assets_account(pallet),
							asset.clone(),
							KeyParam::from(account),
						),
					),
					(WalletEntry::AssetsDetails, request_map(StoragePath::assets_details(pallet), asset)),
				]
			},
			AssetType::Equilibrium { .. } | AssetType::Evm => {
				return Err(SubscriptionError::UnsupportedAsset(chain_asset_id));
			},
		};

		let chain_id = &chain.chain_id;
		let connection = self
			.registry
			.connection(chain_id)
			.ok_or_else(|| SubscriptionError::ConnectionUnavailable(chain_id.clone()))?;
		let provider = self.registry.runtime_provider(chain_id).ok_or_else(|| {
			SubscriptionError::RuntimeUnavailable {
				chain_id: chain_id.clone(),
				message: "no runtime provider".into(),
			}
		})?;
		let coder = provider
			.fetch_coder_factory()
			.await
			.map_err(|err| SubscriptionError::runtime(chain_id, err))?;

		let target = Arc::new(BalanceTarget {
			chain_asset_id: chain_asset_id.clone(),
			account_id: account.clone(),
			callback: Arc::new(callback),
			assets: Mutex::default(),
		});
		let handlers = entries
			.into_iter()
			.map(|(entry, request)| -> Result<ChildHandler, SubscriptionError> {
				let remote_key = request.encode_remote_key(&self.key_factory, coder.as_ref())?;
				let label = request.local_key().to_string();
				let handler: Arc<dyn StorageChildHandler> = Arc::new(WalletBalanceHandler {
					entry,
					label: label.clone(),
					target: target.clone(),
				});
				Ok(ChildHandler { remote_key, local_key: label, handler })
			})
			.collect::<Result<Vec<_>, _>>()?;

		let container = StorageSubscriptionContainer::subscribe(connection, handlers).await?;
		log::debug!("Following balance of {account} for {chain_asset_id}");
		Ok(WalletBalanceSubscription { container })
	}
}

/// Requests are labelled with their path, as their values are never stored.
fn request_map(path: StoragePath, key: impl Into<KeyComponent>) -> SubscriptionRequest {
	let label = path.to_string();
	SubscriptionRequest::map(path, label, key)
}

fn request_double_map(
	path: StoragePath,
	first: impl Into<KeyComponent>,
	second: impl Into<KeyComponent>,
) -> SubscriptionRequest {
	let label = path.to_string();
	SubscriptionRequest::double_map(path, label, first, second)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		chain::AssetModel,
		testing::{
			ALICE, MockConnection, MockRuntimeProvider, account_info, account_storage_key,
			native_chain, registry_with,
		},
		transport::{StorageChange, StorageUpdate},
		types::ChainId,
		values::AssetAccountStatus,
	};
	use scale::Encode;
	use sp_core::H256;
	use tokio::sync::mpsc;

	fn chain_with(asset_type: AssetType) -> ChainModel {
		let mut chain = native_chain("asset-hub");
		chain.assets.push(AssetModel { asset_id: 1, symbol: "TKN".into(), enabled: true, asset_type });
		chain
	}

	fn wallet(chain: &ChainModel) -> (WalletRemoteSubscription, Arc<MockConnection>) {
		let connection = Arc::new(MockConnection::new());
		let registry = registry_with(chain.clone(), connection.clone(), Arc::new(MockRuntimeProvider::new()));
		(WalletRemoteSubscription::new(registry), connection)
	}

	fn recorder() -> (
		impl Fn(WalletBalanceUpdate) + Send + Sync + 'static,
		mpsc::UnboundedReceiver<WalletBalanceUpdate>,
	) {
		let (sender, receiver) = mpsc::unbounded_channel();
		let callback = move |update: WalletBalanceUpdate| {
			// Sends only fail once the test stopped listening.
			let _ = sender.send(update);
		};
		(callback, receiver)
	}

	/// Remote keys of the single subscription opened on `connection`.
	fn subscribed_keys(connection: &MockConnection) -> Vec<Vec<u8>> {
		connection.subscribed_params()[0]
			.iter()
			.map(|key| hex::decode(key.trim_start_matches("0x")).unwrap())
			.collect()
	}

	async fn push(connection: &MockConnection, key: &[u8], value: Option<Vec<u8>>, block: u8) {
		connection
			.push(StorageUpdate {
				block_hash: Some(H256::repeat_byte(block)),
				changes: vec![StorageChange { key: key.to_vec(), value }],
			})
			.await;
	}

	#[tokio::test]
	async fn native_balance_reaches_the_callback() {
		let chain = native_chain("polkadot");
		let (wallet, connection) = wallet(&chain);
		let (callback, mut updates) = recorder();
		let subscription = wallet.subscribe_balance(&AccountId::from(ALICE), &chain, 0, callback).await.unwrap();
		let key = account_storage_key(&ALICE);
		assert_eq!(subscribed_keys(&connection), vec![key.clone()]);

		push(&connection, &key, Some(account_info(100, 20, 30)), 1).await;
		let update = updates.recv().await.unwrap();
		let balance = update.balance.unwrap();
		assert_eq!((balance.free, balance.reserved, balance.frozen), (100, 20, 30));
		assert_eq!(balance.chain_asset_id, ChainAssetId::new(ChainId::new("polkadot"), 0));
		assert_eq!(update.block_hash, Some(H256::repeat_byte(1)));

		push(&connection, &key, None, 2).await;
		assert_eq!(updates.recv().await.unwrap().balance, None);

		drop(subscription);
		assert_eq!(connection.active_count(), 0);
	}

	#[tokio::test]
	async fn orml_balance_reaches_the_callback() {
		let chain = chain_with(AssetType::Orml { currency_id_scale: "0x0001".into() });
		let (wallet, connection) = wallet(&chain);
		let (callback, mut updates) = recorder();
		let _subscription = wallet.subscribe_balance(&AccountId::from(ALICE), &chain, 1, callback).await.unwrap();
		let keys = subscribed_keys(&connection);
		assert_eq!(keys.len(), 1);
		assert!(keys[0].ends_with(&[0x00, 0x01]));

		let data = OrmlAccountData { free: 5, reserved: 1, frozen: 2 };
		push(&connection, &keys[0], Some(data.encode()), 1).await;
		let balance = updates.recv().await.unwrap().balance.unwrap();
		assert_eq!((balance.free, balance.reserved, balance.frozen), (5, 1, 2));
	}

	#[tokio::test]
	async fn assets_balance_follows_account_and_details() {
		let chain = chain_with(AssetType::Statemine { pallet_name: None, id: "1984".into() });
		let (wallet, connection) = wallet(&chain);
		let (callback, mut updates) = recorder();
		let _subscription = wallet.subscribe_balance(&AccountId::from(ALICE), &chain, 1, callback).await.unwrap();
		let keys = subscribed_keys(&connection);
		assert_eq!(keys.len(), 2);
		let (account_key, details_key) = (&keys[0], &keys[1]);

		let account = AssetAccount { balance: 70, status: AssetAccountStatus::Liquid };
		push(&connection, account_key, Some(account.encode()), 1).await;
		let balance = updates.recv().await.unwrap().balance.unwrap();
		assert_eq!((balance.free, balance.frozen), (70, 0));

		let details = AssetDetails {
			owner: ALICE,
			issuer: ALICE,
			admin: ALICE,
			freezer: ALICE,
			supply: 1_000,
			deposit: 0,
			min_balance: 1,
			is_sufficient: true,
			accounts: 1,
			sufficients: 1,
			approvals: 0,
			status: AssetStatus::Frozen,
		};
		push(&connection, details_key, Some(details.encode()), 2).await;
		let balance = updates.recv().await.unwrap().balance.unwrap();
		assert_eq!((balance.free, balance.frozen, balance.transferable()), (70, 70, 0));

		push(&connection, account_key, None, 3).await;
		assert_eq!(updates.recv().await.unwrap().balance, None);
	}

	#[tokio::test]
	async fn unsupported_and_unknown_assets_are_rejected() {
		let chain = chain_with(AssetType::Equilibrium { id: 25_969 });
		let (wallet, connection) = wallet(&chain);
		let account = AccountId::from(ALICE);

		let err = wallet.subscribe_balance(&account, &chain, 1, |_| {}).await.err();
		assert_eq!(err, Some(SubscriptionError::UnsupportedAsset(chain.chain_asset_id(1))));
		let err = wallet.subscribe_balance(&account, &chain, 9, |_| {}).await.err();
		assert_eq!(err, Some(SubscriptionError::UnknownAsset(chain.chain_asset_id(9))));
		assert_eq!(connection.subscription_count(), 0);
	}

	#[tokio::test]
	async fn undecodable_values_are_not_delivered() {
		let chain = native_chain("polkadot");
		let (wallet, connection) = wallet(&chain);
		let (callback, mut updates) = recorder();
		let subscription = wallet.subscribe_balance(&AccountId::from(ALICE), &chain, 0, callback).await.unwrap();
		let key = account_storage_key(&ALICE);

		push(&connection, &key, Some(vec![1, 2, 3]), 1).await;
		assert!(updates.try_recv().is_err());

		subscription.unsubscribe();
		assert!(!subscription.is_subscribed());
		push(&connection, &key, Some(account_info(1, 0, 0)), 2).await;
		assert!(updates.try_recv().is_err());
	}
}
