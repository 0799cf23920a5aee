// SPDX-License-Identifier: GPL-3.0

//! Chain and asset models, and the registry exposing them together with each chain's
//! connection and runtime.

use crate::{
	runtime::RuntimeProvider,
	transport::Connection,
	types::{AccountId, AssetId, ChainAssetId, ChainId},
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::broadcast;

/// Asset id of a chain's utility token.
pub const UTILITY_ASSET_ID: AssetId = 0;

/// Capacity of the registry event channel.
const REGISTRY_CHANNEL_CAPACITY: usize = 64;

/// How an asset's balance is stored on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AssetType {
	/// The chain's utility token, in `System.Account`.
	Native,
	/// An ORML `Tokens` currency. The id is hex of the SCALE encoded currency id.
	Orml { currency_id_scale: String },
	/// A `pallet-assets` instance. The pallet defaults to `Assets`.
	Statemine { pallet_name: Option<String>, id: String },
	/// A token of the equilibrium balances pallet.
	Equilibrium { id: u64 },
	/// An EVM token, not synchronized through storage subscriptions.
	Evm,
}

/// An asset of a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetModel {
	pub asset_id: AssetId,
	pub symbol: String,
	pub enabled: bool,
	#[serde(flatten)]
	pub asset_type: AssetType,
}

impl AssetModel {
	/// Whether the asset is synchronized through storage subscriptions.
	pub fn is_subscribable(&self) -> bool {
		!matches!(self.asset_type, AssetType::Evm)
	}
}

/// A chain and its assets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainModel {
	pub chain_id: ChainId,
	pub name: String,
	pub assets: Vec<AssetModel>,
	/// Whether accounts on this chain are 20 byte ethereum addresses.
	#[serde(default)]
	pub is_ethereum_based: bool,
}

impl ChainModel {
	/// The chain's utility asset.
	pub fn utility_asset(&self) -> Option<&AssetModel> {
		self.asset(UTILITY_ASSET_ID)
	}

	pub fn asset(&self, asset_id: AssetId) -> Option<&AssetModel> {
		self.assets.iter().find(|asset| asset.asset_id == asset_id)
	}

	pub fn chain_asset_id(&self, asset_id: AssetId) -> ChainAssetId {
		ChainAssetId::new(self.chain_id.clone(), asset_id)
	}
}

/// A wallet account, with one identity per chain account format.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetaAccount {
	pub substrate: Option<AccountId>,
	pub ethereum: Option<AccountId>,
}

impl MetaAccount {
	pub fn substrate(account: AccountId) -> Self {
		Self { substrate: Some(account), ethereum: None }
	}

	/// The identity used on `chain`.
	pub fn account_for(&self, chain: &ChainModel) -> Option<&AccountId> {
		if chain.is_ethereum_based { self.ethereum.as_ref() } else { self.substrate.as_ref() }
	}
}

/// A change to the set of known chains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainChange {
	Insert(ChainModel),
	Update(ChainModel),
	Delete(ChainId),
}

/// Events published by a [`ChainRegistry`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryEvent {
	/// Chains were added, changed or removed.
	ChainsChanged(Vec<ChainChange>),
	/// The runtime of a chain became available.
	RuntimeReady(ChainId),
}

/// Source of chains and their per-chain collaborators.
pub trait ChainRegistry: Send + Sync {
	fn chain(&self, chain_id: &ChainId) -> Option<ChainModel>;

	fn chains(&self) -> Vec<ChainModel>;

	/// The connection subscriptions of `chain_id` go through.
	fn connection(&self, chain_id: &ChainId) -> Option<Arc<dyn Connection>>;

	fn runtime_provider(&self, chain_id: &ChainId) -> Option<Arc<dyn RuntimeProvider>>;

	fn subscribe_events(&self) -> broadcast::Receiver<RegistryEvent>;
}

#[derive(Default)]
struct ChainEntry {
	model: Option<ChainModel>,
	connection: Option<Arc<dyn Connection>>,
	runtime: Option<Arc<dyn RuntimeProvider>>,
}

/// In-memory [`ChainRegistry`] populated by its owner.
pub struct StaticChainRegistry {
	entries: RwLock<BTreeMap<ChainId, ChainEntry>>,
	events: broadcast::Sender<RegistryEvent>,
}

impl StaticChainRegistry {
	pub fn new() -> Self {
		let (events, _) = broadcast::channel(REGISTRY_CHANNEL_CAPACITY);
		Self { entries: RwLock::default(), events }
	}

	/// Insert or replace a chain, publishing the matching change.
	pub fn add_chain(&self, chain: ChainModel) {
		let change = {
			let mut entries = self.entries.write();
			let entry = entries.entry(chain.chain_id.clone()).or_default();
			let change = if entry.model.is_some() {
				ChainChange::Update(chain.clone())
			} else {
				ChainChange::Insert(chain.clone())
			};
			entry.model = Some(chain);
			change
		};
		self.publish(RegistryEvent::ChainsChanged(vec![change]));
	}

	/// Remove a chain together with its connection and runtime.
	pub fn remove_chain(&self, chain_id: &ChainId) {
		if self.entries.write().remove(chain_id).is_some() {
			self.publish(RegistryEvent::ChainsChanged(vec![ChainChange::Delete(chain_id.clone())]));
		}
	}

	pub fn set_connection(&self, chain_id: &ChainId, connection: Arc<dyn Connection>) {
		self.entries.write().entry(chain_id.clone()).or_default().connection = Some(connection);
	}

	/// Register the runtime of a chain, publishing [`RegistryEvent::RuntimeReady`].
	pub fn set_runtime_provider(&self, chain_id: &ChainId, runtime: Arc<dyn RuntimeProvider>) {
		self.entries.write().entry(chain_id.clone()).or_default().runtime = Some(runtime);
		self.publish(RegistryEvent::RuntimeReady(chain_id.clone()));
	}

	fn publish(&self, event: RegistryEvent) {
		// No listeners is fine.
		let _ = self.events.send(event);
	}
}

impl Default for StaticChainRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl ChainRegistry for StaticChainRegistry {
	fn chain(&self, chain_id: &ChainId) -> Option<ChainModel> {
		self.entries.read().get(chain_id).and_then(|entry| entry.model.clone())
	}

	fn chains(&self) -> Vec<ChainModel> {
		self.entries.read().values().filter_map(|entry| entry.model.clone()).collect()
	}

	fn connection(&self, chain_id: &ChainId) -> Option<Arc<dyn Connection>> {
		self.entries.read().get(chain_id).and_then(|entry| entry.connection.clone())
	}

	fn runtime_provider(&self, chain_id: &ChainId) -> Option<Arc<dyn RuntimeProvider>> {
		self.entries.read().get(chain_id).and_then(|entry| entry.runtime.clone())
	}

	fn subscribe_events(&self) -> broadcast::Receiver<RegistryEvent> {
		self.events.subscribe()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chain() -> ChainModel {
		ChainModel {
			chain_id: ChainId::new("polkadot"),
			name: "Polkadot".into(),
			assets: vec![
				AssetModel {
					asset_id: 0,
					symbol: "DOT".into(),
					enabled: true,
					asset_type: AssetType::Native,
				},
				AssetModel {
					asset_id: 1,
					symbol: "USDT".into(),
					enabled: true,
					asset_type: AssetType::Statemine { pallet_name: None, id: "1984".into() },
				},
			],
			is_ethereum_based: false,
		}
	}

	#[test]
	fn asset_lookup() {
		let chain = chain();
		assert_eq!(chain.utility_asset().map(|asset| asset.asset_id), Some(0));
		assert_eq!(chain.asset(1).map(|asset| asset.symbol.as_str()), Some("USDT"));
		assert!(chain.asset(7).is_none());
	}

	#[test]
	fn chain_model_deserializes_from_json() {
		let json = r#"{
			"chainId": "polkadot",
			"name": "Polkadot",
			"assets": [
				{ "assetId": 0, "symbol": "DOT", "enabled": true, "type": "native" },
				{ "assetId": 2, "symbol": "ACA", "enabled": false, "type": "orml", "currencyIdScale": "0x0000" }
			]
		}"#;
		let parsed: ChainModel = serde_json::from_str(json).unwrap();
		assert!(!parsed.is_ethereum_based);
		assert_eq!(
			parsed.assets[1].asset_type,
			AssetType::Orml { currency_id_scale: "0x0000".into() }
		);
	}

	#[test]
	fn meta_account_picks_identity_by_chain_format() {
		let account = MetaAccount {
			substrate: Some(AccountId::new(vec![1; 32])),
			ethereum: Some(AccountId::new(vec![2; 20])),
		};
		let mut chain = chain();
		assert_eq!(account.account_for(&chain).map(|a| a.as_bytes().len()), Some(32));
		chain.is_ethereum_based = true;
		assert_eq!(account.account_for(&chain).map(|a| a.as_bytes().len()), Some(20));
	}

	#[tokio::test]
	async fn registry_publishes_changes() {
		let registry = StaticChainRegistry::new();
		let mut events = registry.subscribe_events();

		registry.add_chain(chain());
		registry.add_chain(chain());
		registry.remove_chain(&ChainId::new("polkadot"));

		assert!(matches!(
			events.recv().await.unwrap(),
			RegistryEvent::ChainsChanged(changes) if matches!(changes[0], ChainChange::Insert(_))
		));
		assert!(matches!(
			events.recv().await.unwrap(),
			RegistryEvent::ChainsChanged(changes) if matches!(changes[0], ChainChange::Update(_))
		));
		assert_eq!(
			events.recv().await.unwrap(),
			RegistryEvent::ChainsChanged(vec![ChainChange::Delete(ChainId::new("polkadot"))])
		);
		assert!(registry.chains().is_empty());
	}
}
