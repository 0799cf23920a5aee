// SPDX-License-Identifier: GPL-3.0

//! Balance and storage synchronization for wallets tracking live Polkadot SDK chains.
//!
//! This crate keeps a local view of on-chain storage (balances, locks, holds, freezes, staking
//! and pool state) up to date through node storage subscriptions, sharing one physical
//! subscription between every caller interested in the same entries.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Services                          │
//! │   balances · assets updating · staking · proxy · pools · wallet │
//! └─────────────────────────────────────────────────────────────────┘
//!                  │ requests + cache key + handling factory
//!                  ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Remote Subscription Service                     │
//! │        (dedup by cache key, ref-counting, Pending/Active)       │
//! └─────────────────────────────────────────────────────────────────┘
//!                  │ setup: coder ─▶ remote keys ─▶ subscribe
//!                  ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                Storage Subscription Container                   │
//! │  ┌────────────┐   ┌────────────────┐   ┌─────────────────────┐  │
//! │  │ Connection │──▶│ Update routing │──▶│ Handlers ─▶ Store   │  │
//! │  │ (JSON-RPC) │   │ (remote key)   │   │        ─▶ Events    │  │
//! │  └────────────┘   └────────────────┘   └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod chain;
pub mod coder;
pub mod config;
pub mod container;
pub mod domain;
pub mod error;
pub mod events;
pub mod handling;
pub mod key;
pub mod models;
pub mod path;
pub mod request;
pub mod rpc;
pub mod runtime;
pub mod service;
pub mod store;
mod strings;
pub mod testing;
pub mod transaction;
pub mod transport;
pub mod types;
pub mod values;

pub use chain::{ChainModel, ChainRegistry, MetaAccount, StaticChainRegistry};
pub use config::{StoreConfig, SyncConfig};
pub use container::StorageSubscriptionContainer;
pub use domain::{
	AssetsUpdatingService, BalanceRemoteSubscriptionService, NominationPoolsRemoteSubscriptionService,
	ProxyRemoteSubscriptionService, RemoteSubscription, StakingRemoteSubscriptionService,
	WalletBalanceSubscription, WalletBalanceUpdate, WalletRemoteSubscription,
};
pub use error::{SubscriptionError, SubscriptionResult};
pub use events::{EventCenter, SyncEvent};
pub use key::CacheKey;
pub use request::SubscriptionRequest;
pub use rpc::SyncRpcClient;
pub use service::{Completion, RemoteSubscriptionService, SubscriptionState};
pub use store::{MemoryStore, PersistenceStore, SqliteStore};
pub use transport::{Connection, RpcConnection};
pub use types::{AccountId, AssetId, ChainAssetId, ChainId, SubscriptionId};
