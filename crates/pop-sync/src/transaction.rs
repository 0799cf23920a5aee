// SPDX-License-Identifier: GPL-3.0

//! Hooks into transaction history synchronization.
//!
//! Balance handlers call [`TransactionSubscription::process`] for every block at which an
//! account's balance changed, so history can be fetched for exactly those blocks.

use crate::{chain::ChainModel, types::{AccountId, BlockHash}};
use std::sync::Arc;

/// Processes the transactions of one account on one chain.
pub trait TransactionSubscription: Send + Sync {
	/// Inspect `block_hash` for transactions of the account.
	fn process(&self, block_hash: BlockHash);
}

/// Creates [`TransactionSubscription`]s.
pub trait TransactionSubscriptionFactory: Send + Sync {
	/// `None` when the chain has no transaction history support.
	fn create(&self, account: &AccountId, chain: &ChainModel) -> Option<Arc<dyn TransactionSubscription>>;
}
