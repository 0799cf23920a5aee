// SPDX-License-Identifier: GPL-3.0

//! Remote subscription setup error types.

use super::{KeyEncodingError, RuntimeError, TransportError};
use crate::types::{ChainAssetId, ChainId};
use thiserror::Error;

/// Outcome delivered to attach and detach completions.
pub type SubscriptionResult = Result<(), SubscriptionError>;

/// Errors that abort the setup of a remote subscription.
///
/// A single failure is delivered to every caller waiting on the same cache key, so the type is
/// cheaply cloneable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubscriptionError {
	/// Runtime metadata for the chain could not be obtained.
	#[error("Runtime unavailable for chain {chain_id}: {message}")]
	RuntimeUnavailable {
		/// Chain the subscription targets.
		chain_id: ChainId,
		/// Underlying reason.
		message: String,
	},
	/// No connection is registered for the chain.
	#[error("No connection available for chain {0}")]
	ConnectionUnavailable(ChainId),
	/// Key encoding results do not line up with the submitted requests.
	#[error("Remote keys do not match local keys: expected {expected}, got {actual}")]
	RemoteKeysNotMatchLocal {
		/// What the requests called for.
		expected: String,
		/// What key encoding produced.
		actual: String,
	},
	/// Every request was dropped during key encoding.
	#[error("No storage keys left to subscribe")]
	NoStorageKeys,
	/// The physical subscription could not be opened.
	#[error("Transport error: {0}")]
	Transport(String),
	/// The chain has no asset with the requested id.
	#[error("Unknown asset {0}")]
	UnknownAsset(ChainAssetId),
	/// The asset's balance cannot be followed through a storage subscription.
	#[error("Balance subscriptions are not supported for {0}")]
	UnsupportedAsset(ChainAssetId),
	/// A storage key of a standalone subscription could not be encoded.
	#[error("Failed to encode storage key: {0}")]
	KeyEncoding(String),
}

impl SubscriptionError {
	pub(crate) fn runtime(chain_id: &ChainId, err: RuntimeError) -> Self {
		SubscriptionError::RuntimeUnavailable { chain_id: chain_id.clone(), message: err.to_string() }
	}
}

impl From<KeyEncodingError> for SubscriptionError {
	fn from(err: KeyEncodingError) -> Self {
		SubscriptionError::KeyEncoding(err.to_string())
	}
}

impl From<TransportError> for SubscriptionError {
	fn from(err: TransportError) -> Self {
		SubscriptionError::Transport(err.to_string())
	}
}
