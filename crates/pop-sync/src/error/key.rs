// SPDX-License-Identifier: GPL-3.0

//! Storage key encoding error types.

use thiserror::Error;

/// Errors that can occur while encoding a single subscription request into a storage key.
///
/// None of these abort a subscription batch: the request that produced the error is dropped
/// and the remaining keys are still subscribed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyEncodingError {
	/// The storage entry does not exist in the runtime of the target chain.
	#[error("Storage path {module}.{item} is not present in the runtime")]
	PathNotInRuntime {
		/// Pallet name.
		module: String,
		/// Storage item name.
		item: String,
	},
	/// The number of key parameters does not match the hashers of the storage entry.
	#[error("Storage path {path} expects {expected} key parameters, got {actual}")]
	ArityMismatch {
		/// The `Module.Item` path.
		path: String,
		/// Number of hashers declared by the entry.
		expected: usize,
		/// Number of parameters supplied.
		actual: usize,
	},
	/// A key parameter could not be produced.
	#[error("Invalid key parameter: {0}")]
	InvalidKeyParam(String),
	/// The coder factory could not be obtained for this request.
	#[error("Runtime unavailable for key encoding: {0}")]
	Runtime(String),
}

impl KeyEncodingError {
	/// Whether the error only means the storage entry is missing from the runtime.
	pub fn is_missing_path(&self) -> bool {
		matches!(self, KeyEncodingError::PathNotInRuntime { .. })
	}
}
