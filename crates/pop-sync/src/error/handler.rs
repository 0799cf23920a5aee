// SPDX-License-Identifier: GPL-3.0

//! Storage update handler error types.

use super::StoreError;
use thiserror::Error;

/// Errors raised while decoding or persisting one storage update.
///
/// They are contained to the handler invocation that produced them.
#[derive(Debug, Error)]
pub enum HandlerError {
	/// The storage value could not be decoded.
	#[error("Failed to decode value for {local_key}: {source}")]
	Decode {
		/// Local key the value was routed to.
		local_key: String,
		/// Codec error.
		source: scale::Error,
	},
	/// Persisting the decoded value failed.
	#[error(transparent)]
	Store(#[from] StoreError),
	/// Serializing the decoded value failed.
	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl HandlerError {
	pub(crate) fn decode(local_key: &str, source: scale::Error) -> Self {
		HandlerError::Decode { local_key: local_key.to_string(), source }
	}
}
