// SPDX-License-Identifier: GPL-3.0

//! Runtime metadata error types.

use super::RpcClientError;
use thiserror::Error;

/// Errors that can occur while obtaining a coder factory for a chain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
	/// The metadata could not be fetched.
	#[error("Metadata unavailable: {0}")]
	MetadataUnavailable(String),
	/// Failed to decode the fetched metadata.
	#[error("Failed to decode metadata")]
	MetadataDecode,
}

impl From<RpcClientError> for RuntimeError {
	fn from(err: RpcClientError) -> Self {
		RuntimeError::MetadataUnavailable(err.to_string())
	}
}
