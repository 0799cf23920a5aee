// SPDX-License-Identifier: GPL-3.0

//! Configuration error types.

use thiserror::Error;

/// Errors that can occur when loading a [`crate::SyncConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	/// IO error.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// The configuration file is not valid TOML.
	#[error("Failed to parse configuration: {0}")]
	Parse(#[from] toml::de::Error),
}
