// SPDX-License-Identifier: GPL-3.0

//! Persistence store error types.

use thiserror::Error;

/// Errors that can occur when interacting with a [`crate::PersistenceStore`].
#[derive(Debug, Error)]
pub enum StoreError {
	/// Database error.
	#[error("Database error: {0}")]
	Database(#[from] diesel::result::Error),
	/// Database connection error.
	#[error("Database connection error: {0}")]
	Connection(#[from] diesel::result::ConnectionError),
	/// Connection pool get error (wrapping bb8 RunError).
	#[error("Connection pool get error: {0}")]
	PoolGet(#[from] diesel_async::pooled_connection::bb8::RunError),
	/// Connection pool build error.
	#[error("Connection pool build error: {0}")]
	PoolBuild(#[from] diesel_async::pooled_connection::PoolError),
	/// IO error.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}
