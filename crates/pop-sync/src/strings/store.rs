// SPDX-License-Identifier: GPL-3.0

//! String constants for the persistence store.

/// SQL statements run when a database is opened.
pub mod sql {
	/// Creates the key-value table if the database is new.
	pub const CREATE_STORAGE_TABLE: &str = "CREATE TABLE IF NOT EXISTS chain_storage (\
		key TEXT PRIMARY KEY NOT NULL, \
		value BLOB NOT NULL\
	)";
}

/// SQLite PRAGMA statements for connection configuration.
pub mod pragmas {
	/// Sets SQLite busy timeout to 5 seconds to reduce lock errors under contention.
	pub const BUSY_TIMEOUT: &str = "PRAGMA busy_timeout=5000;";
	/// Enables Write-Ahead Logging for better concurrency on file databases.
	pub const JOURNAL_MODE_WAL: &str = "PRAGMA journal_mode=WAL;";
}

/// Prefixes of keys under which decoded models are stored.
pub mod prefixes {
	pub const ASSET_BALANCE: &str = "asset-balance";
	pub const ASSET_LOCKS: &str = "asset-locks";
	pub const ASSET_HOLDS: &str = "asset-holds";
	pub const ASSET_FREEZES: &str = "asset-freezes";
}
