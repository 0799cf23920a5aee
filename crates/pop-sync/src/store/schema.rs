// SPDX-License-Identifier: GPL-3.0

// Diesel schema for the SQLite persistence store.
diesel::table! {
	chain_storage (key) {
		key -> Text,
		value -> Binary,
	}
}
