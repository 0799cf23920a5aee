// SPDX-License-Identifier: GPL-3.0

//! String constants for the RPC client and transport.

/// JSON-RPC method names.
pub mod methods {
	pub const STATE_GET_METADATA: &str = "state_getMetadata";
	pub const STATE_SUBSCRIBE_STORAGE: &str = "state_subscribeStorage";
	pub const STATE_UNSUBSCRIBE_STORAGE: &str = "state_unsubscribeStorage";
}
