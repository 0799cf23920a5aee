// SPDX-License-Identifier: GPL-3.0

//! Transport error types.

use thiserror::Error;

/// Errors raised by a [`crate::Connection`] while managing storage subscriptions.
#[derive(Debug, Error)]
pub enum TransportError {
	/// The node rejected or failed the subscription request.
	#[error("Subscription `{method}` failed: {message}")]
	SubscriptionFailed {
		/// The subscribe method that failed.
		method: &'static str,
		/// The error message describing the failure.
		message: String,
	},
	/// A notification could not be interpreted.
	#[error("Invalid storage notification: {0}")]
	InvalidNotification(String),
	/// The subscription stream ended.
	#[error("Subscription closed by the node")]
	Closed,
}
