// SPDX-License-Identifier: GPL-3.0

//! Error types for storage synchronization.
//!
//! Errors are organized by the context they originate from:
//!
//! - [`key::KeyEncodingError`] - Per-request failures while encoding storage keys.
//! - [`subscription::SubscriptionError`] - Setup failures reported to attach callers.
//! - [`transport::TransportError`] - Failures of the physical storage subscription.
//! - [`rpc::RpcClientError`] - Errors from RPC client operations.
//! - [`runtime::RuntimeError`] - Runtime metadata could not be obtained.
//! - [`handler::HandlerError`] - Decoding or persisting a single storage update failed.
//! - [`store::StoreError`] - Persistence backend errors.
//! - [`config::ConfigError`] - Configuration could not be loaded.

pub mod config;
pub mod handler;
pub mod key;
pub mod rpc;
pub mod runtime;
pub mod store;
pub mod subscription;
pub mod transport;

pub use config::ConfigError;
pub use handler::HandlerError;
pub use key::KeyEncodingError;
pub use rpc::RpcClientError;
pub use runtime::RuntimeError;
pub use store::StoreError;
pub use subscription::{SubscriptionError, SubscriptionResult};
pub use transport::TransportError;
