// SPDX-License-Identifier: GPL-3.0

//! RPC client wrapper for the request/response calls synchronization needs.
//!
//! Wraps subxt's [`LegacyRpcMethods`]. Storage subscriptions go through
//! [`RpcConnection`](crate::transport::RpcConnection), which shares the same underlying client.

use crate::{error::RpcClientError, strings::rpc::methods, transport::RpcConnection, types::BlockHash};
use subxt::{
	SubstrateConfig,
	backend::{legacy::LegacyRpcMethods, rpc::RpcClient},
};
use url::Url;

/// RPC client of one chain.
#[derive(Clone)]
pub struct SyncRpcClient {
	client: RpcClient,
	legacy: LegacyRpcMethods<SubstrateConfig>,
	endpoint: Url,
}

impl SyncRpcClient {
	/// Connect to a live Polkadot-SDK chain.
	///
	/// # Arguments
	/// * `endpoint` - WebSocket URL of the chain's RPC endpoint (e.g., `wss://rpc.polkadot.io`)
	pub async fn connect(endpoint: &Url) -> Result<Self, RpcClientError> {
		let client = RpcClient::from_url(endpoint.as_str()).await.map_err(|e| {
			RpcClientError::ConnectionFailed { endpoint: endpoint.to_string(), message: e.to_string() }
		})?;
		let legacy = LegacyRpcMethods::new(client.clone());
		Ok(Self { client, legacy, endpoint: endpoint.clone() })
	}

	/// Get the endpoint URL this client is connected to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Fetch the SCALE encoded runtime metadata, at the best block when `at` is `None`.
	pub async fn metadata(&self, at: Option<BlockHash>) -> Result<Vec<u8>, RpcClientError> {
		let metadata = self.legacy.state_get_metadata(at).await.map_err(|e| {
			RpcClientError::RequestFailed { method: methods::STATE_GET_METADATA, message: e.to_string() }
		})?;
		Ok(metadata.into_raw())
	}

	/// A storage subscription connection sharing this client.
	pub fn connection(&self) -> RpcConnection {
		RpcConnection::new(self.client.clone())
	}
}
