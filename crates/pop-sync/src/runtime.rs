// SPDX-License-Identifier: GPL-3.0

//! Runtime providers supply the coder factory of a chain.
//!
//! Fetching a coder factory may suspend until the chain's runtime metadata is available.

use crate::{
	coder::{CoderFactory, MetadataCoderFactory},
	error::RuntimeError,
	rpc::SyncRpcClient,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Source of a chain's coder factory.
#[async_trait]
pub trait RuntimeProvider: Send + Sync {
	/// Resolve the coder factory, waiting for the runtime if needed.
	async fn fetch_coder_factory(&self) -> Result<Arc<dyn CoderFactory>, RuntimeError>;

	/// Whether a runtime snapshot is already available without waiting.
	fn has_snapshot(&self) -> bool;
}

/// Runtime provider fetching metadata over RPC once and caching the decoded result.
pub struct RpcRuntimeProvider {
	client: SyncRpcClient,
	coder: OnceCell<Arc<dyn CoderFactory>>,
}

impl RpcRuntimeProvider {
	pub fn new(client: SyncRpcClient) -> Self {
		Self { client, coder: OnceCell::new() }
	}
}

#[async_trait]
impl RuntimeProvider for RpcRuntimeProvider {
	async fn fetch_coder_factory(&self) -> Result<Arc<dyn CoderFactory>, RuntimeError> {
		let coder = self
			.coder
			.get_or_try_init(|| async {
				let raw = self.client.metadata(None).await?;
				let coder = MetadataCoderFactory::try_from(raw)?;
				log::debug!("Loaded runtime metadata from {}", self.client.endpoint());
				Ok::<_, RuntimeError>(Arc::new(coder) as Arc<dyn CoderFactory>)
			})
			.await?;
		Ok(coder.clone())
	}

	fn has_snapshot(&self) -> bool {
		self.coder.initialized()
	}
}

/// Runtime provider with a coder factory known upfront.
pub struct StaticRuntimeProvider(Arc<dyn CoderFactory>);

impl StaticRuntimeProvider {
	pub fn new(coder: impl CoderFactory + 'static) -> Self {
		Self(Arc::new(coder))
	}
}

#[async_trait]
impl RuntimeProvider for StaticRuntimeProvider {
	async fn fetch_coder_factory(&self) -> Result<Arc<dyn CoderFactory>, RuntimeError> {
		Ok(self.0.clone())
	}

	fn has_snapshot(&self) -> bool {
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{coder::StaticCoderFactory, path::StoragePath};

	#[tokio::test]
	async fn static_provider_is_always_ready() {
		let provider = StaticRuntimeProvider::new(StaticCoderFactory::polkadot_sdk_defaults());
		assert!(provider.has_snapshot());
		let coder = provider.fetch_coder_factory().await.unwrap();
		assert!(coder.entry_layout(&StoragePath::SYSTEM_ACCOUNT).is_some());
	}
}
