// SPDX-License-Identifier: GPL-3.0

//! Subscription requests: one `(remote key derivation, local key)` pair each.
//!
//! Requests are plain values built fresh for every attach. The remote key is only derived once
//! the chain's coder factory is available, see [`SubscriptionRequest::key_encoding`].

use crate::{
	coder::CoderFactory,
	error::{KeyEncodingError, RuntimeError},
	key::StorageKeyFactory,
	path::StoragePath,
	types::AccountId,
};
use futures::future::{BoxFuture, FutureExt, Shared};
use scale::Encode;
use std::sync::Arc;

/// A coder factory that may still be loading, shared by all requests of one setup.
pub type CoderProvider = Shared<BoxFuture<'static, Result<Arc<dyn CoderFactory>, RuntimeError>>>;

/// Typed storage key parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyParam {
	/// Raw account bytes, encoded as-is.
	AccountId(AccountId),
	U32(u32),
	U64(u64),
	U128(u128),
	/// Variable length bytes, SCALE encoded with a length prefix.
	Bytes(Vec<u8>),
	/// Bytes that are already SCALE encoded.
	Encoded(Vec<u8>),
	/// `0x`-prefixed (or bare) hex of already encoded bytes.
	Hex(String),
	/// Asset identifier as found in chain configuration: a decimal number or hex of encoded bytes.
	AssetId(String),
}

/// Integer width of a key parameter as declared by a runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyParamType {
	U8,
	U16,
	U32,
	U64,
	U128,
	/// Anything else; the parameter keeps its default encoding.
	Other,
}

impl KeyParam {
	/// SCALE encoding used when no custom encoder is attached.
	pub fn encode_default(&self) -> Result<Vec<u8>, KeyEncodingError> {
		Ok(match self {
			KeyParam::AccountId(account) => account.as_bytes().to_vec(),
			KeyParam::U32(value) => value.encode(),
			KeyParam::U64(value) => value.encode(),
			KeyParam::U128(value) => value.encode(),
			KeyParam::Bytes(bytes) => bytes.encode(),
			KeyParam::Encoded(bytes) => bytes.clone(),
			KeyParam::Hex(value) => decode_hex(value)?,
			KeyParam::AssetId(value) if is_decimal(value) => match value.parse::<u32>() {
				Ok(id) => id.encode(),
				Err(_) => parse_decimal::<u128>(value)?.encode(),
			},
			KeyParam::AssetId(value) => decode_hex(value)?,
		})
	}

	/// SCALE encoding for a parameter the runtime declares as `ty`.
	///
	/// Only decimal asset ids depend on the declared type: they are encoded with its width.
	pub fn encode_as(&self, ty: KeyParamType) -> Result<Vec<u8>, KeyEncodingError> {
		let KeyParam::AssetId(value) = self else {
			return self.encode_default();
		};
		if !is_decimal(value) {
			return self.encode_default();
		}
		Ok(match ty {
			KeyParamType::U8 => parse_decimal::<u8>(value)?.encode(),
			KeyParamType::U16 => parse_decimal::<u16>(value)?.encode(),
			KeyParamType::U32 => parse_decimal::<u32>(value)?.encode(),
			KeyParamType::U64 => parse_decimal::<u64>(value)?.encode(),
			KeyParamType::U128 => parse_decimal::<u128>(value)?.encode(),
			KeyParamType::Other => return self.encode_default(),
		})
	}

	/// The parameter's bytes without any SCALE framing.
	pub fn raw_bytes(&self) -> Result<Vec<u8>, KeyEncodingError> {
		match self {
			KeyParam::Bytes(bytes) => Ok(bytes.clone()),
			other => other.encode_default(),
		}
	}
}

impl From<AccountId> for KeyParam {
	fn from(account: AccountId) -> Self {
		KeyParam::AccountId(account)
	}
}

impl From<&AccountId> for KeyParam {
	fn from(account: &AccountId) -> Self {
		KeyParam::AccountId(account.clone())
	}
}

fn is_decimal(value: &str) -> bool {
	!value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn parse_decimal<T: std::str::FromStr>(value: &str) -> Result<T, KeyEncodingError>
where
	T::Err: std::fmt::Display,
{
	value.parse().map_err(|err| KeyEncodingError::InvalidKeyParam(format!("{value}: {err}")))
}

fn decode_hex(value: &str) -> Result<Vec<u8>, KeyEncodingError> {
	hex::decode(value.trim_start_matches("0x"))
		.map_err(|err| KeyEncodingError::InvalidKeyParam(format!("{value}: {err}")))
}

/// How a key parameter is turned into bytes before hashing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParamEncoder {
	/// Ask the chain's coder factory.
	#[default]
	Default,
	/// Use the parameter's raw bytes verbatim.
	Identity,
}

/// One key parameter together with its encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyComponent {
	pub param: KeyParam,
	pub encoder: ParamEncoder,
}

impl KeyComponent {
	/// A parameter whose bytes are used verbatim.
	pub fn identity(param: KeyParam) -> Self {
		Self { param, encoder: ParamEncoder::Identity }
	}

	fn encode(
		&self,
		path: &StoragePath,
		index: usize,
		coder: &dyn CoderFactory,
	) -> Result<Vec<u8>, KeyEncodingError> {
		match self.encoder {
			ParamEncoder::Default => coder.encode_param(path, index, &self.param),
			ParamEncoder::Identity => self.param.raw_bytes(),
		}
	}
}

impl From<KeyParam> for KeyComponent {
	fn from(param: KeyParam) -> Self {
		Self { param, encoder: ParamEncoder::Default }
	}
}

/// Remote key produced for a request, paired with the request's local key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPair {
	pub remote_key: Vec<u8>,
	pub local_key: String,
}

/// Description of one storage entry instance to subscribe to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionRequest {
	/// A plain storage value.
	Unkeyed { path: StoragePath, local_key: String },
	/// A map entry keyed by one parameter.
	Map { path: StoragePath, local_key: String, key: KeyComponent },
	/// A double map entry; each component carries its own encoder.
	DoubleMap { path: StoragePath, local_key: String, keys: (KeyComponent, KeyComponent) },
	/// A map entry of arbitrary arity.
	NMap { path: StoragePath, local_key: String, keys: Vec<KeyComponent> },
}

impl SubscriptionRequest {
	pub fn unkeyed(path: StoragePath, local_key: impl Into<String>) -> Self {
		SubscriptionRequest::Unkeyed { path, local_key: local_key.into() }
	}

	pub fn map(path: StoragePath, local_key: impl Into<String>, key: impl Into<KeyComponent>) -> Self {
		SubscriptionRequest::Map { path, local_key: local_key.into(), key: key.into() }
	}

	pub fn double_map(
		path: StoragePath,
		local_key: impl Into<String>,
		first: impl Into<KeyComponent>,
		second: impl Into<KeyComponent>,
	) -> Self {
		SubscriptionRequest::DoubleMap {
			path,
			local_key: local_key.into(),
			keys: (first.into(), second.into()),
		}
	}

	pub fn n_map(path: StoragePath, local_key: impl Into<String>, keys: Vec<KeyComponent>) -> Self {
		SubscriptionRequest::NMap { path, local_key: local_key.into(), keys }
	}

	pub fn path(&self) -> &StoragePath {
		match self {
			SubscriptionRequest::Unkeyed { path, .. } |
			SubscriptionRequest::Map { path, .. } |
			SubscriptionRequest::DoubleMap { path, .. } |
			SubscriptionRequest::NMap { path, .. } => path,
		}
	}

	pub fn local_key(&self) -> &str {
		match self {
			SubscriptionRequest::Unkeyed { local_key, .. } |
			SubscriptionRequest::Map { local_key, .. } |
			SubscriptionRequest::DoubleMap { local_key, .. } |
			SubscriptionRequest::NMap { local_key, .. } => local_key,
		}
	}

	fn components(&self) -> Vec<&KeyComponent> {
		match self {
			SubscriptionRequest::Unkeyed { .. } => Vec::new(),
			SubscriptionRequest::Map { key, .. } => vec![key],
			SubscriptionRequest::DoubleMap { keys: (first, second), .. } => vec![first, second],
			SubscriptionRequest::NMap { keys, .. } => keys.iter().collect(),
		}
	}

	/// Encode the remote key with a coder factory at hand.
	pub fn encode_remote_key(
		&self,
		key_factory: &StorageKeyFactory,
		coder: &dyn CoderFactory,
	) -> Result<Vec<u8>, KeyEncodingError> {
		let params = self
			.components()
			.into_iter()
			.enumerate()
			.map(|(index, component)| component.encode(self.path(), index, coder))
			.collect::<Result<Vec<_>, _>>()?;
		key_factory.encode(self.path(), &params, coder)
	}

	/// Future resolving to the remote key once the coder factory is available.
	pub fn key_encoding(
		&self,
		key_factory: StorageKeyFactory,
		coder: CoderProvider,
	) -> BoxFuture<'static, Result<KeyPair, KeyEncodingError>> {
		let request = self.clone();
		async move {
			let coder = coder.await.map_err(|err| KeyEncodingError::Runtime(err.to_string()))?;
			let remote_key = request.encode_remote_key(&key_factory, coder.as_ref())?;
			Ok(KeyPair { remote_key, local_key: request.local_key().to_string() })
		}
		.boxed()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		coder::{StaticCoderFactory, StorageHasher},
		testing::ALICE,
	};
	use futures::future;

	fn provider(coder: StaticCoderFactory) -> CoderProvider {
		let coder: Arc<dyn CoderFactory> = Arc::new(coder);
		future::ready(Ok(coder)).boxed().shared()
	}

	#[test]
	fn asset_ids_encode_numbers_as_u32() {
		assert_eq!(KeyParam::AssetId("1984".into()).encode_default().unwrap(), 1984u32.encode());
		assert_eq!(KeyParam::AssetId("0x0102".into()).encode_default().unwrap(), vec![1, 2]);
	}

	#[test]
	fn large_asset_ids_fall_back_to_u128() {
		let id = 42259045809535163221576417993425387648u128;
		let param = KeyParam::AssetId(id.to_string());
		assert_eq!(param.encode_default().unwrap(), id.encode());
		assert_eq!(param.encode_default().unwrap().len(), 16);
	}

	#[test]
	fn asset_ids_follow_the_declared_width() {
		let param = KeyParam::AssetId("1984".into());
		assert_eq!(param.encode_as(KeyParamType::U128).unwrap(), 1984u128.encode());
		assert_eq!(param.encode_as(KeyParamType::U64).unwrap(), 1984u64.encode());
		assert_eq!(param.encode_as(KeyParamType::Other).unwrap(), 1984u32.encode());
		assert!(matches!(
			param.encode_as(KeyParamType::U8).unwrap_err(),
			KeyEncodingError::InvalidKeyParam(_)
		));
		assert_eq!(KeyParam::AssetId("0x0102".into()).encode_as(KeyParamType::U32).unwrap(), vec![1, 2]);
		assert_eq!(KeyParam::U32(7).encode_as(KeyParamType::U128).unwrap(), 7u32.encode());
	}

	#[test]
	fn invalid_hex_is_rejected() {
		let err = KeyParam::Hex("0xzz".into()).encode_default().unwrap_err();
		assert!(matches!(err, KeyEncodingError::InvalidKeyParam(_)));
	}

	#[test]
	fn identity_encoder_skips_length_prefix() {
		let param = KeyParam::Bytes(vec![7, 8]);
		let coder = StaticCoderFactory::default();
		let path = StoragePath::SYSTEM_ACCOUNT;
		assert_eq!(KeyComponent::from(param.clone()).encode(&path, 0, &coder).unwrap(), vec![8, 7, 8]);
		assert_eq!(KeyComponent::identity(param).encode(&path, 0, &coder).unwrap(), vec![7, 8]);
	}

	#[tokio::test]
	async fn key_encoding_pairs_remote_and_local_keys() {
		let request = SubscriptionRequest::map(
			StoragePath::SYSTEM_ACCOUNT,
			"account",
			KeyParam::from(AccountId::from(ALICE)),
		);
		let coder = StaticCoderFactory::default()
			.with_entry(StoragePath::SYSTEM_ACCOUNT, [StorageHasher::Blake2_128Concat]);

		let pair = request.key_encoding(StorageKeyFactory, provider(coder)).await.unwrap();
		assert_eq!(pair.local_key, "account");
		assert!(pair.remote_key.ends_with(&ALICE));
	}

	#[tokio::test]
	async fn key_encoding_fails_when_param_cannot_be_resolved() {
		let request = SubscriptionRequest::double_map(
			StoragePath::ORML_ACCOUNTS,
			"tokens",
			KeyParam::from(AccountId::from(ALICE)),
			KeyComponent::identity(KeyParam::Hex("not hex".into())),
		);
		let err = request
			.key_encoding(StorageKeyFactory, provider(StaticCoderFactory::polkadot_sdk_defaults()))
			.await
			.unwrap_err();
		assert!(matches!(err, KeyEncodingError::InvalidKeyParam(_)));
	}

	#[tokio::test]
	async fn key_encoding_reports_runtime_failures() {
		let failing: CoderProvider =
			future::ready(Err(RuntimeError::MetadataDecode)).boxed().shared();
		let request = SubscriptionRequest::unkeyed(StoragePath::MAX_POOL_MEMBERS_PER_POOL, "max");
		let err = request.key_encoding(StorageKeyFactory, failing).await.unwrap_err();
		assert_eq!(err, KeyEncodingError::Runtime("Failed to decode metadata".into()));
	}
}
