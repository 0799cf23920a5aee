// SPDX-License-Identifier: GPL-3.0

//! Runtime-derived capability to encode storage keys for a specific chain.
//!
//! A [`CoderFactory`] answers two questions for the key encoder: which hashers a storage entry
//! uses (or whether it exists at all), and how a key parameter is SCALE encoded.
//! [`MetadataCoderFactory`] answers them from a chain's runtime metadata, while
//! [`StaticCoderFactory`] serves a fixed table of layouts.

use crate::{
	error::{KeyEncodingError, RuntimeError},
	path::StoragePath,
	request::{KeyParam, KeyParamType},
	strings::storage::pallets,
};
use scale_info::{PortableRegistry, TypeDef, TypeDefPrimitive};
use sp_core::hashing::{blake2_128, blake2_256, twox_64, twox_128, twox_256};
use std::collections::HashMap;
use subxt::{
	Metadata,
	ext::codec::Decode,
	metadata::types::{StorageEntryType, StorageHasher as MetadataHasher},
};

/// Hashing scheme applied to one key parameter of a storage map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum StorageHasher {
	Blake2_128,
	Blake2_256,
	Blake2_128Concat,
	Twox128,
	Twox256,
	Twox64Concat,
	Identity,
}

impl StorageHasher {
	/// Hash an encoded key parameter.
	pub fn hash(&self, data: &[u8]) -> Vec<u8> {
		match self {
			StorageHasher::Blake2_128 => blake2_128(data).to_vec(),
			StorageHasher::Blake2_256 => blake2_256(data).to_vec(),
			StorageHasher::Blake2_128Concat => [blake2_128(data).as_slice(), data].concat(),
			StorageHasher::Twox128 => twox_128(data).to_vec(),
			StorageHasher::Twox256 => twox_256(data).to_vec(),
			StorageHasher::Twox64Concat => [twox_64(data).as_slice(), data].concat(),
			StorageHasher::Identity => data.to_vec(),
		}
	}
}

impl From<&MetadataHasher> for StorageHasher {
	fn from(hasher: &MetadataHasher) -> Self {
		match hasher {
			MetadataHasher::Blake2_128 => StorageHasher::Blake2_128,
			MetadataHasher::Blake2_256 => StorageHasher::Blake2_256,
			MetadataHasher::Blake2_128Concat => StorageHasher::Blake2_128Concat,
			MetadataHasher::Twox128 => StorageHasher::Twox128,
			MetadataHasher::Twox256 => StorageHasher::Twox256,
			MetadataHasher::Twox64Concat => StorageHasher::Twox64Concat,
			MetadataHasher::Identity => StorageHasher::Identity,
		}
	}
}

/// Key layout of a storage entry: one hasher per key parameter, none for plain values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryLayout {
	pub hashers: Vec<StorageHasher>,
}

impl EntryLayout {
	/// Layout of a plain storage value.
	pub fn plain() -> Self {
		Self::default()
	}

	/// Layout of a map keyed by one parameter per hasher.
	pub fn map(hashers: impl Into<Vec<StorageHasher>>) -> Self {
		Self { hashers: hashers.into() }
	}
}

/// Encoding capability derived from the runtime of one chain.
pub trait CoderFactory: Send + Sync {
	/// The key layout of `path`, or `None` when the runtime has no such entry.
	fn entry_layout(&self, path: &StoragePath) -> Option<EntryLayout>;

	/// Encode the key parameter at `index` of `path` before it is hashed.
	fn encode_param(
		&self,
		_path: &StoragePath,
		_index: usize,
		param: &KeyParam,
	) -> Result<Vec<u8>, KeyEncodingError> {
		param.encode_default()
	}
}

/// Coder factory serving a fixed table of entry layouts.
///
/// # Example
///
/// ```ignore
/// let coder = StaticCoderFactory::default()
/// 	.with_entry(StoragePath::SYSTEM_ACCOUNT, [StorageHasher::Blake2_128Concat])
/// 	.with_plain(StoragePath::MAX_POOL_MEMBERS_PER_POOL);
/// ```
#[derive(Clone, Debug, Default)]
pub struct StaticCoderFactory {
	entries: HashMap<StoragePath, EntryLayout>,
}

impl StaticCoderFactory {
	/// Register a map entry.
	pub fn with_entry(mut self, path: StoragePath, hashers: impl Into<Vec<StorageHasher>>) -> Self {
		self.entries.insert(path, EntryLayout::map(hashers));
		self
	}

	/// Register a plain value entry.
	pub fn with_plain(mut self, path: StoragePath) -> Self {
		self.entries.insert(path, EntryLayout::plain());
		self
	}

	/// Layouts of the storage entries every supported balance flavour touches.
	pub fn polkadot_sdk_defaults() -> Self {
		use StorageHasher::*;
		Self::default()
			.with_entry(StoragePath::SYSTEM_ACCOUNT, [Blake2_128Concat])
			.with_entry(StoragePath::BALANCES_LOCKS, [Blake2_128Concat])
			.with_entry(StoragePath::BALANCES_HOLDS, [Blake2_128Concat])
			.with_entry(StoragePath::BALANCES_FREEZES, [Blake2_128Concat])
			.with_entry(StoragePath::ORML_ACCOUNTS, [Blake2_128Concat, Twox64Concat])
			.with_entry(StoragePath::ORML_LOCKS, [Blake2_128Concat, Twox64Concat])
			.with_entry(StoragePath::assets_account(pallets::ASSETS), [Blake2_128Concat, Blake2_128Concat])
			.with_entry(StoragePath::assets_details(pallets::ASSETS), [Blake2_128Concat])
			.with_entry(StoragePath::EQUILIBRIUM_RESERVED, [Blake2_128Concat, Blake2_128Concat])
			.with_entry(StoragePath::EQUILIBRIUM_LOCKED, [Blake2_128Concat])
			.with_entry(StoragePath::STAKING_BONDED, [Twox64Concat])
			.with_entry(StoragePath::STAKING_LEDGER, [Blake2_128Concat])
			.with_entry(StoragePath::STAKING_NOMINATORS, [Twox64Concat])
			.with_entry(StoragePath::STAKING_VALIDATORS, [Twox64Concat])
			.with_entry(StoragePath::STAKING_PAYEE, [Twox64Concat])
			.with_entry(StoragePath::DEFAULT_BAG_LIST_NODE, [Twox64Concat])
			.with_entry(StoragePath::PROXY_PROXIES, [Twox64Concat])
			.with_entry(StoragePath::POOL_MEMBERS, [Twox64Concat])
			.with_entry(StoragePath::BONDED_POOLS, [Twox64Concat])
			.with_entry(StoragePath::REWARD_POOLS, [Twox64Concat])
			.with_entry(StoragePath::SUB_POOLS, [Twox64Concat])
			.with_plain(StoragePath::MAX_POOL_MEMBERS_PER_POOL)
	}
}

impl CoderFactory for StaticCoderFactory {
	fn entry_layout(&self, path: &StoragePath) -> Option<EntryLayout> {
		self.entries.get(path).cloned()
	}
}

/// Coder factory backed by a chain's runtime metadata.
#[derive(Debug)]
pub struct MetadataCoderFactory(Metadata);

impl MetadataCoderFactory {
	pub fn new(metadata: Metadata) -> Self {
		Self(metadata)
	}

	/// The wrapped metadata.
	pub fn metadata(&self) -> &Metadata {
		&self.0
	}
}

impl CoderFactory for MetadataCoderFactory {
	fn entry_layout(&self, path: &StoragePath) -> Option<EntryLayout> {
		let entry = self.0.pallet_by_name(&path.module)?.storage()?.entry_by_name(&path.item)?;
		let hashers = match entry.entry_type() {
			StorageEntryType::Plain(_) => Vec::new(),
			StorageEntryType::Map { hashers, .. } => hashers.iter().map(StorageHasher::from).collect(),
		};
		Some(EntryLayout { hashers })
	}

	fn encode_param(
		&self,
		path: &StoragePath,
		index: usize,
		param: &KeyParam,
	) -> Result<Vec<u8>, KeyEncodingError> {
		param.encode_as(self.key_param_type(path, index))
	}
}

impl MetadataCoderFactory {
	/// Declared type of the key parameter at `index` of `path`.
	pub fn key_param_type(&self, path: &StoragePath, index: usize) -> KeyParamType {
		let entry = self
			.0
			.pallet_by_name(&path.module)
			.and_then(|pallet| pallet.storage())
			.and_then(|storage| storage.entry_by_name(&path.item));
		match entry.map(|entry| entry.entry_type()) {
			Some(StorageEntryType::Map { hashers, key_ty, .. }) =>
				key_param_type(self.0.types(), *key_ty, hashers.len(), index),
			_ => KeyParamType::Other,
		}
	}
}

/// Resolve the type of one key parameter of a map keyed by `key_ty`.
///
/// Maps with more than one hasher declare their key as a tuple with one field per hasher.
pub fn key_param_type(types: &PortableRegistry, key_ty: u32, arity: usize, index: usize) -> KeyParamType {
	if arity <= 1 {
		return param_type(types, key_ty);
	}
	match types.resolve(key_ty).map(|ty| ty.type_def()) {
		Some(TypeDef::Tuple(tuple)) => tuple
			.fields()
			.get(index)
			.map_or(KeyParamType::Other, |field| param_type(types, field.id)),
		_ => KeyParamType::Other,
	}
}

fn param_type(types: &PortableRegistry, id: u32) -> KeyParamType {
	match types.resolve(id).map(|ty| ty.type_def()) {
		Some(TypeDef::Primitive(primitive)) => match primitive {
			TypeDefPrimitive::U8 => KeyParamType::U8,
			TypeDefPrimitive::U16 => KeyParamType::U16,
			TypeDefPrimitive::U32 => KeyParamType::U32,
			TypeDefPrimitive::U64 => KeyParamType::U64,
			TypeDefPrimitive::U128 => KeyParamType::U128,
			_ => KeyParamType::Other,
		},
		// Newtype wrappers such as `AssetId(u128)`.
		Some(TypeDef::Composite(composite)) if composite.fields.len() == 1 =>
			param_type(types, composite.fields[0].ty.id),
		_ => KeyParamType::Other,
	}
}

impl TryFrom<&[u8]> for MetadataCoderFactory {
	type Error = RuntimeError;

	fn try_from(mut bytes: &[u8]) -> Result<Self, Self::Error> {
		let metadata = Metadata::decode(&mut bytes).map_err(|_| RuntimeError::MetadataDecode)?;
		Ok(Self(metadata))
	}
}

impl TryFrom<Vec<u8>> for MetadataCoderFactory {
	type Error = RuntimeError;

	fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
		Self::try_from(bytes.as_slice())
	}
}
