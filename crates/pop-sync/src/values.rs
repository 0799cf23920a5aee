// SPDX-License-Identifier: GPL-3.0

//! SCALE value types decoded from chain storage.
//!
//! Only the leading fields each handler needs are declared. SCALE decoding does not require the
//! whole input to be consumed, so trailing fields added by newer runtimes are ignored.

use scale::{Compact, Decode, Input};

/// Set in [`AccountData::flags`] by runtimes using the fungible balances logic.
pub const NEW_LOGIC_FLAG: u128 = 0x8000_0000_0000_0000_0000_0000_0000_0000;

/// `frame_system::AccountInfo` with `pallet_balances::AccountData`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Decode, scale::Encode)]
pub struct AccountInfo {
	pub nonce: u32,
	pub consumers: u32,
	pub providers: u32,
	pub sufficients: u32,
	pub data: AccountData,
}

/// Balances of an account.
///
/// Legacy runtimes store `misc_frozen` and `fee_frozen` in the last two fields; current ones store
/// `frozen` and `flags`, with [`NEW_LOGIC_FLAG`] set in `flags`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Decode, scale::Encode)]
pub struct AccountData {
	pub free: u128,
	pub reserved: u128,
	pub frozen: u128,
	pub flags: u128,
}

impl AccountData {
	/// Whether the account data follows the fungible (`frozen`/`flags`) layout.
	pub fn uses_new_logic(&self) -> bool {
		self.flags & NEW_LOGIC_FLAG != 0
	}

	/// Amount that cannot be transferred.
	pub fn locked(&self) -> u128 {
		if self.uses_new_logic() { self.frozen } else { self.frozen.max(self.flags) }
	}
}

/// Reasons a balance lock applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Decode, scale::Encode)]
pub enum LockReasons {
	Fee,
	Misc,
	All,
}

/// `pallet_balances::BalanceLock`.
#[derive(Clone, Debug, PartialEq, Eq, Decode, scale::Encode)]
pub struct BalanceLock {
	pub id: [u8; 8],
	pub amount: u128,
	pub reasons: LockReasons,
}

/// `orml_tokens::AccountData`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Decode, scale::Encode)]
pub struct OrmlAccountData {
	pub free: u128,
	pub reserved: u128,
	pub frozen: u128,
}

/// `orml_tokens::BalanceLock`.
#[derive(Clone, Debug, PartialEq, Eq, Decode, scale::Encode)]
pub struct OrmlBalanceLock {
	pub id: [u8; 8],
	pub amount: u128,
}

/// An amount reserved or frozen under an opaque, runtime-defined reason.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdAmount {
	/// SCALE encoding of the reason.
	pub id: Vec<u8>,
	pub amount: u128,
}

/// Decode a `Vec<IdAmount<Reason, u128>>`, as stored by `Balances.Holds` and `Balances.Freezes`.
///
/// Reasons are runtime-specific enums. All entries share one reason type whose encoded width is
/// derived from the total payload length.
pub fn decode_id_amounts(mut input: &[u8]) -> Result<Vec<IdAmount>, scale::Error> {
	let Compact(count) = Compact::<u32>::decode(&mut input)?;
	if count == 0 {
		return Ok(Vec::new());
	}
	let count = count as usize;
	let entry_len = input.len() / count;
	if entry_len <= 16 || entry_len * count != input.len() {
		return Err("Unexpected length of id-amount list".into());
	}
	let id_len = entry_len - 16;
	let mut entries = Vec::with_capacity(count);
	for _ in 0..count {
		let mut id = vec![0u8; id_len];
		input.read(&mut id)?;
		let amount = u128::decode(&mut input)?;
		entries.push(IdAmount { id, amount });
	}
	Ok(entries)
}

/// Status of an account in an assets pallet. Older runtimes store a `bool` frozen flag in the
/// same position, which decodes as `Liquid` or `Frozen`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Decode, scale::Encode)]
pub enum AssetAccountStatus {
	#[default]
	Liquid,
	Frozen,
	Blocked,
}

/// `pallet_assets::AssetAccount`.
#[derive(Clone, Debug, PartialEq, Eq, Decode, scale::Encode)]
pub struct AssetAccount {
	pub balance: u128,
	pub status: AssetAccountStatus,
}

/// Status of an asset class. Older runtimes store a `bool` frozen flag instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Decode, scale::Encode)]
pub enum AssetStatus {
	#[default]
	Live,
	Frozen,
	Destroying,
}

/// `pallet_assets::AssetDetails`, generic over the chain's account type.
#[derive(Clone, Debug, PartialEq, Eq, Decode, scale::Encode)]
pub struct AssetDetails<A = [u8; 32]> {
	pub owner: A,
	pub issuer: A,
	pub admin: A,
	pub freezer: A,
	pub supply: u128,
	pub deposit: u128,
	pub min_balance: u128,
	pub is_sufficient: bool,
	pub accounts: u32,
	pub sufficients: u32,
	pub approvals: u32,
	pub status: AssetStatus,
}

impl AssetDetails {
	/// Decode the status of an asset on a chain whose accounts are `account_len` bytes wide.
	pub fn decode_status(bytes: &[u8], account_len: usize) -> Result<AssetStatus, scale::Error> {
		match account_len {
			20 => AssetDetails::<[u8; 20]>::decode(&mut &bytes[..]).map(|details| details.status),
			32 => AssetDetails::<[u8; 32]>::decode(&mut &bytes[..]).map(|details| details.status),
			_ => Err("Unsupported account width".into()),
		}
	}
}

/// A balance that may be negative, as used by the equilibrium balances pallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Decode, scale::Encode)]
pub enum SignedBalance {
	Positive(u128),
	Negative(u128),
}

impl SignedBalance {
	/// The positive part of the balance.
	pub fn positive(&self) -> u128 {
		match self {
			SignedBalance::Positive(value) => *value,
			SignedBalance::Negative(_) => 0,
		}
	}
}

/// One entry of `EqBalances.Locked`.
#[derive(Clone, Debug, PartialEq, Eq, Decode, scale::Encode)]
pub struct EquilibriumLock {
	pub id: [u8; 8],
	pub amount: u128,
}

/// Account data of the equilibrium chain, stored in `System.Account`.
#[derive(Clone, Debug, PartialEq, Eq, Decode, scale::Encode)]
pub enum EquilibriumAccountData {
	V0 { lock: u128, balance: Vec<(u64, SignedBalance)> },
}

/// `frame_system::AccountInfo` of the equilibrium chain.
#[derive(Clone, Debug, PartialEq, Eq, Decode, scale::Encode)]
pub struct EquilibriumAccountInfo {
	pub nonce: u32,
	pub consumers: u32,
	pub providers: u32,
	pub sufficients: u32,
	pub data: EquilibriumAccountData,
}

impl EquilibriumAccountInfo {
	pub fn lock(&self) -> u128 {
		match &self.data {
			EquilibriumAccountData::V0 { lock, .. } => *lock,
		}
	}

	pub fn balances(&self) -> &[(u64, SignedBalance)] {
		match &self.data {
			EquilibriumAccountData::V0 { balance, .. } => balance,
		}
	}
}
