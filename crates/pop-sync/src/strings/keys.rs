// SPDX-License-Identifier: GPL-3.0

//! Cache key prefixes, one per kind of remote subscription.

pub const BALANCES: &str = "balances";
pub const ASSET_BALANCE: &str = "asset-balance";
pub const STAKING: &str = "staking";
pub const PROXY: &str = "proxy";
pub const POOL_MEMBER: &str = "npools-member";
pub const POOL: &str = "npools-pool";
