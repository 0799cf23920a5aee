// SPDX-License-Identifier: GPL-3.0

//! Centralized string constants for the pop-sync crate.
//!
//! Pallet and storage item names, RPC method names, cache key prefixes and SQL statements live
//! here rather than being scattered across the codebase.

pub mod keys;
pub mod rpc;
pub mod storage;
pub mod store;
