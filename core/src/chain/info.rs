//! # Block Info Ledger Records
//!
//! For every committed block the store carries a small derived record:
//! height, parent hash, and the cumulative difficulty of the chain up
//! to and including that block. The record exists so that ranking a
//! chain never requires replaying it — cumulative difficulty is an O(1)
//! lookup by hash.
//!
//! A record is written exactly once, at commit time, and never mutated
//! afterward. Its invariant:
//!
//! ```text
//! info(block).total_difficulty =
//!     info(parent).total_difficulty
//!   + Σ uncle.difficulty
//!   + block.difficulty
//! ```

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::crypto::hash::Hash;

/// Persisted per-block metadata, keyed in the store by `hash ++ "Info"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Height of the block this record describes.
    pub height: u64,
    /// Hash of the block's parent.
    pub parent_hash: Hash,
    /// Cumulative difficulty of the chain ending at this block.
    pub total_difficulty: BigUint,
}
