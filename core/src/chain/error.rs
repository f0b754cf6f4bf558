//! Error taxonomy for chain validation and commit.
//!
//! A closed set of variants, each carrying the structured context a
//! caller needs to act on the failure — no formatted-string grab bag.
//! Lookup misses are deliberately *not* here: absence is a normal
//! terminal condition expressed as `Option::None` throughout the core.

use num_bigint::BigUint;
use thiserror::Error;

use crate::crypto::hash::Hash;
use crate::executor::TransitionError;
use crate::storage::db::DbError;

/// Errors produced by the chain manager.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A candidate block's declared parent resolves neither in the
    /// store nor earlier in the same candidate batch. The batch is
    /// rejected whole.
    #[error("broken chain: unknown parent {}", hex::encode(.hash))]
    UnknownParent {
        /// The parent hash that could not be resolved.
        hash: Hash,
    },

    /// The state-transition executor rejected a block's content.
    #[error("block #{height} ({}) failed processing: {source}", hex::encode(.hash))]
    TransitionFailed {
        /// Height of the rejected block.
        height: u64,
        /// Hash of the rejected block.
        hash: Hash,
        /// The executor's reason.
        #[source]
        source: TransitionError,
    },

    /// The candidate chain is internally valid but not heavier than the
    /// current head. Routine under legitimate chain competition, not a
    /// defect — ties favor the canonical chain.
    #[error("total difficulty too low: candidate {candidate} <= current {current}")]
    DifficultyTooLow {
        /// Final cumulative difficulty of the rejected candidate.
        candidate: BigUint,
        /// Cumulative difficulty of the current head.
        current: BigUint,
    },

    /// A candidate chain with no blocks was submitted for validation.
    #[error("empty candidate chain")]
    EmptyCandidate,

    /// `insert_chain` was handed a link that validation never
    /// populated. Indicates the test-then-commit protocol was violated.
    #[error("link {} was not validated before commit", hex::encode(.hash))]
    Unvalidated {
        /// Hash of the unvalidated block.
        hash: Hash,
    },

    /// The persistent store failed. Commit-phase occurrences leave head
    /// state ambiguous and should be treated as fatal by the caller.
    #[error("store error: {0}")]
    Db(#[from] DbError),
}

/// Convenience alias used throughout the chain module.
pub type ChainResult<T> = Result<T, ChainError>;
