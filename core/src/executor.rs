//! # State-Transition Seam
//!
//! The chain core treats transaction execution as a black box behind
//! the [`StateTransition`] trait: given a block and its resolved
//! parent, the executor either rejects the block for content-level
//! reasons or returns the block's post-application cumulative
//! difficulty together with the messages it emitted.
//!
//! ## Contract
//!
//! The returned difficulty is the block's *total* cumulative
//! difficulty — parent's total plus uncle contributions plus the
//! block's own — not a delta. The manager and the executor must agree
//! on this, so the manager hands the executor the parent's total
//! alongside the parent block.
//!
//! [`DifficultyExecutor`] is the reference implementation shipped with
//! the core: it validates structural linkage (height, parent hash,
//! declared difficulty against the retarget rule) and computes the
//! cumulative difficulty, but applies no transaction semantics. Full
//! execution engines implement the same trait.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::block::{calc_difficulty, Block};
use crate::crypto::address::Address;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A log/event message emitted while applying a block's transactions.
/// Opaque to the chain core; recorded per link during validation and
/// published after commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Account that emitted the message.
    pub origin: Address,
    /// Executor-defined payload.
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Content-level rejection of a block by an executor.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// The block's height does not follow its parent's.
    #[error("height mismatch: expected {expected}, got {got}")]
    HeightMismatch { expected: u64, got: u64 },

    /// The block's declared parent hash does not match the resolved
    /// parent.
    #[error("parent hash does not match resolved parent")]
    ParentMismatch,

    /// The block's declared difficulty disagrees with the retarget
    /// rule applied to its parent.
    #[error("difficulty mismatch: expected {expected}, declared {declared}")]
    DifficultyMismatch { expected: BigUint, declared: BigUint },

    /// Executor-specific rejection (malformed transactions, balance or
    /// gas violations, state-root mismatch, ...). Opaque to the core.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// What a successful state transition produces.
#[derive(Clone, Debug)]
pub struct TransitionOutcome {
    /// Cumulative difficulty of the chain ending at the applied block.
    pub total_difficulty: BigUint,
    /// Messages emitted during application.
    pub messages: Vec<Message>,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The executor interface consumed by the chain manager.
///
/// `parent_total_difficulty` is resolved by the manager — from the
/// block-info ledger for committed parents, from the candidate batch
/// for parents still pending in the same batch.
pub trait StateTransition: Send + Sync {
    /// Apply `block` on top of `parent`, returning the block's total
    /// cumulative difficulty and emitted messages, or a content-level
    /// rejection. Must not mutate any state visible outside the
    /// executor: validation is read-and-compute only.
    fn apply(
        &self,
        block: &Block,
        parent: &Block,
        parent_total_difficulty: &BigUint,
    ) -> Result<TransitionOutcome, TransitionError>;
}

// ---------------------------------------------------------------------------
// Reference implementation
// ---------------------------------------------------------------------------

/// Structural executor: checks chain linkage and the difficulty rule,
/// computes cumulative difficulty, emits no messages.
///
/// Used by devnet nodes that don't run transactions yet, and by the
/// core's own tests. Real engines replace it without the manager
/// noticing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DifficultyExecutor;

impl StateTransition for DifficultyExecutor {
    fn apply(
        &self,
        block: &Block,
        parent: &Block,
        parent_total_difficulty: &BigUint,
    ) -> Result<TransitionOutcome, TransitionError> {
        let expected_height = parent.header.height + 1;
        if block.header.height != expected_height {
            return Err(TransitionError::HeightMismatch {
                expected: expected_height,
                got: block.header.height,
            });
        }

        if block.header.parent_hash != parent.hash() {
            return Err(TransitionError::ParentMismatch);
        }

        let expected = calc_difficulty(block.header.timestamp, &parent.header);
        if block.header.difficulty != expected {
            return Err(TransitionError::DifficultyMismatch {
                expected,
                declared: block.header.difficulty.clone(),
            });
        }

        Ok(TransitionOutcome {
            total_difficulty: parent_total_difficulty + block.difficulty_contribution(),
            messages: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_child() {
        let genesis = Block::genesis();
        let child = Block::template(Some(&genesis), [1u8; 20], 1);
        let parent_td = BigUint::from(0u8);

        let outcome = DifficultyExecutor
            .apply(&child, &genesis, &parent_td)
            .expect("valid child");
        assert_eq!(outcome.total_difficulty, child.header.difficulty);
        assert!(outcome.messages.is_empty());
    }

    #[test]
    fn rejects_height_skip() {
        let genesis = Block::genesis();
        let mut child = Block::template(Some(&genesis), [1u8; 20], 1);
        child.header.height = 5;

        let err = DifficultyExecutor
            .apply(&child, &genesis, &BigUint::from(0u8))
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::HeightMismatch {
                expected: 1,
                got: 5
            }
        ));
    }

    #[test]
    fn rejects_wrong_parent_hash() {
        let genesis = Block::genesis();
        let mut child = Block::template(Some(&genesis), [1u8; 20], 1);
        child.header.parent_hash = [0xCC; 32];

        let err = DifficultyExecutor
            .apply(&child, &genesis, &BigUint::from(0u8))
            .unwrap_err();
        assert!(matches!(err, TransitionError::ParentMismatch));
    }

    #[test]
    fn rejects_off_rule_difficulty() {
        let genesis = Block::genesis();
        let mut child = Block::template(Some(&genesis), [1u8; 20], 1);
        child.header.difficulty += 1u8;

        let err = DifficultyExecutor
            .apply(&child, &genesis, &BigUint::from(0u8))
            .unwrap_err();
        assert!(matches!(err, TransitionError::DifficultyMismatch { .. }));
    }

    #[test]
    fn uncles_count_toward_total() {
        let genesis = Block::genesis();
        let mut child = Block::template(Some(&genesis), [1u8; 20], 1);
        child.uncles.push(genesis.header.clone());

        let parent_td = BigUint::from(100u8);
        let outcome = DifficultyExecutor
            .apply(&child, &genesis, &parent_td)
            .expect("valid child with uncle");
        assert_eq!(
            outcome.total_difficulty,
            parent_td + &child.header.difficulty + &genesis.header.difficulty
        );
    }
}
