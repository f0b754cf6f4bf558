// Copyright (c) 2026 Ember Labs. MIT License.
// See LICENSE for details.

//! # EMBER Chain Core
//!
//! The chain-selection and commit core of the EMBER blockchain: the
//! component that decides which sequence of blocks is canonical,
//! validates candidate chains against their parents' state, and
//! durably commits accepted blocks.
//!
//! The consensus rule is cumulative-difficulty fork choice: among
//! competing chains, strictly the heaviest wins, and ties keep the
//! incumbent. Extension is all-or-nothing — a candidate batch is
//! validated in full before a single byte of it becomes visible.
//!
//! ## Architecture
//!
//! - **chain** — block data model, candidate batches, the chain
//!   manager with its test-then-commit protocol.
//! - **storage** — sled-backed persistent store: blocks, block-info
//!   records, head pointer, cumulative difficulty, accounts.
//! - **executor** — the state-transition seam. Transaction semantics
//!   live behind a trait; this core never parses a transaction.
//! - **events** — fire-and-forget publication of committed blocks and
//!   their emitted messages.
//! - **crypto** — BLAKE3 hashing and address derivation, as pure
//!   functions.
//! - **config** — every consensus-critical constant, in one place.
//!
//! ## Design Philosophy
//!
//! 1. Validation never mutates; commit never validates.
//! 2. Absence is `None`, not an error — errors are a closed set of
//!    variants with structured context.
//! 3. One writer at a time. The type system enforces it in-process;
//!    [`chain::SharedChainManager`] enforces it across threads.

pub mod chain;
pub mod config;
pub mod crypto;
pub mod events;
pub mod executor;
pub mod storage;

pub use chain::{
    Block, BlockHeader, BlockInfo, CandidateChain, ChainError, ChainManager, ChainResult,
    SharedChainManager, ValidatedChain,
};
pub use events::{ChainEvent, EventBus};
pub use executor::{DifficultyExecutor, Message, StateTransition, TransitionError};
pub use storage::{ChainDb, DbError};
