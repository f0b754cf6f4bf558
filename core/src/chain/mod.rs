//! # Chain Module
//!
//! The consensus core: chain-state data model and the fork-choice /
//! commit machinery.
//!
//! ```text
//! block.rs     — Block/BlockHeader, genesis, retarget + gas-limit rules
//! info.rs      — persisted per-block {height, parent, total difficulty}
//! candidate.rs — ordered uncommitted batch under validation
//! manager.rs   — bootstrap, head ownership, test_chain / insert_chain
//! error.rs     — closed error taxonomy
//! ```
//!
//! ## The protocol in one paragraph
//!
//! Newly received blocks are wrapped into a [`CandidateChain`] and
//! handed to [`ChainManager::test_chain`], which validates every block
//! against its parent's state without mutating anything. Only if the
//! batch's final cumulative difficulty strictly exceeds the current
//! head's does [`ChainManager::insert_chain`] commit it — block by
//! block, append-only, events out the side. Anything less heavy is
//! rejected whole.

pub mod block;
pub mod candidate;
pub mod error;
pub mod info;
pub mod manager;

pub use block::{calc_difficulty, calc_gas_limit, Block, BlockHeader};
pub use candidate::{CandidateChain, Link};
pub use error::{ChainError, ChainResult};
pub use info::BlockInfo;
pub use manager::{ChainManager, SharedChainManager, ValidatedChain, ValidatedLink};
