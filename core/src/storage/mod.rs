//! # Storage Module
//!
//! The durable layer under the chain core.
//!
//! ```text
//! db.rs    — sled-backed store: blocks, block info, head, difficulty
//! state.rs — minimal account records + genesis testnet allocation
//! ```
//!
//! Values are bincode on disk: compact, fast, deterministic. JSON is
//! for APIs and debugging; bincode is for storage.

pub mod db;
pub mod state;

pub use db::{ChainDb, DbError, DbResult};
pub use state::AccountState;
