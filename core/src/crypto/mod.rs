//! # Cryptographic Primitives
//!
//! The chain core consumes hashing and address derivation as pure
//! functions — no keys, no signatures, no state. Everything consensus-
//! critical that touches bytes goes through this module so there is
//! exactly one opinion about how EMBER hashes things.
//!
//! ```text
//! hash.rs    — BLAKE3 content hashing, the Hash type
//! address.rs — 20-byte account addresses and contract-address derivation
//! ```

pub mod address;
pub mod hash;

pub use address::{derive_address, Address, ZERO_ADDRESS};
pub use hash::{blake3_hash, Hash, ZERO_HASH};
