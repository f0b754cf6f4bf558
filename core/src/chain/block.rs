//! # Block Structure
//!
//! A block is the unit of chain extension. Each block carries a header
//! linking it to its parent, a list of uncle headers (valid siblings
//! that contribute difficulty but not height), and an opaque transaction
//! payload consumed by the state-transition executor.
//!
//! ## Block Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  BlockHeader                                     │
//! │  ├── parent_hash: Hash     (zero for genesis)    │
//! │  ├── height: u64           (genesis = 0)         │
//! │  ├── difficulty: BigUint                         │
//! │  ├── timestamp: u64        (unix seconds)        │
//! │  ├── coinbase: Address                           │
//! │  ├── gas_limit: u64                              │
//! │  └── state_root: Hash                            │
//! ├──────────────────────────────────────────────────┤
//! │  uncles: Vec<BlockHeader>                        │
//! │  tx_payload: Vec<u8>       (opaque to this core) │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Hash Computation
//!
//! The block hash is BLAKE3 over a canonical preimage of every header
//! field, every uncle's hash, and the payload. It is a pure function of
//! content — blocks are immutable after construction and the hash is
//! recomputed on demand rather than cached, so there is no stale-hash
//! failure mode.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::config::{
    bootstrap_difficulty, genesis_difficulty, DIFFICULTY_BOUND_SHIFT,
    DIFFICULTY_RETARGET_WINDOW_SECS, GAS_LIMIT_BOUND_DIVISOR, GENESIS_GAS_LIMIT, MIN_GAS_LIMIT,
};
use crate::crypto::address::{Address, ZERO_ADDRESS};
use crate::crypto::hash::{blake3_hash, Hash, ZERO_HASH};

// ---------------------------------------------------------------------------
// BlockHeader
// ---------------------------------------------------------------------------

/// Everything about a block except its uncles and payload.
///
/// Uncle references are headers, not full blocks — an uncle contributes
/// its difficulty to the chain's cumulative weight, and its difficulty
/// lives here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Hash of the parent block. All zeros for genesis.
    pub parent_hash: Hash,
    /// Block height. Genesis is 0; uncles do not advance it.
    pub height: u64,
    /// Proof-of-work difficulty of this block. Arbitrary precision —
    /// cumulative sums outgrow u128 on a long enough chain.
    pub difficulty: BigUint,
    /// Unix timestamp (seconds) when the block was sealed.
    pub timestamp: u64,
    /// Beneficiary of the block reward.
    pub coinbase: Address,
    /// Gas ceiling for transactions in this block.
    pub gas_limit: u64,
    /// Root of the account state after applying this block.
    pub state_root: Hash,
}

impl BlockHeader {
    /// Hash of this header alone. This is what uncle lists carry and
    /// what the canonical block hash folds in per uncle.
    pub fn hash(&self) -> Hash {
        blake3_hash(&self.preimage())
    }

    fn preimage(&self) -> Vec<u8> {
        let difficulty = self.difficulty.to_bytes_be();
        let mut out = Vec::with_capacity(128 + difficulty.len());
        out.extend_from_slice(&self.parent_hash);
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&(difficulty.len() as u32).to_le_bytes());
        out.extend_from_slice(&difficulty);
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.coinbase);
        out.extend_from_slice(&self.gas_limit.to_le_bytes());
        out.extend_from_slice(&self.state_root);
        out
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A full EMBER block: header, uncle headers, opaque payload.
///
/// Immutable after construction. Equality is structural; identity is
/// [`Block::hash`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Chain linkage and consensus fields.
    pub header: BlockHeader,
    /// Headers of uncle blocks referenced by this block. Each uncle's
    /// difficulty counts toward cumulative difficulty.
    pub uncles: Vec<BlockHeader>,
    /// Encoded transactions. This core never looks inside — the
    /// state-transition executor owns the format.
    pub tx_payload: Vec<u8>,
}

impl Block {
    /// Construct the fixed genesis block.
    ///
    /// Deterministic by construction: zero parent, height 0, timestamp
    /// 0, zero coinbase, difficulty 2^22. Every node derives the same
    /// genesis hash, which is what makes two EMBER nodes the same
    /// network.
    pub fn genesis() -> Self {
        Block {
            header: BlockHeader {
                parent_hash: ZERO_HASH,
                height: 0,
                difficulty: genesis_difficulty(),
                timestamp: 0,
                coinbase: ZERO_ADDRESS,
                gas_limit: GENESIS_GAS_LIMIT,
                state_root: ZERO_HASH,
            },
            uncles: Vec::new(),
            tx_payload: Vec::new(),
        }
    }

    /// Build a candidate block template extending `parent`.
    ///
    /// Copies the parent's state root (the executor replaces it after
    /// applying transactions), links the parent hash, advances the
    /// height, and derives difficulty and gas limit from the parent via
    /// the retarget rules.
    ///
    /// With no parent (bootstrap before any head exists) the template
    /// has a zero parent hash and the fixed large bootstrap difficulty.
    pub fn template(parent: Option<&Block>, coinbase: Address, timestamp: u64) -> Self {
        match parent {
            Some(parent) => Block {
                header: BlockHeader {
                    parent_hash: parent.hash(),
                    height: parent.header.height + 1,
                    difficulty: calc_difficulty(timestamp, &parent.header),
                    timestamp,
                    coinbase,
                    gas_limit: calc_gas_limit(&parent.header),
                    state_root: parent.header.state_root,
                },
                uncles: Vec::new(),
                tx_payload: Vec::new(),
            },
            None => Block {
                header: BlockHeader {
                    parent_hash: ZERO_HASH,
                    height: 0,
                    difficulty: bootstrap_difficulty(),
                    timestamp,
                    coinbase,
                    gas_limit: GENESIS_GAS_LIMIT,
                    state_root: ZERO_HASH,
                },
                uncles: Vec::new(),
                tx_payload: Vec::new(),
            },
        }
    }

    /// Canonical content hash: header fields, each uncle's hash, and
    /// the payload.
    pub fn hash(&self) -> Hash {
        let mut preimage = self.header.preimage();
        for uncle in &self.uncles {
            preimage.extend_from_slice(&uncle.hash());
        }
        preimage.extend_from_slice(&self.tx_payload);
        blake3_hash(&preimage)
    }

    /// True for the genesis block: height 0 with a zero parent hash.
    pub fn is_genesis(&self) -> bool {
        self.header.height == 0 && self.header.parent_hash == ZERO_HASH
    }

    /// Block height.
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Sum of this block's own difficulty and all its uncles'. This is
    /// the block's contribution to cumulative difficulty.
    pub fn difficulty_contribution(&self) -> BigUint {
        let mut sum = self.header.difficulty.clone();
        for uncle in &self.uncles {
            sum += &uncle.difficulty;
        }
        sum
    }
}

// ---------------------------------------------------------------------------
// Retarget rules
// ---------------------------------------------------------------------------

/// Difficulty retarget rule.
///
/// `adjust = parent.difficulty >> 10`. A child sealed at least
/// [`DIFFICULTY_RETARGET_WINDOW_SECS`] after its parent means blocks
/// are slow: difficulty drops by `adjust`. Anything faster raises it by
/// `adjust`. Pure function of the two blocks — no other state feeds in.
pub fn calc_difficulty(child_timestamp: u64, parent: &BlockHeader) -> BigUint {
    let adjust = &parent.difficulty >> DIFFICULTY_BOUND_SHIFT;
    if child_timestamp >= parent.timestamp + DIFFICULTY_RETARGET_WINDOW_SECS {
        &parent.difficulty - adjust
    } else {
        &parent.difficulty + adjust
    }
}

/// Gas limit for a block extending `parent`: the parent's limit plus
/// 1/1024 of it, floored at [`MIN_GAS_LIMIT`]. The ceiling drifts
/// upward smoothly; it can never fall below the floor.
pub fn calc_gas_limit(parent: &BlockHeader) -> u64 {
    let raised = parent.gas_limit + parent.gas_limit / GAS_LIMIT_BOUND_DIVISOR;
    raised.max(MIN_GAS_LIMIT)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
