//! # ChainDb — Persistent Store
//!
//! The durable key-value layer under the chain core, built on sled's
//! embedded store. All on-disk data flows through this module.
//!
//! ## Key Layout
//!
//! A single keyspace with well-known keys, matching what the chain
//! manager needs to bootstrap and to rank chains without replay:
//!
//! | Key                  | Value                         |
//! |----------------------|-------------------------------|
//! | block hash (32B)     | `bincode(Block)`              |
//! | `"LastBlock"`        | `bincode(Block)` — the head   |
//! | `"LTD"`              | cumulative difficulty (BE)    |
//! | hash ++ `"Info"`     | `bincode(BlockInfo)`          |
//! | `"acct"` ++ address  | `bincode(AccountState)`       |
//!
//! ## Atomicity
//!
//! Committing one block writes the block, its info record, the head
//! pointer, and the running difficulty in a single sled `Batch`. Either
//! all four land or none do — an interrupted multi-block commit leaves
//! a valid prefix with a head consistent with that prefix, never a torn
//! block.

use std::path::Path;

use num_bigint::BigUint;
use sled::Batch;

use crate::chain::block::Block;
use crate::chain::info::BlockInfo;
use crate::crypto::address::Address;
use crate::crypto::hash::Hash;
use crate::storage::state::AccountState;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(String),
}

pub type DbResult<T> = Result<T, DbError>;

fn encode<T: serde::Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Codec(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Codec(e.to_string()))
}

// ---------------------------------------------------------------------------
// Well-known keys
// ---------------------------------------------------------------------------

/// Key under which the encoded head block lives; read at startup to
/// restore the chain without replay.
const KEY_LAST_BLOCK: &[u8] = b"LastBlock";

/// Key holding the cumulative difficulty of the head, big-endian bytes.
const KEY_TOTAL_DIFFICULTY: &[u8] = b"LTD";

/// Suffix appended to a block hash to key its [`BlockInfo`] record.
const INFO_SUFFIX: &[u8] = b"Info";

/// Prefix for account-state keys.
const ACCOUNT_PREFIX: &[u8] = b"acct";

fn info_key(hash: &Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(hash.len() + INFO_SUFFIX.len());
    key.extend_from_slice(hash);
    key.extend_from_slice(INFO_SUFFIX);
    key
}

fn account_key(address: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(ACCOUNT_PREFIX.len() + address.len());
    key.extend_from_slice(ACCOUNT_PREFIX);
    key.extend_from_slice(address);
    key
}

// ---------------------------------------------------------------------------
// ChainDb
// ---------------------------------------------------------------------------

/// Persistent store for the EMBER chain core.
///
/// Wraps a sled `Db` and exposes typed accessors for blocks, block
/// info, the head pointer, cumulative difficulty, and account state.
/// Absent keys are `Ok(None)`, never errors — absence is a normal
/// terminal condition for every caller in this core.
///
/// # Thread Safety
///
/// sled supports lock-free concurrent reads and serialized writes, so
/// `ChainDb` can be cloned and shared across threads freely. Write
/// *ordering* discipline (one commit sequence at a time) is the chain
/// manager's job, not this layer's.
#[derive(Debug, Clone)]
pub struct ChainDb {
    db: sled::Db,
}

impl ChainDb {
    /// Open or create a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    /// Create a temporary store that lives in memory and disappears on
    /// drop. No filesystem side effects — ideal for tests.
    pub fn open_temporary() -> DbResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    // -- Raw byte access ----------------------------------------------------

    /// Fetch the raw bytes stored under `key`.
    pub fn get_raw(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    /// Store raw bytes under `key`.
    pub fn put_raw(&self, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.db.insert(key, value)?;
        Ok(())
    }

    // -- Block operations ---------------------------------------------------

    /// Retrieve a block by its content hash.
    pub fn get_block(&self, hash: &Hash) -> DbResult<Option<Block>> {
        match self.db.get(hash)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// True if a block with this hash has been committed.
    pub fn has_block(&self, hash: &Hash) -> DbResult<bool> {
        Ok(self.db.contains_key(hash)?)
    }

    /// Retrieve the [`BlockInfo`] record for a committed block.
    pub fn get_block_info(&self, hash: &Hash) -> DbResult<Option<BlockInfo>> {
        match self.db.get(info_key(hash))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Retrieve the persisted head block, if any. Absent on a fresh
    /// store — the caller bootstraps genesis in that case.
    pub fn get_head(&self) -> DbResult<Option<Block>> {
        match self.db.get(KEY_LAST_BLOCK)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Retrieve the persisted cumulative difficulty of the head.
    pub fn get_total_difficulty(&self) -> DbResult<Option<BigUint>> {
        Ok(self
            .db
            .get(KEY_TOTAL_DIFFICULTY)?
            .map(|bytes| BigUint::from_bytes_be(&bytes)))
    }

    /// Commit one block and its derived records atomically.
    ///
    /// Writes, in a single batch: the block under its hash, the block
    /// under the head key, the info record, and the cumulative
    /// difficulty from the info record. Flushes before returning so a
    /// successful commit survives a crash.
    pub fn commit_block(&self, block: &Block, info: &BlockInfo) -> DbResult<()> {
        let hash = block.hash();
        let block_bytes = encode(block)?;
        let info_bytes = encode(info)?;

        let mut batch = Batch::default();
        batch.insert(hash.as_slice(), block_bytes.clone());
        batch.insert(KEY_LAST_BLOCK, block_bytes);
        batch.insert(info_key(&hash), info_bytes);
        batch.insert(KEY_TOTAL_DIFFICULTY, info.total_difficulty.to_bytes_be());
        self.db.apply_batch(batch)?;

        self.db.flush()?;
        Ok(())
    }

    // -- Account operations -------------------------------------------------

    /// Persist an account state.
    pub fn put_account(&self, address: &Address, state: &AccountState) -> DbResult<()> {
        self.db.insert(account_key(address), encode(state)?)?;
        Ok(())
    }

    /// Retrieve an account state. `None` for addresses never seen.
    pub fn get_account(&self, address: &Address) -> DbResult<Option<AccountState>> {
        match self.db.get(account_key(address))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // -- Utility ------------------------------------------------------------

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn genesis_info() -> BlockInfo {
        BlockInfo {
            height: 0,
            parent_hash: [0u8; 32],
            total_difficulty: BigUint::from(0u8),
        }
    }

    #[test]
    fn fresh_store_is_empty() {
        let db = ChainDb::open_temporary().unwrap();
        assert!(db.get_head().unwrap().is_none());
        assert!(db.get_total_difficulty().unwrap().is_none());
        assert!(db.get_block(&[1u8; 32]).unwrap().is_none());
        assert!(db.get_block_info(&[1u8; 32]).unwrap().is_none());
    }

    #[test]
    fn commit_block_writes_all_records() {
        let db = ChainDb::open_temporary().unwrap();
        let genesis = Block::genesis();
        let info = genesis_info();

        db.commit_block(&genesis, &info).unwrap();

        let hash = genesis.hash();
        assert!(db.has_block(&hash).unwrap());
        assert_eq!(db.get_block(&hash).unwrap(), Some(genesis.clone()));
        assert_eq!(db.get_head().unwrap(), Some(genesis));
        assert_eq!(db.get_block_info(&hash).unwrap(), Some(info));
        // Zero must round-trip through the big-endian encoding.
        assert_eq!(
            db.get_total_difficulty().unwrap(),
            Some(BigUint::from(0u8))
        );
    }

    #[test]
    fn total_difficulty_round_trips_large_values() {
        let db = ChainDb::open_temporary().unwrap();
        let genesis = Block::genesis();
        let info = BlockInfo {
            total_difficulty: BigUint::from(1u8) << 200,
            ..genesis_info()
        };
        db.commit_block(&genesis, &info).unwrap();
        assert_eq!(
            db.get_total_difficulty().unwrap(),
            Some(BigUint::from(1u8) << 200)
        );
    }

    #[test]
    fn head_follows_latest_commit() {
        let db = ChainDb::open_temporary().unwrap();
        let genesis = Block::genesis();
        let child = Block::template(Some(&genesis), [1u8; 20], 1);

        db.commit_block(&genesis, &genesis_info()).unwrap();
        db.commit_block(
            &child,
            &BlockInfo {
                height: 1,
                parent_hash: genesis.hash(),
                total_difficulty: child.header.difficulty.clone(),
            },
        )
        .unwrap();

        assert_eq!(db.get_head().unwrap().map(|b| b.height()), Some(1));
        // Both blocks remain retrievable by hash.
        assert!(db.has_block(&genesis.hash()).unwrap());
        assert!(db.has_block(&child.hash()).unwrap());
    }

    #[test]
    fn raw_access_round_trip() {
        let db = ChainDb::open_temporary().unwrap();
        db.put_raw(b"somekey", b"somevalue").unwrap();
        assert_eq!(db.get_raw(b"somekey").unwrap(), Some(b"somevalue".to_vec()));
        assert_eq!(db.get_raw(b"missing").unwrap(), None);
    }

    #[test]
    fn account_round_trip() {
        let db = ChainDb::open_temporary().unwrap();
        let address = [5u8; 20];
        assert!(db.get_account(&address).unwrap().is_none());

        let state = AccountState::with_balance(BigUint::from(1_000u32));
        db.put_account(&address, &state).unwrap();
        assert_eq!(db.get_account(&address).unwrap(), Some(state));
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let genesis = Block::genesis();
        {
            let db = ChainDb::open(dir.path()).unwrap();
            db.commit_block(&genesis, &genesis_info()).unwrap();
        }
        let db = ChainDb::open(dir.path()).unwrap();
        assert_eq!(db.get_head().unwrap(), Some(genesis));
    }
}
