//! # Chain Manager
//!
//! The orchestrator of the chain core: owns genesis bootstrap, the
//! current head, the running cumulative difficulty, chain lookup, and
//! the two-phase test-then-commit extension protocol.
//!
//! ## Fork choice
//!
//! The canonical chain is the one with strictly the highest cumulative
//! difficulty. A candidate batch is validated in full ([`ChainManager::test_chain`])
//! without touching any persistent state; only if its final cumulative
//! difficulty strictly exceeds the current head's is it committed
//! ([`ChainManager::insert_chain`]). Ties lose — the already-canonical
//! chain keeps its seat.
//!
//! ## Single-writer discipline
//!
//! Exactly one validate-then-commit sequence may be in flight at a
//! time. The manager takes `&mut self` for both phases, so the borrow
//! checker enforces the discipline within one thread; across threads,
//! wrap the manager in [`SharedChainManager`] and hold the lock for the
//! whole sequence. Concurrent validation of two candidate batches
//! against the same head is unsupported by design.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use num_bigint::BigUint;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::chain::block::Block;
use crate::chain::candidate::CandidateChain;
use crate::chain::error::{ChainError, ChainResult};
use crate::chain::info::BlockInfo;
use crate::crypto::address::Address;
use crate::crypto::hash::{short_hex, Hash, ZERO_HASH};
use crate::events::{ChainEvent, EventBus};
use crate::executor::{Message, StateTransition};
use crate::storage::db::ChainDb;
use crate::storage::state::apply_testnet_allocation;

// ---------------------------------------------------------------------------
// ValidatedChain
// ---------------------------------------------------------------------------

/// One block of a validated batch, ready to commit.
#[derive(Clone, Debug)]
pub struct ValidatedLink {
    /// The validated block.
    pub block: Block,
    /// Cumulative difficulty of the chain ending at this block.
    pub total_difficulty: BigUint,
    /// Messages emitted by the block's state transition.
    pub messages: Vec<Message>,
}

/// A candidate chain that passed [`ChainManager::test_chain`].
///
/// The only way to obtain one is a successful validation, which is what
/// makes handing it to [`ChainManager::insert_chain`] safe: commit
/// trusts validation and re-checks nothing.
#[derive(Clone, Debug)]
pub struct ValidatedChain {
    links: Vec<ValidatedLink>,
    total_difficulty: BigUint,
}

impl ValidatedChain {
    /// Final cumulative difficulty of the batch.
    pub fn total_difficulty(&self) -> &BigUint {
        &self.total_difficulty
    }

    /// The validated links in parent-to-child order.
    pub fn links(&self) -> &[ValidatedLink] {
        &self.links
    }

    /// Number of blocks in the batch.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// True if the batch holds no blocks. Cannot happen for a batch
    /// produced by `test_chain`, which rejects empty candidates.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Keep only the first `len` links, adjusting the batch's final
    /// cumulative difficulty to the last retained link's.
    ///
    /// Long sync batches can be committed in stages with this: every
    /// prefix of a validated chain is itself a validated chain, since
    /// links depend only on their ancestors. A `len` of zero or beyond
    /// the batch leaves it unchanged.
    pub fn prefix(mut self, len: usize) -> ValidatedChain {
        if len == 0 || len >= self.links.len() {
            return self;
        }
        self.links.truncate(len);
        if let Some(last) = self.links.last() {
            self.total_difficulty = last.total_difficulty.clone();
        }
        self
    }
}

// ---------------------------------------------------------------------------
// ChainManager
// ---------------------------------------------------------------------------

/// Owner of head state and the test/insert protocol.
pub struct ChainManager {
    db: ChainDb,
    executor: Arc<dyn StateTransition>,
    events: EventBus,
    genesis: Block,
    head: Block,
    head_hash: Hash,
    total_difficulty: BigUint,
    /// The candidate batch currently under validation. Non-`None` only
    /// inside `test_chain`, so in-batch parents are visible to
    /// `resolve`; cleared on every exit path.
    working: Option<CandidateChain>,
}

impl ChainManager {
    /// Initialize a manager against a store.
    ///
    /// If the store holds a persisted head, the head block, hash,
    /// height, and cumulative difficulty are restored from it. On a
    /// fresh store the manager resets: the testnet allocation is
    /// seeded and genesis is committed as the sole block.
    pub fn open(
        db: ChainDb,
        executor: Arc<dyn StateTransition>,
        events: EventBus,
    ) -> ChainResult<Self> {
        let genesis = Block::genesis();

        let mut manager = ChainManager {
            head: genesis.clone(),
            head_hash: genesis.hash(),
            total_difficulty: BigUint::from(0u8),
            genesis,
            db,
            executor,
            events,
            working: None,
        };

        match manager.db.get_head()? {
            Some(head) => {
                manager.head_hash = head.hash();
                manager.total_difficulty =
                    manager.db.get_total_difficulty()?.unwrap_or_default();
                manager.head = head;
                info!(
                    height = manager.head.height(),
                    head = %short_hex(&manager.head_hash),
                    total_difficulty = %manager.total_difficulty,
                    "restored chain head"
                );
            }
            None => manager.reset()?,
        }

        Ok(manager)
    }

    /// Wipe-and-seed bootstrap: credit the testnet allocation and
    /// commit genesis as the sole block with cumulative difficulty
    /// zero. Called automatically by [`ChainManager::open`] on a fresh
    /// store.
    pub fn reset(&mut self) -> ChainResult<()> {
        apply_testnet_allocation(&self.db)?;

        let info = BlockInfo {
            height: 0,
            parent_hash: ZERO_HASH,
            total_difficulty: BigUint::from(0u8),
        };
        self.db.commit_block(&self.genesis, &info)?;

        self.head = self.genesis.clone();
        self.head_hash = self.genesis.hash();
        self.total_difficulty = BigUint::from(0u8);

        info!(head = %short_hex(&self.head_hash), "seeded genesis block");
        Ok(())
    }

    // -- Accessors ----------------------------------------------------------

    /// The fixed genesis block.
    pub fn genesis(&self) -> &Block {
        &self.genesis
    }

    /// The current head block.
    pub fn head(&self) -> &Block {
        &self.head
    }

    /// Hash of the current head.
    pub fn head_hash(&self) -> &Hash {
        &self.head_hash
    }

    /// Height of the current head.
    pub fn head_height(&self) -> u64 {
        self.head.height()
    }

    /// Cumulative difficulty of the current head. Always equals the
    /// head's persisted block-info value.
    pub fn total_difficulty(&self) -> &BigUint {
        &self.total_difficulty
    }

    // -- Templates ----------------------------------------------------------

    /// Build a candidate block template extending the current head,
    /// timestamped now, paying `coinbase`.
    pub fn new_candidate_block(&self, coinbase: Address) -> Block {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Block::template(Some(&self.head), coinbase, timestamp)
    }

    // -- Lookup -------------------------------------------------------------

    /// True if a block with this hash has been committed.
    pub fn has_block(&self, hash: &Hash) -> ChainResult<bool> {
        Ok(self.db.has_block(hash)?)
    }

    /// Resolve a block by hash: the store first, then the in-flight
    /// candidate batch if a validation is running. `None` if both miss.
    pub fn resolve(&self, hash: &Hash) -> ChainResult<Option<Block>> {
        if let Some(block) = self.db.get_block(hash)? {
            return Ok(Some(block));
        }
        if let Some(working) = &self.working {
            return Ok(working.block(hash).cloned());
        }
        Ok(None)
    }

    /// Find the committed block at height `n` by walking parent links
    /// backward from the head. `None` if the walk passes below `n`
    /// without a match; height 0 matches only genesis.
    pub fn block_by_height(&self, n: u64) -> ChainResult<Option<Block>> {
        if n > self.head.height() {
            return Ok(None);
        }

        let mut walk = self.head.clone();
        loop {
            if walk.height() == n {
                // Height 0 is only a match for the true genesis block.
                if n == 0 && !walk.is_genesis() {
                    return Ok(None);
                }
                return Ok(Some(walk));
            }
            if walk.height() < n || walk.is_genesis() {
                return Ok(None);
            }
            match self.db.get_block(&walk.header.parent_hash)? {
                Some(parent) => walk = parent,
                None => return Ok(None),
            }
        }
    }

    /// Walk backward exactly `n` parent links from the head, stopping
    /// early (returning the block reached) if the chain runs out of
    /// ancestors.
    pub fn block_back(&self, n: u64) -> ChainResult<Block> {
        let mut walk = self.head.clone();
        for _ in 0..n {
            match self.db.get_block(&walk.header.parent_hash)? {
                Some(parent) => walk = parent,
                None => break,
            }
        }
        Ok(walk)
    }

    /// True if some committed block on the canonical chain declares
    /// `hash` as its parent — i.e. the block with that hash has at
    /// least one canonical child. Walks backward from the head.
    pub fn has_block_with_parent(&self, hash: &Hash) -> ChainResult<bool> {
        let mut walk = self.head.clone();
        loop {
            if &walk.header.parent_hash == hash {
                return Ok(true);
            }
            if walk.is_genesis() {
                return Ok(false);
            }
            match self.db.get_block(&walk.header.parent_hash)? {
                Some(parent) => walk = parent,
                None => return Ok(false),
            }
        }
    }

    /// Collect up to `max` block hashes walking backward from `hash`
    /// toward genesis, starting with `hash` itself. Used by sync to
    /// answer "what came before this block" without shipping bodies.
    /// Unknown starting hashes yield an empty list.
    pub fn chain_hashes_from(&self, hash: &Hash, max: u64) -> ChainResult<Vec<Hash>> {
        let mut hashes = Vec::new();
        let mut walk = match self.resolve(hash)? {
            Some(block) => block,
            None => return Ok(hashes),
        };

        for _ in 0..max {
            hashes.push(walk.hash());
            if walk.is_genesis() {
                break;
            }
            match self.resolve(&walk.header.parent_hash)? {
                Some(parent) => walk = parent,
                None => break,
            }
        }

        Ok(hashes)
    }

    // -- Difficulty accounting ----------------------------------------------

    /// Cumulative difficulty of `block`: the parent's recorded total
    /// plus the block's own and uncle difficulties. Read-only; fails
    /// with [`ChainError::UnknownParent`] if the parent has no
    /// block-info record.
    pub fn total_difficulty_of(&self, block: &Block) -> ChainResult<BigUint> {
        let info = self
            .db
            .get_block_info(&block.header.parent_hash)?
            .ok_or(ChainError::UnknownParent {
                hash: block.header.parent_hash,
            })?;
        Ok(info.total_difficulty + block.difficulty_contribution())
    }

    // -- Validation protocol ------------------------------------------------

    /// Validate a candidate chain without mutating any persistent
    /// state.
    ///
    /// Walks the batch in order: resolves each block's parent (store
    /// first, then earlier links of the same batch), runs the
    /// state-transition executor, and records the resulting cumulative
    /// difficulty and messages on the link. After all links succeed,
    /// the final cumulative difficulty must strictly exceed the current
    /// head's or the batch is rejected with
    /// [`ChainError::DifficultyTooLow`].
    ///
    /// The in-flight batch reference is cleared on every exit path,
    /// success or failure, so later lookups only ever see committed
    /// state.
    pub fn test_chain(&mut self, chain: CandidateChain) -> ChainResult<ValidatedChain> {
        if chain.is_empty() {
            return Err(ChainError::EmptyCandidate);
        }

        let mut guard = WorkingGuard::install(self, chain);
        let outcome = guard.validate();
        let chain = guard.finish();

        let total_difficulty = outcome?;
        // `install` put the batch there and nothing else touches the
        // slot while the guard lives; fail loudly rather than commit
        // nothing if that invariant ever breaks.
        let chain = chain.ok_or(ChainError::EmptyCandidate)?;
        if total_difficulty <= self.total_difficulty {
            return Err(ChainError::DifficultyTooLow {
                candidate: total_difficulty,
                current: self.total_difficulty.clone(),
            });
        }

        let mut links = Vec::with_capacity(chain.len());
        for link in chain.into_links() {
            let hash = link.block.hash();
            let td = link
                .total_difficulty
                .ok_or(ChainError::Unvalidated { hash })?;
            links.push(ValidatedLink {
                block: link.block,
                total_difficulty: td,
                messages: link.messages,
            });
        }

        Ok(ValidatedChain {
            links,
            total_difficulty,
        })
    }

    /// Walk the in-flight batch, validating link by link. Stops at the
    /// first failure; links processed before the failure keep their
    /// recorded results. Always entered through a [`WorkingGuard`].
    fn validate_working(&mut self) -> ChainResult<BigUint> {
        let len = self.working.as_ref().map_or(0, |c| c.len());
        let mut final_td: Option<BigUint> = None;

        for at in 0..len {
            let block = match self.working.as_ref() {
                Some(chain) => chain.links()[at].block.clone(),
                None => break,
            };

            let (parent, parent_td) = self.resolve_parent(at, &block.header.parent_hash)?;

            let outcome = self
                .executor
                .apply(&block, &parent, &parent_td)
                .map_err(|source| {
                    warn!(
                        height = block.height(),
                        hash = %short_hex(&block.hash()),
                        error = %source,
                        "candidate block failed processing"
                    );
                    ChainError::TransitionFailed {
                        height: block.height(),
                        hash: block.hash(),
                        source,
                    }
                })?;

            if let Some(chain) = self.working.as_mut() {
                let link = chain.link_mut(at);
                link.total_difficulty = Some(outcome.total_difficulty.clone());
                link.messages = outcome.messages;
            }
            final_td = Some(outcome.total_difficulty);
        }

        final_td.ok_or(ChainError::EmptyCandidate)
    }

    /// Resolve a candidate block's parent and that parent's cumulative
    /// difficulty. Committed parents come from the store with their
    /// block-info total; in-batch parents must appear *before* the
    /// current link and must already be validated — otherwise the batch
    /// is out of parent-to-child order and the chain is broken.
    fn resolve_parent(&self, at: usize, hash: &Hash) -> ChainResult<(Block, BigUint)> {
        if let Some(parent) = self.db.get_block(hash)? {
            if let Some(info) = self.db.get_block_info(hash)? {
                return Ok((parent, info.total_difficulty));
            }
            return Err(ChainError::UnknownParent { hash: *hash });
        }

        if let Some(chain) = &self.working {
            if let Some(pos) = chain.position(hash) {
                if pos < at {
                    if let Some(td) = &chain.links()[pos].total_difficulty {
                        return Ok((chain.links()[pos].block.clone(), td.clone()));
                    }
                }
            }
        }

        Err(ChainError::UnknownParent { hash: *hash })
    }

    // -- Commit protocol ----------------------------------------------------

    /// Commit a validated chain in order.
    ///
    /// Per link: persist the block with its info record and the updated
    /// head and difficulty keys (one atomic batch per block), advance
    /// the in-memory head, then publish the `NewBlock` event and the
    /// link's messages. No validation happens here — the
    /// [`ValidatedChain`] type is the proof that `test_chain` already
    /// ran. Append-only: an interruption leaves a committed prefix with
    /// a consistent head.
    pub fn insert_chain(&mut self, validated: ValidatedChain) -> ChainResult<()> {
        let count = validated.links.len();
        let first = validated.links.first().map(|l| l.block.height());

        for ValidatedLink {
            block,
            total_difficulty,
            messages,
        } in validated.links
        {
            let hash = block.hash();
            let block_info = BlockInfo {
                height: block.height(),
                parent_hash: block.header.parent_hash,
                total_difficulty: total_difficulty.clone(),
            };
            self.db.commit_block(&block, &block_info)?;

            self.head = block.clone();
            self.head_hash = hash;
            self.total_difficulty = total_difficulty;

            debug!(
                height = block.height(),
                hash = %short_hex(&hash),
                "committed block"
            );
            self.events.post(ChainEvent::NewBlock(block));
            self.events.post(ChainEvent::Messages(messages));
        }

        if let Some(first) = first {
            info!(
                count,
                first,
                last = self.head.height(),
                head = %short_hex(&self.head_hash),
                "imported blocks"
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WorkingGuard
// ---------------------------------------------------------------------------

/// RAII installer for the in-flight candidate reference.
///
/// Clearing `working` lives in `Drop`, so the reference cannot outlive
/// validation on any exit path — early return, error propagation, or an
/// unwinding executor. Without this, a panicking `apply` would leave
/// uncommitted batch blocks resolvable by the next caller, since the
/// manager's mutex does not poison.
struct WorkingGuard<'a> {
    manager: &'a mut ChainManager,
}

impl<'a> WorkingGuard<'a> {
    fn install(manager: &'a mut ChainManager, chain: CandidateChain) -> Self {
        manager.working = Some(chain);
        WorkingGuard { manager }
    }

    fn validate(&mut self) -> ChainResult<BigUint> {
        self.manager.validate_working()
    }

    /// Uninstall the batch, handing it back with its recorded results.
    /// The `Drop` that follows finds the slot already empty.
    fn finish(self) -> Option<CandidateChain> {
        self.manager.working.take()
    }
}

impl Drop for WorkingGuard<'_> {
    fn drop(&mut self) {
        self.manager.working = None;
    }
}

// ---------------------------------------------------------------------------
// SharedChainManager
// ---------------------------------------------------------------------------

/// Clonable handle enforcing the single-writer boundary across threads.
///
/// Hold the guard for an entire test-then-insert sequence; releasing it
/// between the two phases would let another writer move the head under
/// the validated batch.
#[derive(Clone)]
pub struct SharedChainManager(Arc<Mutex<ChainManager>>);

impl SharedChainManager {
    /// Wrap a manager for shared use.
    pub fn new(manager: ChainManager) -> Self {
        Self(Arc::new(Mutex::new(manager)))
    }

    /// Acquire exclusive access to the manager.
    pub fn lock(&self) -> MutexGuard<'_, ChainManager> {
        self.0.lock()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
