//! End-to-end integration tests for the EMBER chain core.
//!
//! These exercise the full chain lifecycle across module boundaries:
//! genesis bootstrap, candidate templating, batch validation, fork
//! competition between two managers sharing nothing but blocks, commit
//! durability across a process restart, and event publication.
//!
//! Each test stands alone with its own temporary store. No shared
//! state, no test ordering dependencies, no flaky failures.

use std::sync::Arc;

use num_bigint::BigUint;

use ember_core::chain::{Block, CandidateChain, ChainError, ChainManager};
use ember_core::crypto::address::Address;
use ember_core::events::{ChainEvent, EventBus};
use ember_core::executor::DifficultyExecutor;
use ember_core::storage::ChainDb;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const MINER_A: Address = [0xAA; 20];
const MINER_B: Address = [0xBB; 20];

/// Spins up a manager over a temporary store with the structural
/// executor and a fresh event bus.
fn setup() -> (ChainManager, EventBus) {
    let bus = EventBus::default();
    let db = ChainDb::open_temporary().expect("temp store");
    let manager = ChainManager::open(db, Arc::new(DifficultyExecutor), bus.clone())
        .expect("bootstrap");
    (manager, bus)
}

/// Builds a linear run of `n` valid blocks on top of `parent`, each
/// sealed `spacing` seconds after the one before. Spacing below the
/// retarget window makes difficulty (and therefore cumulative weight)
/// climb; spacing at or above it makes difficulty fall.
fn mine_run(parent: &Block, coinbase: Address, n: usize, spacing: u64) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(n);
    let mut tip = parent.clone();
    for _ in 0..n {
        let block = Block::template(Some(&tip), coinbase, tip.header.timestamp + spacing);
        tip = block.clone();
        blocks.push(block);
    }
    blocks
}

/// Validates and commits a batch, returning its final cumulative
/// difficulty.
fn commit_batch(manager: &mut ChainManager, blocks: Vec<Block>) -> BigUint {
    let validated = manager
        .test_chain(CandidateChain::new(blocks))
        .expect("batch should validate");
    let td = validated.total_difficulty().clone();
    manager.insert_chain(validated).expect("commit");
    td
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn fresh_node_boots_to_genesis() {
    let (manager, _bus) = setup();
    assert_eq!(manager.head_height(), 0);
    assert!(manager.head().is_genesis());
    assert_eq!(manager.total_difficulty(), &BigUint::from(0u8));
}

#[test]
fn template_validate_commit_cycle() {
    let (mut manager, _bus) = setup();

    // A miner asks for a template, "seals" it (no payload work in the
    // structural executor), and feeds it back as a one-block batch.
    let template = manager.new_candidate_block(MINER_A);
    assert_eq!(template.height(), 1);

    let td = commit_batch(&mut manager, vec![template.clone()]);
    assert_eq!(manager.head_height(), 1);
    assert_eq!(manager.head_hash(), &template.hash());
    assert_eq!(&td, manager.total_difficulty());
}

#[test]
fn multi_block_batch_commits_in_order() {
    let (mut manager, _bus) = setup();
    let run = mine_run(manager.head(), MINER_A, 5, 1);
    commit_batch(&mut manager, run.clone());

    assert_eq!(manager.head_height(), 5);
    for (i, block) in run.iter().enumerate() {
        let found = manager
            .block_by_height(i as u64 + 1)
            .expect("walk")
            .expect("height present");
        assert_eq!(found.hash(), block.hash());
    }
}

// ---------------------------------------------------------------------------
// Fork competition
// ---------------------------------------------------------------------------

#[test]
fn heavier_fork_wins() {
    let (mut manager, _bus) = setup();
    let genesis = manager.head().clone();

    // Miner A extends by two slow blocks (difficulty falls each step).
    let slow = mine_run(&genesis, MINER_A, 2, 10);
    commit_batch(&mut manager, slow);
    let td_slow = manager.total_difficulty().clone();

    // Miner B mined three fast blocks from genesis in parallel.
    // Heavier chain: more blocks and rising difficulty.
    let fast = mine_run(&genesis, MINER_B, 3, 1);
    let td_fast = commit_batch(&mut manager, fast.clone());

    assert!(td_fast > td_slow);
    assert_eq!(manager.head_hash(), &fast[2].hash());
    assert_eq!(manager.head_height(), 3);
}

#[test]
fn lighter_fork_is_rejected_without_mutation() {
    let (mut manager, _bus) = setup();
    let genesis = manager.head().clone();

    let heavy = mine_run(&genesis, MINER_A, 3, 1);
    commit_batch(&mut manager, heavy);
    let head_before = *manager.head_hash();
    let td_before = manager.total_difficulty().clone();

    // A one-block competitor from genesis cannot outweigh three.
    let light = mine_run(&genesis, MINER_B, 1, 1);
    let light_hash = light[0].hash();
    let err = manager
        .test_chain(CandidateChain::new(light))
        .expect_err("lighter fork must lose");
    assert!(matches!(err, ChainError::DifficultyTooLow { .. }));

    assert_eq!(manager.head_hash(), &head_before);
    assert_eq!(manager.total_difficulty(), &td_before);
    assert!(!manager.has_block(&light_hash).expect("store lookup"));
}

#[test]
fn orphan_batch_is_rejected_all_or_nothing() {
    let (mut manager, _bus) = setup();

    // A batch whose ancestry was never delivered: its first parent is
    // unknown to both the store and the batch itself.
    let foreign_genesis = Block::template(None, MINER_B, 0);
    let orphans = mine_run(&foreign_genesis, MINER_B, 3, 1);
    let hashes: Vec<_> = orphans.iter().map(|b| b.hash()).collect();

    let err = manager
        .test_chain(CandidateChain::new(orphans))
        .expect_err("orphan batch must fail");
    assert!(
        matches!(err, ChainError::UnknownParent { hash } if hash == foreign_genesis.hash())
    );

    for hash in hashes {
        assert!(!manager.has_block(&hash).expect("store lookup"));
    }
    assert_eq!(manager.head_height(), 0);
}

// ---------------------------------------------------------------------------
// Durability
// ---------------------------------------------------------------------------

#[test]
fn chain_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let run;
    let head_hash;
    let total;
    {
        let db = ChainDb::open(dir.path()).expect("open store");
        let mut manager =
            ChainManager::open(db, Arc::new(DifficultyExecutor), EventBus::default())
                .expect("bootstrap");
        run = mine_run(manager.head(), MINER_A, 4, 1);
        commit_batch(&mut manager, run.clone());
        head_hash = *manager.head_hash();
        total = manager.total_difficulty().clone();
    }

    // A brand-new manager over the same store restores everything
    // without replaying a single block.
    let db = ChainDb::open(dir.path()).expect("reopen store");
    let manager = ChainManager::open(db, Arc::new(DifficultyExecutor), EventBus::default())
        .expect("restore");

    assert_eq!(manager.head_hash(), &head_hash);
    assert_eq!(manager.head_height(), 4);
    assert_eq!(manager.total_difficulty(), &total);

    for block in &run {
        let stored = manager
            .resolve(&block.hash())
            .expect("lookup")
            .expect("block persisted");
        assert_eq!(&stored, block);
    }
}

#[test]
fn partially_committed_batch_leaves_consistent_prefix() {
    let dir = tempfile::tempdir().expect("tempdir");
    let run;
    {
        let db = ChainDb::open(dir.path()).expect("open store");
        let mut manager =
            ChainManager::open(db, Arc::new(DifficultyExecutor), EventBus::default())
                .expect("bootstrap");
        run = mine_run(manager.head(), MINER_A, 3, 1);

        // Validate the full batch but commit only two of its three
        // blocks, then drop everything mid-import — the node died
        // before finishing.
        let validated = manager
            .test_chain(CandidateChain::new(run.clone()))
            .expect("batch validates");
        manager.insert_chain(validated.prefix(2)).expect("commit prefix");
    }

    let db = ChainDb::open(dir.path()).expect("reopen store");
    let mut manager = ChainManager::open(db, Arc::new(DifficultyExecutor), EventBus::default())
        .expect("restore");

    // The head is the last committed block, with height and difficulty
    // consistent with exactly that prefix.
    assert_eq!(manager.head_hash(), &run[1].hash());
    assert_eq!(manager.head_height(), 2);
    let expected_td = &run[0].header.difficulty + &run[1].header.difficulty;
    assert_eq!(manager.total_difficulty(), &expected_td);

    // Committed blocks carry matching info records — ranking through
    // the ledger agrees with the running total; the uncommitted tail
    // never reached the store.
    for block in &run[..2] {
        assert!(manager.has_block(&block.hash()).expect("lookup"));
    }
    assert_eq!(
        manager.total_difficulty_of(&run[1]).expect("ledger"),
        expected_td
    );
    assert!(!manager.has_block(&run[2].hash()).expect("lookup"));

    // Recovery is plain append-only extension: redelivering the tail
    // picks up where the interrupted import stopped.
    commit_batch(&mut manager, vec![run[2].clone()]);
    assert_eq!(manager.head_height(), 3);
    assert_eq!(manager.head_hash(), &run[2].hash());
}

#[test]
fn restarted_node_keeps_extending() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let db = ChainDb::open(dir.path()).expect("open store");
        let mut manager =
            ChainManager::open(db, Arc::new(DifficultyExecutor), EventBus::default())
                .expect("bootstrap");
        let run = mine_run(manager.head(), MINER_A, 2, 1);
        commit_batch(&mut manager, run);
    }

    let db = ChainDb::open(dir.path()).expect("reopen store");
    let mut manager = ChainManager::open(db, Arc::new(DifficultyExecutor), EventBus::default())
        .expect("restore");

    // Extension after restart behaves exactly like before it.
    let run = mine_run(manager.head(), MINER_B, 2, 1);
    commit_batch(&mut manager, run);
    assert_eq!(manager.head_height(), 4);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn commit_publishes_one_event_pair_per_block() {
    let (mut manager, bus) = setup();
    let mut rx = bus.subscribe();

    let run = mine_run(manager.head(), MINER_A, 3, 1);
    let expected: Vec<_> = run.iter().map(|b| b.hash()).collect();
    commit_batch(&mut manager, run);

    for hash in expected {
        match rx.recv().await {
            Ok(ChainEvent::NewBlock(block)) => assert_eq!(block.hash(), hash),
            other => panic!("expected NewBlock, got {other:?}"),
        }
        assert!(matches!(rx.recv().await, Ok(ChainEvent::Messages(_))));
    }
}

#[test]
fn rejected_batches_publish_nothing() {
    let (mut manager, bus) = setup();
    let mut rx = bus.subscribe();

    let foreign = Block::template(None, MINER_B, 0);
    let orphans = mine_run(&foreign, MINER_B, 1, 1);
    manager
        .test_chain(CandidateChain::new(orphans))
        .expect_err("orphans fail");

    assert!(rx.try_recv().is_err(), "validation must not publish");
}
