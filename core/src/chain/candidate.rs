//! # Candidate Chain
//!
//! An ordered, in-memory batch of not-yet-committed blocks undergoing
//! validation. Each link wraps a block together with the validation
//! results filled in as the manager walks the batch: the emitted
//! messages and the cumulative difficulty at that block.
//!
//! The batch is owned by a single validation call and discarded after
//! commit or rejection — it holds no long-lived state. An auxiliary
//! hash→index map gives O(1) resolution of parents that are themselves
//! pending within the same batch (a multi-block extension arriving as
//! one unit), so in-batch lookup cost does not grow with batch size.

use std::collections::HashMap;

use num_bigint::BigUint;

use crate::chain::block::Block;
use crate::crypto::hash::Hash;
use crate::executor::Message;

/// One block of a candidate batch plus its validation results.
#[derive(Clone, Debug)]
pub struct Link {
    /// The candidate block.
    pub block: Block,
    /// Messages emitted by the state transition. Empty until the link
    /// has been validated.
    pub messages: Vec<Message>,
    /// Cumulative difficulty of the chain ending at this block. `None`
    /// until the link has been validated.
    pub total_difficulty: Option<BigUint>,
}

/// An ordered sequence of candidate blocks in parent-to-child order.
///
/// Construction takes blocks in arrival order and does not re-sort:
/// a batch that is not parent-to-child ordered fails validation at the
/// first link whose parent has not yet been processed.
#[derive(Clone, Debug, Default)]
pub struct CandidateChain {
    links: Vec<Link>,
    index: HashMap<Hash, usize>,
}

impl CandidateChain {
    /// Wrap a list of blocks into an unvalidated candidate chain.
    pub fn new(blocks: Vec<Block>) -> Self {
        let mut links = Vec::with_capacity(blocks.len());
        let mut index = HashMap::with_capacity(blocks.len());

        for block in blocks {
            index.insert(block.hash(), links.len());
            links.push(Link {
                block,
                messages: Vec::new(),
                total_difficulty: None,
            });
        }

        CandidateChain { links, index }
    }

    /// Number of blocks in the batch.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// True if the batch holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Position of a block within the batch, by hash.
    pub fn position(&self, hash: &Hash) -> Option<usize> {
        self.index.get(hash).copied()
    }

    /// Look up a block in the batch by hash.
    pub fn block(&self, hash: &Hash) -> Option<&Block> {
        self.position(hash).map(|i| &self.links[i].block)
    }

    /// The links in batch order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Mutable link access for recording validation results.
    pub(crate) fn link_mut(&mut self, at: usize) -> &mut Link {
        &mut self.links[at]
    }

    /// Consume the batch, yielding its links in order.
    pub(crate) fn into_links(self) -> Vec<Link> {
        self.links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_blocks(n: usize) -> Vec<Block> {
        let mut blocks = vec![Block::genesis()];
        for i in 1..n {
            let parent = blocks[i - 1].clone();
            blocks.push(Block::template(Some(&parent), [1u8; 20], i as u64));
        }
        blocks
    }

    #[test]
    fn preserves_arrival_order() {
        let blocks = linear_blocks(4);
        let hashes: Vec<_> = blocks.iter().map(|b| b.hash()).collect();
        let chain = CandidateChain::new(blocks);

        assert_eq!(chain.len(), 4);
        for (i, link) in chain.links().iter().enumerate() {
            assert_eq!(link.block.hash(), hashes[i]);
            assert!(link.total_difficulty.is_none());
            assert!(link.messages.is_empty());
        }
    }

    #[test]
    fn index_resolves_in_batch_blocks() {
        let blocks = linear_blocks(3);
        let middle = blocks[1].hash();
        let chain = CandidateChain::new(blocks);

        assert_eq!(chain.position(&middle), Some(1));
        assert_eq!(chain.block(&middle).map(|b| b.height()), Some(1));
        assert_eq!(chain.position(&[0xAB; 32]), None);
        assert!(chain.block(&[0xAB; 32]).is_none());
    }

    #[test]
    fn empty_batch() {
        let chain = CandidateChain::new(Vec::new());
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
    }
}
