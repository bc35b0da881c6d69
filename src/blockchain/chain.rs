use std::sync::{Mutex, MutexGuard, PoisonError};
use log::{debug, info, warn};

use super::block::Block;
use super::hasher::{digest_of_block, digest_of_difference, meets_difficulty};

/// Proof stored in the genesis block
pub const GENESIS_PROOF: i64 = 1;

/// Previous-hash sentinel stored in the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A freshly mined block together with its digest
#[derive(Debug, Clone)]
pub struct MinedBlock {
    pub block: Block,
    pub hash: String,
}

/// Represents the ledger
///
/// The chain only ever grows. Every access goes through a single mutex, so
/// appends and whole-chain reads never interleave.
#[derive(Debug)]
pub struct Ledger {
    /// The chain of blocks
    chain: Mutex<Vec<Block>>,
}

impl Ledger {
    /// Creates a new ledger holding only the genesis block
    ///
    /// # Returns
    ///
    /// A new Ledger instance
    pub fn new() -> Self {
        let ledger = Ledger {
            chain: Mutex::new(Vec::new()),
        };

        let genesis = ledger.create_block(GENESIS_PROOF, GENESIS_PREVIOUS_HASH.to_string());
        info!("Created genesis block at {}", genesis.timestamp);

        ledger
    }

    // Blocks are fully built before they are pushed, so a panic while the
    // lock was held can never leave the vector half-updated.
    fn lock(&self) -> MutexGuard<'_, Vec<Block>> {
        self.chain.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tip(chain: &[Block]) -> &Block {
        chain.last().expect("ledger always holds the genesis block")
    }

    fn append(chain: &mut Vec<Block>, proof: i64, previous_hash: String) -> Block {
        let block = Block::new(chain.len() as u64 + 1, proof, previous_hash);
        chain.push(block.clone());

        info!("Appended block {} with proof {}", block.index, block.proof);
        block
    }

    /// Appends a new block to the chain
    ///
    /// The proof and previous hash are taken as given; callers are expected
    /// to pass values that keep the chain valid.
    ///
    /// # Arguments
    ///
    /// * `proof` - The proof of work for the new block
    /// * `previous_hash` - The digest of the current last block
    ///
    /// # Returns
    ///
    /// The appended block
    pub fn create_block(&self, proof: i64, previous_hash: String) -> Block {
        let mut chain = self.lock();
        Self::append(&mut chain, proof, previous_hash)
    }

    /// Gets the last block in the chain
    pub fn last_block(&self) -> Block {
        let chain = self.lock();
        Self::tip(&chain).clone()
    }

    /// Gets the entire chain
    ///
    /// # Returns
    ///
    /// A snapshot of all blocks in chain order
    pub fn get_chain(&self) -> Vec<Block> {
        self.lock().clone()
    }

    /// Finds the proof of work for the block following `previous_proof`
    ///
    /// Tries 1, 2, 3, ... and returns the first candidate whose
    /// `digest_of_difference(candidate, previous_proof)` meets the difficulty
    /// prefix. This is a blocking, CPU-bound search with no timeout (about
    /// 65536 attempts on average); run it off any latency-sensitive thread.
    pub fn solve_puzzle(previous_proof: i64) -> i64 {
        let mut candidate = 1;

        loop {
            if meets_difficulty(&digest_of_difference(candidate, previous_proof)) {
                return candidate;
            }

            candidate += 1;
        }
    }

    /// Validates a chain of blocks
    ///
    /// Every block after the first must carry the digest of its predecessor
    /// and a proof that solves the puzzle against its predecessor's proof.
    /// Chains with zero or one block are valid.
    ///
    /// # Arguments
    ///
    /// * `chain` - The blocks to check, in chain order
    ///
    /// # Returns
    ///
    /// true if the chain is valid, false otherwise
    pub fn is_valid(chain: &[Block]) -> bool {
        let Some((first, rest)) = chain.split_first() else {
            return true;
        };

        let mut previous_block = first;
        for block in rest {
            if block.previous_hash != digest_of_block(previous_block) {
                debug!("Block {} does not link to block {}", block.index, previous_block.index);
                return false;
            }

            if !meets_difficulty(&digest_of_difference(block.proof, previous_block.proof)) {
                debug!("Block {} has an invalid proof {}", block.index, block.proof);
                return false;
            }

            previous_block = block;
        }

        true
    }

    /// Validates the live chain, holding the lock for the whole walk
    pub fn is_chain_valid(&self) -> bool {
        let chain = self.lock();
        Self::is_valid(&chain)
    }

    /// Mines and appends the next block
    ///
    /// The puzzle is solved without holding the lock. If another block was
    /// appended in the meantime, mining restarts from the new last block so
    /// the appended block always links to the block it was solved against.
    ///
    /// # Returns
    ///
    /// The newly mined block and its digest
    pub fn mine_block(&self) -> MinedBlock {
        let mut previous_block = self.last_block();

        loop {
            let previous_hash = digest_of_block(&previous_block);
            let proof = Self::solve_puzzle(previous_block.proof);

            let mut chain = self.lock();
            let tip = Self::tip(&chain);

            if tip.index == previous_block.index {
                let block = Self::append(&mut chain, proof, previous_hash);
                drop(chain);

                let hash = block.calculate_hash();
                return MinedBlock { block, hash };
            }

            warn!(
                "Block {} was appended while mining on block {}, retrying",
                tip.index, previous_block.index
            );
            previous_block = tip.clone();
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn two_block_chain() -> Vec<Block> {
        let ledger = Ledger::new();
        ledger.mine_block();
        ledger.get_chain()
    }

    #[test]
    fn test_new_ledger() {
        let ledger = Ledger::new();
        let chain = ledger.get_chain();

        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].index, 1);
        assert_eq!(chain[0].proof, 1);
        assert_eq!(chain[0].previous_hash, "0");
        assert_eq!(ledger.last_block(), chain[0]);
    }

    #[test]
    fn test_create_block() {
        let ledger = Ledger::new();

        // No validation at this layer
        let block = ledger.create_block(42, "not-a-digest".to_string());

        assert_eq!(block.index, 2);
        assert_eq!(block.proof, 42);
        assert_eq!(block.previous_hash, "not-a-digest");
        assert_eq!(ledger.get_chain().len(), 2);
        assert_eq!(ledger.last_block(), block);
    }

    #[test]
    fn test_solve_puzzle_known_values() {
        assert_eq!(Ledger::solve_puzzle(1), 533);
        assert_eq!(Ledger::solve_puzzle(533), 45293);
    }

    #[test]
    fn test_solve_puzzle_returns_smallest() {
        for previous_proof in [1, 533, -5] {
            let proof = Ledger::solve_puzzle(previous_proof);

            assert!(meets_difficulty(&digest_of_difference(proof, previous_proof)));
            assert!((1..proof).all(|candidate| {
                !meets_difficulty(&digest_of_difference(candidate, previous_proof))
            }));
        }
    }

    #[test]
    fn test_empty_and_single_block_chains_are_valid() {
        assert!(Ledger::is_valid(&[]));
        assert!(Ledger::is_valid(&Ledger::new().get_chain()));
    }

    #[test]
    fn test_mined_chain_is_valid() {
        let ledger = Ledger::new();

        let first = ledger.mine_block();
        let second = ledger.mine_block();

        assert_eq!(first.block.index, 2);
        assert_eq!(first.block.proof, 533);
        assert_eq!(second.block.index, 3);
        assert_eq!(second.block.proof, 45293);
        assert_eq!(second.block.previous_hash, first.hash);
        assert_eq!(first.hash, digest_of_block(&first.block));

        assert!(ledger.is_chain_valid());
        assert!(Ledger::is_valid(&ledger.get_chain()));
    }

    #[test]
    fn test_manual_mining_scenario() {
        let ledger = Ledger::new();
        let genesis = ledger.last_block();
        assert_eq!(genesis.proof, 1);

        let proof = Ledger::solve_puzzle(genesis.proof);
        ledger.create_block(proof, digest_of_block(&genesis));

        let mut chain = ledger.get_chain();
        assert_eq!(chain.len(), 2);
        assert!(Ledger::is_valid(&chain));

        // Flip one hex character of the link
        let flipped = if chain[1].previous_hash.starts_with('a') { "b" } else { "a" };
        chain[1].previous_hash.replace_range(0..1, flipped);
        assert!(!Ledger::is_valid(&chain));
    }

    #[test]
    fn test_tampered_proof_is_invalid() {
        let mut chain = two_block_chain();
        chain[1].proof += 1;
        assert!(!Ledger::is_valid(&chain));
    }

    #[test]
    fn test_tampered_predecessor_is_invalid() {
        let mut chain = two_block_chain();
        chain[0].timestamp.push('0');
        assert!(!Ledger::is_valid(&chain));

        let mut chain = two_block_chain();
        chain[0].index = 7;
        assert!(!Ledger::is_valid(&chain));
    }

    #[test]
    fn test_unsolved_proof_is_invalid() {
        let ledger = Ledger::new();
        let genesis = ledger.last_block();

        // Correct link, proof that does not solve the puzzle
        ledger.create_block(2, digest_of_block(&genesis));
        assert!(!ledger.is_chain_valid());
    }

    #[test]
    fn test_concurrent_mining_keeps_chain_valid() {
        let ledger = Arc::new(Ledger::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.mine_block())
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let chain = ledger.get_chain();
        assert_eq!(chain.len(), 5);
        for (position, block) in chain.iter().enumerate() {
            assert_eq!(block.index, position as u64 + 1);
        }
        assert!(Ledger::is_valid(&chain));
    }
}
