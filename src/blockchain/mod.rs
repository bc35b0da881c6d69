// Blockchain module
//
// This module contains the core ledger implementation including:
// - Block structure
// - Hashing and canonical block serialization
// - Ledger structure with proof of work and chain validation

pub mod block;
pub mod chain;
pub mod hasher;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{Ledger, MinedBlock};
