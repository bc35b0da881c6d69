use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::hasher;

/// Represents a block in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// 1-based position of the block in the chain
    pub index: u64,

    /// Local time when the block was created
    #[schema(example = "2024-01-01 12:00:00.000000")]
    pub timestamp: String,

    /// Proof of work relative to the previous block's proof
    pub proof: i64,

    /// Digest of the previous block, `"0"` for the genesis block
    pub previous_hash: String,
}

impl Block {
    /// Creates a new block stamped with the current local time
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `proof` - The proof of work
    /// * `previous_hash` - The digest of the previous block
    pub fn new(index: u64, proof: i64, previous_hash: String) -> Self {
        Block {
            index,
            timestamp: format_timestamp(Local::now()),
            proof,
            previous_hash,
        }
    }

    /// Calculates the digest of the block
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the block's canonical JSON as a hexadecimal string
    pub fn calculate_hash(&self) -> String {
        hasher::digest_of_block(self)
    }
}

/// Renders `YYYY-MM-DD HH:MM:SS.ffffff`, dropping the fraction when it is
/// exactly zero microseconds.
fn format_timestamp(now: DateTime<Local>) -> String {
    if now.timestamp_subsec_micros() == 0 {
        now.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        now.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}
