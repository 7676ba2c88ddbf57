use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 hash as lowercase hex string, or the genesis sentinel.
pub type BlockHash = String;

/// `previous_hash` carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Payload carried by the genesis block.
pub const GENESIS_DATA: &str = "Genesis Block";

/// A ledger entry committing to its predecessor by hash.
///
/// `hash` is computed once in [`Block::new`] and never refreshed afterwards.
/// Mutating a field leaves the stored hash stale, which is exactly what
/// chain validation detects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub data: String,
    pub previous_hash: BlockHash,
    pub hash: BlockHash,
}

impl Block {
    /// Create a block; inputs are not validated.
    pub fn new(
        index: u64,
        timestamp: DateTime<Utc>,
        data: String,
        previous_hash: BlockHash,
    ) -> Self {
        let hash = compute_hash(index, &timestamp, &data, &previous_hash);
        Self {
            index,
            timestamp,
            data,
            previous_hash,
            hash,
        }
    }

    /// Digest of the current field values. Does not touch `hash`.
    pub fn calculate_hash(&self) -> BlockHash {
        compute_hash(self.index, &self.timestamp, &self.data, &self.previous_hash)
    }

    /// Whether the stored hash still matches the fields.
    pub fn verify(&self) -> bool {
        self.calculate_hash() == self.hash
    }

    /// Store the digest of the current field values.
    pub fn rehash(&mut self) {
        self.hash = self.calculate_hash();
    }

    /// Index 0 carrying the genesis sentinel as `previous_hash`.
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block #{}", self.index)
    }
}

/// Fixed-precision RFC 3339 form used inside the hash preimage.
pub fn timestamp_repr(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// SHA-256 over `index ‖ timestamp ‖ data ‖ previous_hash`, hex-encoded.
///
/// Fields are concatenated without separators, so distinct field values can
/// share a preimage (`"ab" ‖ "c"` and `"a" ‖ "bc"`). Changing the layout would
/// change every existing hash, so it stays as is.
pub fn compute_hash(
    index: u64,
    timestamp: &DateTime<Utc>,
    data: &str,
    previous_hash: &str,
) -> BlockHash {
    let mut hasher = Sha256::new();
    hasher.update(index.to_string().as_bytes());
    hasher.update(timestamp_repr(timestamp).as_bytes());
    hasher.update(data.as_bytes());
    hasher.update(previous_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}
