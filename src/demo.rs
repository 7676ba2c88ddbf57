use crate::block::Block;
use crate::chain::{audit_chain, build_chain, validate_chain, ChainAudit};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How to build a demo chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildConfig {
    /// Number of blocks appended after genesis.
    pub length: usize,
    /// Payload prefix for every appended block.
    pub data: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            length: 20,
            data: "some data here".into(),
        }
    }
}

/// Tamper scenario: edit one block of a copy of a fresh chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TamperConfig {
    pub build: BuildConfig,
    /// Position of the block to edit.
    pub position: usize,
    /// Replacement payload.
    pub replacement: String,
    /// Recompute the edited block's hash after editing.
    pub rehash: bool,
}

impl Default for TamperConfig {
    fn default() -> Self {
        Self {
            build: BuildConfig::default(),
            position: 9,
            replacement: "Edited data".into(),
            rehash: false,
        }
    }
}

/// Result of a tamper run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TamperReport {
    pub position: usize,
    pub rehashed: bool,
    pub original: ChainAudit,
    pub tampered: ChainAudit,
}

impl fmt::Display for TamperReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.rehashed { "rehashed" } else { "stale hash" };
        writeln!(f, "Tampered block #{} ({})", self.position, mode)?;
        writeln!(f, "-- original")?;
        write!(f, "{}", self.original)?;
        writeln!(f, "-- tampered copy")?;
        write!(f, "{}", self.tampered)?;
        Ok(())
    }
}

/// Build a chain as described by `config`.
pub fn run_build(config: &BuildConfig) -> Vec<Block> {
    let blockchain = build_chain(config.length, &config.data);
    tracing::info!(blocks = blockchain.len(), "built chain");
    blockchain
}

/// Edit one block of `blockchain` in place.
pub fn tamper(
    blockchain: &mut [Block],
    position: usize,
    replacement: &str,
    rehash: bool,
) -> Result<()> {
    let length = blockchain.len();
    let block = blockchain
        .get_mut(position)
        .ok_or(LedgerError::PositionOutOfRange { position, length })?;
    block.data = replacement.into();
    if rehash {
        block.rehash();
    }
    tracing::info!(position, rehash, "tampered block");
    Ok(())
}

/// Build a chain, tamper a copy, and audit both.
pub fn run_tamper(config: &TamperConfig) -> Result<TamperReport> {
    let original = run_build(&config.build);
    let mut copy = original.clone();
    tamper(&mut copy, config.position, &config.replacement, config.rehash)?;

    let valid = validate_chain(&copy).len();
    tracing::info!(valid, total = copy.len(), "validated tampered copy");

    Ok(TamperReport {
        position: config.position,
        rehashed: config.rehash,
        original: audit_chain(&original),
        tampered: audit_chain(&copy),
    })
}

/// Chain as pretty-printed JSON.
pub fn to_json(blockchain: &[Block]) -> Result<String> {
    Ok(serde_json::to_string_pretty(blockchain)?)
}
