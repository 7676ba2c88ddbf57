use crate::block::{Block, GENESIS_DATA, GENESIS_PREVIOUS_HASH};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Make the first block of a chain.
pub fn make_genesis_block() -> Block {
    make_genesis_block_at(Utc::now())
}

/// Genesis block with an explicit timestamp (for testing / determinism).
pub fn make_genesis_block_at(timestamp: DateTime<Utc>) -> Block {
    Block::new(
        0,
        timestamp,
        GENESIS_DATA.into(),
        GENESIS_PREVIOUS_HASH.into(),
    )
}

/// Derive the block following `last_block`.
///
/// The new payload is `data` followed by the new index. The link is taken
/// from the parent's stored hash as it is right now.
pub fn next_block(last_block: &Block, data: &str) -> Block {
    next_block_at(last_block, data, Utc::now())
}

/// Next block with an explicit timestamp.
///
/// The index wraps to 0 after `u64::MAX`; the resulting block still links to
/// its parent by hash.
pub fn next_block_at(last_block: &Block, data: &str, timestamp: DateTime<Utc>) -> Block {
    let index = last_block.index.wrapping_add(1);
    Block::new(
        index,
        timestamp,
        format!("{}{}", data, index),
        last_block.hash.clone(),
    )
}

/// Genesis followed by `length` blocks derived from each other.
pub fn build_chain(length: usize, data: &str) -> Vec<Block> {
    let mut blockchain = Vec::with_capacity(length + 1);
    blockchain.push(make_genesis_block());
    for _ in 0..length {
        let block = match blockchain.last() {
            Some(prev) => next_block(prev, data),
            None => break,
        };
        tracing::debug!(index = block.index, hash = %block.hash, "{} added to blockchain", block);
        blockchain.push(block);
    }
    blockchain
}

/// Why a link between two consecutive blocks is rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LinkBreak {
    /// The predecessor's stored hash no longer matches its fields.
    TamperedPredecessor,
    /// The successor's `previous_hash` differs from the predecessor's hash.
    HashMismatch,
}

impl fmt::Display for LinkBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkBreak::TamperedPredecessor => write!(f, "predecessor was modified"),
            LinkBreak::HashMismatch => write!(f, "previous hash mismatch"),
        }
    }
}

/// Check the link `prev -> block`.
///
/// A stale hash on `prev` is only seen from its successor, so editing a
/// block's contents breaks the chain one position later. Editing
/// `previous_hash` breaks the link into the block itself.
pub fn check_link(prev: &Block, block: &Block) -> Option<LinkBreak> {
    if !prev.verify() {
        Some(LinkBreak::TamperedPredecessor)
    } else if block.previous_hash != prev.hash {
        Some(LinkBreak::HashMismatch)
    } else {
        None
    }
}

/// Position of the first block whose link to its predecessor is broken.
pub fn first_broken_link(blockchain: &[Block]) -> Option<usize> {
    find_break(blockchain).map(|(i, _)| i)
}

fn find_break(blockchain: &[Block]) -> Option<(usize, LinkBreak)> {
    blockchain
        .windows(2)
        .enumerate()
        .find_map(|(i, pair)| check_link(&pair[0], &pair[1]).map(|reason| (i + 1, reason)))
}

/// Longest prefix of `blockchain` that is hash-consistent from genesis.
///
/// Everything from the first broken link onward is dropped, even when the
/// later blocks are consistent among themselves.
pub fn validate_chain(blockchain: &[Block]) -> &[Block] {
    match find_break(blockchain) {
        Some((i, reason)) => {
            tracing::warn!(position = i, %reason, "chain broken");
            &blockchain[..i]
        }
        None => blockchain,
    }
}

/// Outcome of walking a chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainAudit {
    pub length: usize,
    pub valid_length: usize,
    pub broken_at: Option<usize>,
    pub reason: Option<LinkBreak>,
}

impl ChainAudit {
    pub fn is_valid(&self) -> bool {
        self.broken_at.is_none()
    }
}

impl fmt::Display for ChainAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Blocks:       {}", self.length)?;
        writeln!(f, "Valid prefix: {}", self.valid_length)?;
        match (self.broken_at, self.reason) {
            (Some(i), Some(reason)) => writeln!(f, "Broken at:    {} ({})", i, reason)?,
            _ => writeln!(f, "Broken at:    -")?,
        }
        Ok(())
    }
}

/// Walk `blockchain` and report where (and why) it breaks.
pub fn audit_chain(blockchain: &[Block]) -> ChainAudit {
    let found = find_break(blockchain);
    ChainAudit {
        length: blockchain.len(),
        valid_length: found.map_or(blockchain.len(), |(i, _)| i),
        broken_at: found.map(|(i, _)| i),
        reason: found.map(|(_, reason)| reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn scenario_chain() -> Vec<Block> {
        let mut blockchain = vec![make_genesis_block()];
        for _ in 0..20 {
            let block = next_block(blockchain.last().unwrap(), "some data here");
            blockchain.push(block);
        }
        blockchain
    }

    fn fixed_chain(length: usize) -> Vec<Block> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut blockchain = vec![make_genesis_block_at(t0)];
        for i in 1..=length {
            let ts = t0 + Duration::seconds(i as i64);
            let block = next_block_at(blockchain.last().unwrap(), "tx", ts);
            blockchain.push(block);
        }
        blockchain
    }

    #[test]
    fn genesis_block_fields() {
        let g = make_genesis_block();
        assert_eq!(g.index, 0);
        assert_eq!(g.data, "Genesis Block");
        assert_eq!(g.previous_hash, "0");
        assert!(g.verify());
    }

    #[test]
    fn next_block_links_to_parent() {
        let g = make_genesis_block();
        let b = next_block(&g, "payload");
        assert_eq!(b.index, 1);
        assert_eq!(b.data, "payload1");
        assert_eq!(b.previous_hash, g.hash);
    }

    #[test]
    fn next_block_empty_payload_is_index() {
        let g = make_genesis_block();
        let b = next_block(&next_block(&g, ""), "");
        assert_eq!(b.data, "2");
    }

    #[test]
    fn next_block_links_to_tampered_parent() {
        let mut g = make_genesis_block();
        g.data = "forged".into();
        let b = next_block(&g, "");
        assert_eq!(b.previous_hash, g.hash);
    }

    #[test]
    fn twenty_block_scenario() {
        let blockchain = scenario_chain();
        assert_eq!(blockchain.len(), 21);
        assert_eq!(blockchain[0].previous_hash, "0");
        assert_eq!(blockchain[5].previous_hash, blockchain[4].hash);
        assert_eq!(blockchain[20].data, "some data here20");
        assert_eq!(validate_chain(&blockchain), &blockchain[..]);
    }

    #[test]
    fn build_chain_derives_each_block() {
        let genesis_only = build_chain(0, "x");
        assert_eq!(genesis_only.len(), 1);
        assert!(genesis_only[0].is_genesis());

        let blockchain = build_chain(3, "x");
        assert_eq!(blockchain.len(), 4);
        assert_eq!(blockchain[3].data, "x3");
        assert!(blockchain.iter().all(Block::verify));
        assert!(audit_chain(&blockchain).is_valid());
    }

    #[test]
    fn empty_and_single_are_valid() {
        let empty: Vec<Block> = Vec::new();
        assert!(validate_chain(&empty).is_empty());

        let single = vec![make_genesis_block()];
        assert_eq!(validate_chain(&single), &single[..]);
        assert_eq!(first_broken_link(&single), None);
    }

    #[test]
    fn edited_data_drops_everything_after_the_block() {
        let original = scenario_chain();
        let mut blockchain = original.clone();
        blockchain[9].data = "Edited data".into();

        let valid = validate_chain(&blockchain);
        assert_eq!(valid.len(), 10);
        assert_eq!(valid, &blockchain[0..10]);
        assert_eq!(valid.last().unwrap().index, 9);

        assert_eq!(validate_chain(&original).len(), 21);
        assert_eq!(original[9].data, "some data here9");
    }

    #[test]
    fn editing_any_field_breaks_after_it() {
        for k in [0usize, 3, 7] {
            let mut blockchain = fixed_chain(10);
            blockchain[k].timestamp += Duration::milliseconds(5);
            assert_eq!(validate_chain(&blockchain).len(), k + 1);

            let mut blockchain = fixed_chain(10);
            blockchain[k].index += 100;
            assert_eq!(validate_chain(&blockchain).len(), k + 1);

            let mut blockchain = fixed_chain(10);
            blockchain[k].data = "Edited data".into();
            assert_eq!(validate_chain(&blockchain).len(), k + 1);
        }
    }

    #[test]
    fn editing_previous_hash_breaks_at_the_block() {
        for k in [1usize, 9] {
            let mut blockchain = build_chain(20, "some data here");
            blockchain[k].previous_hash = "ffff".into();
            let audit = audit_chain(&blockchain);
            assert_eq!(audit.broken_at, Some(k));
            assert_eq!(audit.reason, Some(LinkBreak::HashMismatch));
            assert_eq!(validate_chain(&blockchain).len(), k);
        }
    }

    #[test]
    fn tampered_genesis_is_kept_alone() {
        let mut blockchain = fixed_chain(5);
        blockchain[0].data = "Edited data".into();
        let valid = validate_chain(&blockchain);
        assert_eq!(valid.len(), 1);
        assert!(!valid[0].verify());

        // Genesis has no predecessor, so its own link cannot break.
        let mut blockchain = fixed_chain(5);
        blockchain[0].previous_hash = "ffff".into();
        assert_eq!(validate_chain(&blockchain).len(), 1);
    }

    #[test]
    fn next_block_wraps_at_max_index() {
        let last = Block::new(u64::MAX, Utc::now(), String::new(), "p".into());
        let b = next_block(&last, "d");
        assert_eq!(b.index, 0);
        assert_eq!(b.data, "d0");
        assert_eq!(b.previous_hash, last.hash);
        assert_eq!(check_link(&last, &b), None);
    }

    #[test]
    fn rehashed_edit_breaks_at_successor() {
        let mut blockchain = fixed_chain(10);
        blockchain[4].data = "Edited data".into();
        blockchain[4].rehash();

        let audit = audit_chain(&blockchain);
        assert_eq!(audit.broken_at, Some(5));
        assert_eq!(audit.reason, Some(LinkBreak::HashMismatch));
        assert_eq!(validate_chain(&blockchain), &blockchain[..5]);
    }

    #[test]
    fn later_consistent_blocks_are_still_dropped() {
        let mut blockchain = fixed_chain(6);
        blockchain[2].previous_hash = "bogus".into();
        blockchain[2].rehash();
        // Re-link the tail so blocks 2..=6 are consistent among themselves.
        for i in 3..blockchain.len() {
            blockchain[i].previous_hash = blockchain[i - 1].hash.clone();
            blockchain[i].rehash();
        }
        assert_eq!(first_broken_link(&blockchain), Some(2));
        assert_eq!(validate_chain(&blockchain).len(), 2);
    }

    #[test]
    fn audit_reports_tamper_reason() {
        let mut blockchain = fixed_chain(5);
        blockchain[2].data = "x".into();
        let audit = audit_chain(&blockchain);
        assert_eq!(audit.length, 6);
        assert_eq!(audit.valid_length, 3);
        assert_eq!(audit.reason, Some(LinkBreak::TamperedPredecessor));
        assert!(!audit.is_valid());
        assert!(audit.to_string().contains("predecessor was modified"));
    }

    #[test]
    fn check_link_accepts_derived_pair() {
        let g = make_genesis_block();
        let b = next_block(&g, "d");
        assert_eq!(check_link(&g, &b), None);
        assert_eq!(
            check_link(&g, &make_genesis_block_at(g.timestamp)),
            Some(LinkBreak::HashMismatch)
        );
    }
}
