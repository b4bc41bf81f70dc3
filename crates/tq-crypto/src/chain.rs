use tq_types::{Block, GENESIS_PREV_HASH};

use crate::hasher::BlockHasher;

/// Trait for records that participate in a hash chain.
pub trait HashLinked {
    /// Position in the chain.
    fn height(&self) -> u64;
    /// Hash stored on the record.
    fn stored_hash(&self) -> &str;
    /// Hash of the predecessor stored on the record.
    fn prev_hash(&self) -> &str;
    /// Hash recomputed from the record's contents.
    fn computed_hash(&self) -> String;
}

impl HashLinked for Block {
    fn height(&self) -> u64 {
        self.height
    }

    fn stored_hash(&self) -> &str {
        &self.hash
    }

    fn prev_hash(&self) -> &str {
        &self.prev_hash
    }

    fn computed_hash(&self) -> String {
        BlockHasher::hash_block(self)
    }
}

/// Hash chain integrity verifier.
///
/// Walks a height-ordered run of records starting at genesis and stops at the
/// first violation.
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Verify a chain of records.
    ///
    /// For each record, in order:
    /// 1. its height equals its position in the slice
    /// 2. genesis carries the zero sentinel, every later record links to the
    ///    stored hash of its predecessor
    /// 3. its stored hash matches the recomputed one
    pub fn verify_chain<T: HashLinked>(records: &[T]) -> Result<(), ChainError> {
        if records.is_empty() {
            return Err(ChainError::Empty);
        }

        for (position, record) in records.iter().enumerate() {
            let expected = position as u64;
            if record.height() != expected {
                return Err(ChainError::HeightGap { height: expected });
            }

            let expected_prev = match position {
                0 => GENESIS_PREV_HASH,
                _ => records[position - 1].stored_hash(),
            };
            if record.prev_hash() != expected_prev {
                return Err(ChainError::BrokenLink { height: expected });
            }

            if record.computed_hash() != record.stored_hash() {
                return Err(ChainError::HashMismatch { height: expected });
            }
        }

        Ok(())
    }
}

/// First integrity violation found in a chain.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("No blocks found")]
    Empty,

    #[error("Height gap at height {height}")]
    HeightGap { height: u64 },

    #[error("Broken link at height {height}")]
    BrokenLink { height: u64 },

    #[error("Hash mismatch at height {height}")]
    HashMismatch { height: u64 },
}

impl ChainError {
    /// Height at which the violation was found, if any.
    pub fn height(&self) -> Option<u64> {
        match self {
            Self::Empty => None,
            Self::HeightGap { height }
            | Self::BrokenLink { height }
            | Self::HashMismatch { height } => Some(*height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_chain(len: u64) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::new();
        for height in 0..len {
            let prev_hash = blocks
                .last()
                .map(|b| b.hash.clone())
                .unwrap_or_else(|| GENESIS_PREV_HASH.to_string());
            let event_type = if height == 0 { "genesis" } else { "completion" };
            let payload_json = format!(r#"{{"event_type":"{event_type}","n":{height},"version":1}}"#);
            let timestamp = 1_700_000_000 + height as i64;
            let hash = BlockHasher::hash(height, timestamp, &prev_hash, event_type, &payload_json);
            blocks.push(Block {
                height,
                timestamp,
                prev_hash,
                hash,
                event_type: event_type.into(),
                payload_json,
            });
        }
        blocks
    }

    #[test]
    fn valid_chain_verifies() {
        assert!(HashChainVerifier::verify_chain(&make_chain(1)).is_ok());
        assert!(HashChainVerifier::verify_chain(&make_chain(5)).is_ok());
    }

    #[test]
    fn empty_chain_is_reported() {
        let err = HashChainVerifier::verify_chain::<Block>(&[]).unwrap_err();
        assert_eq!(err, ChainError::Empty);
        assert_eq!(err.to_string(), "No blocks found");
        assert_eq!(err.height(), None);
    }

    #[test]
    fn corrupted_hash_is_a_mismatch() {
        let mut chain = make_chain(3);
        chain[1].hash = "f".repeat(64);
        let err = HashChainVerifier::verify_chain(&chain).unwrap_err();
        // Height 1 no longer hashes to its stored value; height 2 is never reached.
        assert_eq!(err, ChainError::HashMismatch { height: 1 });
        assert_eq!(err.to_string(), "Hash mismatch at height 1");
    }

    #[test]
    fn replaced_prev_hash_is_a_broken_link() {
        let mut chain = make_chain(3);
        chain[2].prev_hash = "0".repeat(64);
        let err = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err.to_string(), "Broken link at height 2");
    }

    #[test]
    fn genesis_without_sentinel_is_a_broken_link() {
        let mut chain = make_chain(2);
        chain[0].prev_hash = "1".repeat(64);
        assert_eq!(
            HashChainVerifier::verify_chain(&chain),
            Err(ChainError::BrokenLink { height: 0 })
        );
    }

    #[test]
    fn edited_payload_is_a_mismatch() {
        let mut chain = make_chain(4);
        chain[3].payload_json = chain[3].payload_json.replace("\"n\":3", "\"n\":30");
        assert_eq!(
            HashChainVerifier::verify_chain(&chain),
            Err(ChainError::HashMismatch { height: 3 })
        );
    }

    #[test]
    fn missing_height_is_a_gap() {
        let mut chain = make_chain(4);
        chain.remove(2);
        let err = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err, ChainError::HeightGap { height: 2 });
        assert_eq!(err.height(), Some(2));
    }
}
