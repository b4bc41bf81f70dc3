use sha2::{Digest, Sha256};
use tq_types::Block;

/// SHA-256 block hasher.
///
/// The digest covers `height|ts|prev_hash|event_type|payload_json`. Height
/// and timestamp are decimal, `prev_hash` is fixed-width hex and event tags
/// cannot contain `|`, so the layout is unambiguous.
pub struct BlockHasher;

impl BlockHasher {
    /// Hash block fields, returning lowercase hex.
    pub fn hash(
        height: u64,
        timestamp: i64,
        prev_hash: &str,
        event_type: &str,
        payload_json: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(height.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(timestamp.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(prev_hash.as_bytes());
        hasher.update(b"|");
        hasher.update(event_type.as_bytes());
        hasher.update(b"|");
        hasher.update(payload_json.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Recompute the hash of a stored block from its own fields.
    pub fn hash_block(block: &Block) -> String {
        Self::hash(
            block.height,
            block.timestamp,
            &block.prev_hash,
            &block.event_type,
            &block.payload_json,
        )
    }

    /// Verify that a block's stored hash matches its contents.
    pub fn verify(block: &Block) -> bool {
        Self::hash_block(block) == block.hash
    }
}
