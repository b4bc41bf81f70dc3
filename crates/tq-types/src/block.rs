use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::event::EventType;
use crate::payload::EventPayload;

/// `prev_hash` of the genesis block: 64 hex zeros.
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Schema version stamped into every payload the ledger writes.
pub const PAYLOAD_VERSION: u32 = 1;

/// One committed record of the ledger.
///
/// Blocks are immutable once committed. `payload_json` holds the exact
/// canonical bytes that were hashed; it is never re-encoded on read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, starting at 0 for genesis.
    pub height: u64,
    /// Seconds since the UNIX epoch, assigned at append time.
    #[serde(rename = "ts")]
    pub timestamp: i64,
    /// Hash of the block at `height - 1`, or [`GENESIS_PREV_HASH`].
    pub prev_hash: String,
    /// Lowercase hex SHA-256 over this block's fields.
    pub hash: String,
    /// Schema tag of the payload.
    pub event_type: String,
    /// Canonical JSON encoding of the payload.
    pub payload_json: String,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    /// The receipt describing this block.
    pub fn receipt(&self) -> Receipt {
        Receipt {
            height: self.height,
            timestamp: self.timestamp,
            prev_hash: self.prev_hash.clone(),
            hash: self.hash.clone(),
            event_type: self.event_type.clone(),
        }
    }

    /// Parse the stored event tag.
    pub fn kind(&self) -> Result<EventType, TypeError> {
        EventType::parse(&self.event_type)
    }

    /// Decode the payload as an untyped JSON value.
    pub fn payload_value(&self) -> Result<serde_json::Value, TypeError> {
        serde_json::from_str(&self.payload_json).map_err(|e| TypeError::PayloadMismatch {
            event_type: self.event_type.clone(),
            reason: e.to_string(),
        })
    }

    /// Decode the payload into its typed variant.
    ///
    /// Fails if the payload does not parse, or if its embedded `event_type`
    /// disagrees with the block's own tag.
    pub fn decode(&self) -> Result<EventPayload, TypeError> {
        let payload: EventPayload =
            serde_json::from_str(&self.payload_json).map_err(|e| TypeError::PayloadMismatch {
                event_type: self.event_type.clone(),
                reason: e.to_string(),
            })?;

        if payload.event_type().as_str() != self.event_type {
            return Err(TypeError::PayloadMismatch {
                event_type: self.event_type.clone(),
                reason: format!("payload is tagged {}", payload.event_type()),
            });
        }
        Ok(payload)
    }

    /// First 12 hex characters of the block hash.
    pub fn short_hash(&self) -> &str {
        short(&self.hash)
    }
}

/// Result of a successful append.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub height: u64,
    #[serde(rename = "ts")]
    pub timestamp: i64,
    pub prev_hash: String,
    pub hash: String,
    pub event_type: String,
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} [{}]", self.height, self.event_type, short(&self.hash))
    }
}

/// Up to 12 characters, cut on a char boundary so damaged hashes still print.
fn short(hash: &str) -> &str {
    match hash.char_indices().nth(12) {
        Some((end, _)) => &hash[..end],
        None => hash,
    }
}

/// Returns `true` if `s` is a 64-character lowercase hex digest.
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
