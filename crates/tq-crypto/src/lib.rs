//! Hashing primitives for the TerraQuest ledger.
//!
//! Provides the canonical JSON encoder whose bytes feed the block hash, the
//! SHA-256 block hasher, and the hash-chain verifier used by the ledger's
//! tamper check.
//!
//! Hashing is plain SHA-256 from the `sha2` crate; nothing here is custom
//! cryptography.

pub mod canonical;
pub mod chain;
pub mod hasher;

pub use canonical::{CanonicalEncoder, EncodeError};
pub use chain::{ChainError, HashChainVerifier, HashLinked};
pub use hasher::BlockHasher;
