//! Block storage for the TerraQuest ledger.
//!
//! The store exclusively owns the block sequence. It never computes hashes
//! or interprets payloads; it only keeps blocks in height order and enforces
//! that each append lands directly on the tip the caller last observed.
//!
//! # Storage Backends
//!
//! All backends implement the [`ChainStore`] trait:
//!
//! - [`SqliteChainStore`] -- durable single-file store (WAL mode)
//! - [`InMemoryChainStore`] -- `Vec`-based store for tests and embedding

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryChainStore;
pub use sqlite::SqliteChainStore;
pub use traits::{ChainStore, Tip};
