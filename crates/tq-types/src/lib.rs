//! Foundation types for the TerraQuest ledger.
//!
//! This crate provides the structural types shared by every other crate in
//! the workspace. It performs no hashing and no I/O.
//!
//! # Key Types
//!
//! - [`Block`] -- One committed ledger record (height, timestamp, links, payload)
//! - [`Receipt`] -- What a caller gets back after a successful append
//! - [`EventType`] -- Tag identifying a payload's schema
//! - [`EventPayload`] -- Typed, validated payload variants keyed by event type
//! - [`ValidationError`] -- A payload field that failed validation

pub mod block;
pub mod error;
pub mod event;
pub mod payload;

pub use block::{is_hex_digest, Block, Receipt, GENESIS_PREV_HASH, PAYLOAD_VERSION};
pub use error::{TypeError, ValidationError};
pub use event::EventType;
pub use payload::{
    Activity, ActivityScore, ActivitySubmission, Campaign, CampaignTier, CompletionRecord,
    EventPayload, GenesisRecord,
};
