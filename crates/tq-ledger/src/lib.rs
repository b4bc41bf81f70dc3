//! Append-only activity ledger for TerraQuest.
//!
//! This crate is the heart of TerraQuest. It provides:
//! - [`LedgerService`], the single write path: genesis creation, typed
//!   appends with optimistic retry, and read helpers
//! - [`NewActivity`], the unvalidated input for activity submissions
//! - [`ChainVerification`], the tamper-check result
//! - [`LedgerConfig`] with retry and genesis settings
//!
//! The service holds no block state of its own; every read goes through
//! the [`ChainStore`](tq_store::ChainStore) handle it is given.

pub mod activity;
pub mod config;
pub mod error;
pub mod service;

pub use activity::NewActivity;
pub use config::LedgerConfig;
pub use error::LedgerError;
pub use service::{ChainVerification, LedgerService};
