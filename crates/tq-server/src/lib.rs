//! HTTP API for the TerraQuest ledger.
//!
//! Thin axum layer over [`LedgerService`](tq_ledger::LedgerService): every
//! handler runs its ledger call on tokio's blocking pool, and CORS is open
//! so a browser frontend can call it directly.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use router::{build_router, AppState, Ledger};
pub use server::TerraQuestServer;
