use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tq_ledger::LedgerService;
use tq_store::ChainStore;

use crate::config::DEFAULT_CHAIN_LIMIT;
use crate::handler;

/// Ledger service over any store backend.
pub type Ledger = LedgerService<Box<dyn ChainStore>>;

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub chain_limit: u64,
}

impl AppState {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            chain_limit: DEFAULT_CHAIN_LIMIT,
        }
    }
}

/// Build the axum router with all TerraQuest endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handler::health_handler))
        .route("/info", get(handler::info_handler))
        .route(
            "/activities",
            get(handler::list_activities_handler).post(handler::add_activity_handler),
        )
        .route("/campaigns", axum::routing::post(handler::add_campaign_handler))
        .route("/chain", get(handler::chain_handler))
        .route("/chain/verify", get(handler::verify_chain_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
