use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::{build_router, AppState, Ledger};

/// TerraQuest ledger HTTP server.
pub struct TerraQuestServer {
    config: ServerConfig,
    ledger: Arc<Ledger>,
}

impl TerraQuestServer {
    pub fn new(config: ServerConfig, ledger: Arc<Ledger>) -> Self {
        Self { config, ledger }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state())
    }

    fn state(&self) -> AppState {
        AppState {
            ledger: Arc::clone(&self.ledger),
            chain_limit: self.config.chain_limit,
        }
    }

    /// Ensure genesis exists, then start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let ledger = Arc::clone(&self.ledger);
        tokio::task::spawn_blocking(move || ledger.initialize_and_ensure_genesis())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))??;

        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("TerraQuest ledger API listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
