use std::net::{Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Blocks returned by `GET /chain` when no `limit` is given.
pub const DEFAULT_CHAIN_LIMIT: u64 = 50;

/// HTTP server settings (the `[server]` table of `tq.toml`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Default page size of the chain viewer.
    pub chain_limit: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)),
            chain_limit: DEFAULT_CHAIN_LIMIT,
        }
    }
}
