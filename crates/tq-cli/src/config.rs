use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tq_ledger::LedgerConfig;
use tq_server::ServerConfig;

/// Configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tq.toml";

/// Contents of `tq.toml`. Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// SQLite database holding the ledger.
    pub database: PathBuf,
    pub ledger: LedgerConfig,
    pub server: ServerConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("terraquest.db"),
            ledger: LedgerConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl CliConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load `explicit` if given (it must exist), else `./tq.toml` if present,
    /// else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}
