use serde::{Deserialize, Serialize};

/// Note written into the genesis payload unless configured otherwise.
pub const DEFAULT_GENESIS_NOTE: &str = "TerraQuest Ledger v1";

/// Ledger service settings (the `[ledger]` table of `tq.toml`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Compare-and-append attempts before giving up with `AppendFailed`.
    pub max_append_attempts: u32,
    /// Note stored in the genesis block.
    pub genesis_note: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_append_attempts: 5,
            genesis_note: DEFAULT_GENESIS_NOTE.to_string(),
        }
    }
}
