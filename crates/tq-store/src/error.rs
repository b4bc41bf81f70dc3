/// Errors from chain store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store holds no blocks yet.
    #[error("store is empty")]
    EmptyStore,

    /// Another writer appended since the caller read the tip.
    #[error("tip moved: expected {expected:?}, found {actual:?}")]
    TipMoved {
        expected: Option<u64>,
        actual: Option<u64>,
    },

    /// The block does not sit directly on the expected tip.
    #[error("block height {got} does not follow tip (expected height {expected})")]
    HeightMismatch { expected: u64, got: u64 },

    /// Error from the SQLite backend.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored value could not be converted.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Returns `true` if the failure was a lost race on the tip.
    pub fn is_tip_moved(&self) -> bool {
        matches!(self, Self::TipMoved { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
