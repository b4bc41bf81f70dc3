use tq_crypto::EncodeError;
use tq_store::StoreError;
use tq_types::{TypeError, ValidationError};

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Input rejected before anything was hashed.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The ledger has no genesis block yet.
    #[error("ledger is empty; initialize it first")]
    EmptyStore,

    /// Every compare-and-append attempt lost a race on the tip.
    #[error("append failed after {attempts} attempts: tip kept moving")]
    AppendFailed { attempts: u32 },

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodeError),

    /// A stored payload does not match its schema.
    #[error("decode error: {0}")]
    Decode(#[from] TypeError),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptyStore => Self::EmptyStore,
            other => Self::Store(other),
        }
    }
}

impl LedgerError {
    /// Field named by a validation failure.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation(v) => Some(&v.field),
            _ => None,
        }
    }
}
