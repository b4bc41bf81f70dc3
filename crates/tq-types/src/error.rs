use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid event type tag: {0:?}")]
    InvalidEventType(String),

    #[error("payload does not match event type {event_type}: {reason}")]
    PayloadMismatch { event_type: String, reason: String },
}

/// A payload field that failed validation.
///
/// `field` names the offending input field exactly as it appears in the
/// payload, so HTTP and CLI callers can point at it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{field} {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// A required text field was missing or blank.
    pub fn required(field: impl Into<String>) -> Self {
        Self::new(field, "is required")
    }
}
