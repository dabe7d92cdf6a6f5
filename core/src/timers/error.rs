//! Error types for timer registry operations

use thiserror::Error;

/// Errors raised by registry operations.
///
/// None of these abort a tick: they are logged and collected in the
/// `TickReport` (or returned from the direct call that caused them).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("add timer failed: timer id '{id}' is already live")]
    DuplicateId { id: String },

    #[error("no timer with id '{id}'")]
    NotFound { id: String },
}

impl TimerError {
    /// The timer id the error refers to
    pub fn id(&self) -> &str {
        match self {
            Self::DuplicateId { id } | Self::NotFound { id } => id,
        }
    }
}
