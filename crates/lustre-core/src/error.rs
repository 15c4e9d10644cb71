//! Error types for the lustre catalog engine.

use thiserror::Error;

/// Result type alias using lustre's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for lustre operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Mutation targeted a system-defined category
    #[error("Built-in category is read-only: {0}")]
    BuiltInCategory(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Remote collection or writer rejected the request
    #[error("Remote error: {0}")]
    Remote(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Failure taxonomy of the item synchronization state machine.
///
/// These never cross the store boundary as `Err`; they are recorded on the
/// store snapshot next to the `Offline`/`Failed` status they caused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// No emission arrived before the connect timeout fired.
    #[error("Connection timed out after {timeout_ms}ms")]
    ConnectionTimeout { timeout_ms: u64 },

    /// No async runtime was available to enforce the connect timeout.
    #[error("No async runtime to enforce the connect timeout")]
    TimerUnavailable,

    /// The remote subscription rejected or dropped the listener.
    #[error("Listener error: {0}")]
    Listener(String),

    /// The remote source emitted a snapshot with zero records.
    #[error("Remote collection returned no items")]
    EmptyDataset,

    /// Even the bundled offline dataset could not be loaded.
    #[error("Fallback dataset failed to load: {0}")]
    FallbackLoad(String),
}

impl SyncError {
    /// Whether the failure leaves the store without any dataset.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::FallbackLoad(_))
    }
}
