//! Error types for ReviewStream

/// Result type alias using ReviewStream's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ReviewStream operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Classifier construction errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Ingestion connection errors (connect, read, write)
    #[error("transport error: {0}")]
    Transport(String),

    /// Coordinator/worker protocol violations
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A payload does not fit in a transport frame
    #[error("frame payload of {len} bytes exceeds capacity of {capacity} bytes")]
    FrameTooLarge { len: usize, capacity: usize },

    /// A worker closed its channel before the round completed
    #[error("worker {rank} exited unexpectedly")]
    WorkerExited { rank: usize },

    /// The operation was cancelled by shutdown
    #[error("operation cancelled")]
    Cancelled,

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is the result of cooperative cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
