use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    #[error("No face detected")]
    NoFaceDetected,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Worker error{}: {message}", .status.map(|s| format!(" (status {})", s)).unwrap_or_default())]
    Worker {
        status: Option<u16>,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    /// Wraps a failure reported by the external detection worker, keeping
    /// its status code when one was returned.
    pub fn worker(status: Option<u16>, message: impl Into<String>) -> Self {
        EngineError::Worker {
            status,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
