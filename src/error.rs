use thiserror::Error;

/// Failures reported by the engine. Empty undo/redo is not an error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("index out of range: {0}")]
    OutOfRange(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("cannot allocate tile storage ({bytes} bytes)")]
    AllocationFailure { bytes: usize },
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub(crate) fn out_of_range(what: &str, index: usize, len: usize) -> Self {
        EngineError::OutOfRange(format!("{what} {index} (have {len})"))
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidArgument(msg.into())
    }
}
