use flatrecords_rs::{ConfigError, DslError, RecordError};
use thiserror::Error;

/// Errors that stop a read or write.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("invalid record layout: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid layout description: {0}")]
    Layout(#[from] DslError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
