use thiserror::Error;

/// Storage layer error types
#[derive(Error, Debug)]
pub enum StratumError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("out of memory: {0}")]
    NoMem(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("clean end of log")]
    RecordEof,
}

impl StratumError {
    /// Returns true for the clean end-of-log marker produced by the log
    /// iterator, as opposed to a real failure.
    pub fn is_eof(&self) -> bool {
        matches!(self, StratumError::RecordEof)
    }
}

pub type Result<T> = std::result::Result<T, StratumError>;
