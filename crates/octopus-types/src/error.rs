use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QpError {
    /// Wrong number of positional arguments; callers render the usage text.
    #[error("Invalid call, see usage")]
    Usage,

    #[error("{argument} should be {expected}")]
    InvalidArgument { argument: String, expected: String },

    #[error("Dimension mismatch: {0}")]
    Dimension(String),

    #[error("Solver backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl QpError {
    pub fn invalid_argument(argument: impl Into<String>, expected: impl Into<String>) -> Self {
        QpError::InvalidArgument {
            argument: argument.into(),
            expected: expected.into(),
        }
    }

    /// True for the generic "show usage" signal, as opposed to a field diagnostic.
    pub fn is_usage(&self) -> bool {
        matches!(self, QpError::Usage)
    }
}

pub type Result<T> = std::result::Result<T, QpError>;
