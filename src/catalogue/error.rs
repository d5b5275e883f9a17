use thiserror::Error;

/// Failures raised by a search backend.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid field tag `{0}`: only letters, digits, `_` and `-` are allowed")]
    InvalidFieldTag(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("malformed metadata: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Backend(String),
}
