use thiserror::Error;

/// Errors raised while configuring or calling the model collaborator
#[derive(Error, Debug)]
pub enum DigestError {
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("Response Error: {0}")]
    ResponseError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

/// Result type for digest operations
pub type DigestResult<T> = Result<T, DigestError>;

/// Reasons a submission is refused before any model call is made
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("A request is already pending")]
    Busy,

    #[error("Name and password are both required")]
    MissingCredentials,

    #[error("No history entry at position {0}")]
    NoSuchHistoryItem(usize),
}
