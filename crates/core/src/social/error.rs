use thiserror::Error;

/// Errors that can occur when validating identifiers or parsing stored keys.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },
    #[error("{kind} cannot contain '#': {value}")]
    ContainsDelimiter { kind: &'static str, value: String },
    #[error("Invalid timestamp (expected YYYY-MM-DDTHH:MM:SS): {0}")]
    InvalidTimestamp(String),
    #[error("Unknown reaction type: {0}")]
    UnknownReaction(String),
    #[error("Malformed key: {0}")]
    MalformedKey(String),
}
