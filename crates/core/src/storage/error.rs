use thiserror::Error;

use crate::social::{IdentifierError, User};

use super::TableKey;

/// Errors reported by the narrow key-value store interface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Index {index} is still backfilling")]
    BackfillPending { index: String },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Condition check failed on transaction operation {operation}")]
    ConditionCheckFailed { operation: usize },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),
    #[error("{entity_type} item is missing required field: {field}")]
    MissingField {
        entity_type: &'static str,
        field: &'static str,
    },
    #[error("Malformed item: {0}")]
    Decode(String),
    #[error("Index {index} is still backfilling, retry later")]
    BackfillPending { index: String },
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Batch fetch incomplete: {} key(s) missing", missing.len())]
    PartialBatchFailure {
        found: Vec<User>,
        missing: Vec<TableKey>,
    },
    #[error("{reacting_user} already reacted with {reaction} to {photo}")]
    AlreadyReacted {
        reacting_user: String,
        reaction: String,
        photo: String,
    },
    #[error("{following_user} already follows {followed_user}")]
    AlreadyFollowing {
        followed_user: String,
        following_user: String,
    },
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("Transaction cancelled by operation {operation}")]
    TransactionCancelled { operation: usize },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RepositoryError {
    /// Returns true for transient failures a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RepositoryError::StoreUnavailable(_) | RepositoryError::BackfillPending { .. }
        )
    }

    /// Returns true for precondition violations that are ordinary business outcomes.
    pub fn is_precondition_failure(&self) -> bool {
        matches!(
            self,
            RepositoryError::AlreadyReacted { .. } | RepositoryError::AlreadyFollowing { .. }
        )
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BackfillPending { index } => RepositoryError::BackfillPending { index },
            StoreError::Unavailable(message) => RepositoryError::StoreUnavailable(message),
            StoreError::ConditionCheckFailed { operation } => {
                RepositoryError::TransactionCancelled { operation }
            }
            StoreError::InvalidRequest(message) => RepositoryError::InvalidRequest(message),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_not_found_display() {
        let error = RepositoryError::NotFound {
            entity_type: "User",
            id: "jacksonjason".to_string(),
        };
        assert_eq!(error.to_string(), "User not found: jacksonjason");
    }

    #[test]
    fn test_missing_field_display() {
        let error = RepositoryError::MissingField {
            entity_type: "Photo",
            field: "timestamp",
        };
        assert_eq!(
            error.to_string(),
            "Photo item is missing required field: timestamp"
        );
    }

    #[test]
    fn test_partial_batch_failure_display() {
        let error = RepositoryError::PartialBatchFailure {
            found: Vec::new(),
            missing: vec![TableKey::new("USER#a", "#METADATA#a")],
        };
        assert_eq!(error.to_string(), "Batch fetch incomplete: 1 key(s) missing");
    }

    #[test]
    fn test_already_following_display() {
        let error = RepositoryError::AlreadyFollowing {
            followed_user: "tmartinez".to_string(),
            following_user: "john42".to_string(),
        };
        assert_eq!(error.to_string(), "john42 already follows tmartinez");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(RepositoryError::StoreUnavailable("throttled".to_string()).is_retryable());
        assert!(RepositoryError::BackfillPending {
            index: "InvertedIndex".to_string()
        }
        .is_retryable());
        assert!(!RepositoryError::Decode("bad".to_string()).is_retryable());
        assert!(!RepositoryError::AlreadyFollowing {
            followed_user: "a".to_string(),
            following_user: "b".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn test_precondition_classification() {
        let reacted = RepositoryError::AlreadyReacted {
            reacting_user: "kennedyheather".to_string(),
            reaction: "sunglasses".to_string(),
            photo: "PHOTO#ppierce#2019-04-14T08:09:34".to_string(),
        };
        assert!(reacted.is_precondition_failure());
        assert!(!RepositoryError::StoreUnavailable("x".to_string()).is_precondition_failure());
    }

    #[test]
    fn test_store_error_conversion() {
        assert_eq!(
            RepositoryError::from(StoreError::BackfillPending {
                index: "InvertedIndex".to_string()
            }),
            RepositoryError::BackfillPending {
                index: "InvertedIndex".to_string()
            }
        );
        assert_eq!(
            RepositoryError::from(StoreError::Unavailable("timeout".to_string())),
            RepositoryError::StoreUnavailable("timeout".to_string())
        );
        assert_eq!(
            RepositoryError::from(StoreError::ConditionCheckFailed { operation: 2 }),
            RepositoryError::TransactionCancelled { operation: 2 }
        );
    }
}
