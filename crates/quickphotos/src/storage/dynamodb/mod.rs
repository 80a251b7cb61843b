//! DynamoDB storage backend implementation.
//!
//! This module provides a DynamoDB-based implementation of the item store
//! using `aws-sdk-dynamodb`.

mod error;
mod expressions;
mod store;

pub use error::is_backfill_error;
pub use store::DynamoDbStore;
