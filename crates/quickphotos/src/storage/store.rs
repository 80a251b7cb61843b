//! The narrow key-value store interface this layer is written against.
//!
//! Everything above this trait (planner, enrichment, writer) is backend
//! agnostic; DynamoDB and the in-memory store are the two implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;

use quickphotos_core::storage::{IndexTarget, KeyCondition, StoreError, TableKey};

/// A stored item: a flat attribute map that always carries `PK` and `SK`.
pub type Item = HashMap<String, AttributeValue>;

/// Maximum number of keys a single BatchGetItem request may carry.
pub const BATCH_GET_LIMIT: usize = 100;

/// One page of a key-condition query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub index: IndexTarget,
    pub condition: KeyCondition,
    pub scan_forward: bool,
    /// Continuation token from the previous page.
    pub exclusive_start_key: Option<Item>,
    pub limit: Option<i32>,
}

impl QueryRequest {
    pub fn new(index: IndexTarget, condition: KeyCondition, scan_forward: bool) -> Self {
        Self {
            index,
            condition,
            scan_forward,
            exclusive_start_key: None,
            limit: None,
        }
    }

    pub fn with_start_key(mut self, key: Option<Item>) -> Self {
        self.exclusive_start_key = key;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub items: Vec<Item>,
    /// Present when more pages remain.
    pub last_evaluated_key: Option<Item>,
}

/// Items the store returned for a batch, in no particular order, plus the
/// keys it did not get to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetOutput {
    pub items: Vec<Item>,
    pub unprocessed_keys: Vec<TableKey>,
}

/// A numeric attribute targeted by an increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterPath {
    /// A top-level number, e.g. `followers`.
    Attribute(&'static str),
    /// An entry of a top-level map, e.g. `reactions["+1"]`.
    MapEntry { map: &'static str, entry: String },
}

/// One operation of an all-or-nothing write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert an item, failing if a row already exists at its key.
    PutIfAbsent { item: Item },
    /// Add `by` to a counter on an existing row, failing if the row is absent.
    Increment {
        key: TableKey,
        counter: CounterPath,
        by: i64,
    },
}

/// The four store primitives this layer consumes.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get_item(&self, key: &TableKey) -> Result<Option<Item>, StoreError>;

    /// Runs a single page of a key-condition query.
    ///
    /// Fails with `BackfillPending` when the inverted index is still being
    /// populated.
    async fn query(&self, request: QueryRequest) -> Result<QueryPage, StoreError>;

    /// Fetches up to [`BATCH_GET_LIMIT`] keys in one request.
    async fn batch_get_items(&self, keys: &[TableKey]) -> Result<BatchGetOutput, StoreError>;

    /// Commits every operation or none of them.
    ///
    /// A failed precondition is reported as `ConditionCheckFailed` with the
    /// index of the offending operation.
    async fn transact_write_items(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;
}
