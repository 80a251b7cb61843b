//! In-memory item store.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use tokio::sync::RwLock;

use quickphotos_core::storage::{
    IndexTarget, KeyCondition, StoreError, TableKey, INVERTED_INDEX_NAME,
};

use crate::storage::codec::{self, StoredEntity};
use crate::storage::store::{
    BatchGetOutput, CounterPath, Item, ItemStore, QueryPage, QueryRequest, WriteOp,
    BATCH_GET_LIMIT,
};

#[derive(Debug, Default)]
struct State {
    table: BTreeMap<TableKey, Item>,
    backfilling: bool,
    unavailable: bool,
    page_size: Option<usize>,
    deferred: BTreeSet<TableKey>,
    batch_calls: usize,
}

/// In-memory storage backend for testing.
///
/// Mirrors the store behavior this layer depends on: rows sorted by key, an
/// inverted index over `(SK, PK)`, paginated queries, atomic conditional
/// transactions, and BatchGetItem responses that are unordered and may leave
/// keys unprocessed. Data is lost when the store is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes an entity unconditionally.
    pub async fn seed(&self, entity: StoredEntity) {
        let mut state = self.state.write().await;
        state.table.insert(entity.key(), codec::encode(&entity));
    }

    /// Writes a raw item unconditionally.
    pub async fn put_item(&self, item: Item) -> Result<(), StoreError> {
        let key = key_of(&item)?;
        self.state.write().await.table.insert(key, item);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.table.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// While set, queries on the inverted index fail with `BackfillPending`.
    pub async fn set_backfilling(&self, backfilling: bool) {
        self.state.write().await.backfilling = backfilling;
    }

    /// While set, every call fails with `Unavailable`.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Caps the number of items per query page.
    pub async fn set_page_size(&self, page_size: Option<usize>) {
        self.state.write().await.page_size = page_size;
    }

    /// Keys that BatchGetItem will always report as unprocessed.
    pub async fn defer_keys(&self, keys: Vec<TableKey>) {
        self.state.write().await.deferred.extend(keys);
    }

    /// Number of BatchGetItem requests served so far.
    pub async fn batch_calls(&self) -> usize {
        self.state.read().await.batch_calls
    }
}

fn key_of(item: &Item) -> Result<TableKey, StoreError> {
    codec::item_key(item).map_err(|e| StoreError::InvalidRequest(e.to_string()))
}

fn check_available(state: &State) -> Result<(), StoreError> {
    if state.unavailable {
        return Err(StoreError::Unavailable(
            "in-memory store marked unavailable".to_string(),
        ));
    }
    Ok(())
}

fn hash_key(index: IndexTarget, key: &TableKey) -> &str {
    match index {
        IndexTarget::Table => &key.pk,
        IndexTarget::InvertedIndex => &key.sk,
    }
}

fn range_key(index: IndexTarget, key: &TableKey) -> &str {
    match index {
        IndexTarget::Table => &key.sk,
        IndexTarget::InvertedIndex => &key.pk,
    }
}

/// Rows matching `condition`, ordered by the range attribute of `index`.
fn matching_rows<'a>(
    state: &'a State,
    index: IndexTarget,
    condition: &KeyCondition,
) -> Vec<(&'a TableKey, &'a Item)> {
    let mut rows: Vec<_> = state
        .table
        .iter()
        .filter(|(key, _)| hash_key(index, key) == condition.partition)
        .filter(|(key, _)| {
            condition
                .range
                .as_ref()
                .is_none_or(|range| range.contains(range_key(index, key)))
        })
        .collect();
    rows.sort_by(|(a, _), (b, _)| range_key(index, a).cmp(range_key(index, b)));
    rows
}

/// Computes the new value of a counter, treating an absent counter as zero.
///
/// A map entry can only be created under an existing map.
fn incremented(item: &Item, counter: &CounterPath, by: i64) -> Result<AttributeValue, StoreError> {
    let current = match counter {
        CounterPath::Attribute(name) => item.get(*name),
        CounterPath::MapEntry { map, entry } => {
            let values = item
                .get(*map)
                .and_then(|value| value.as_m().ok())
                .ok_or_else(|| {
                    StoreError::InvalidRequest(format!(
                        "The document path provided in the update expression is invalid: {counter:?}"
                    ))
                })?;
            values.get(entry)
        }
    };
    let current = match current {
        None => 0,
        Some(value) => value
            .as_n()
            .ok()
            .and_then(|n| n.parse::<i64>().ok())
            .ok_or_else(|| {
                StoreError::InvalidRequest(format!(
                    "An operand in the update expression has an incorrect data type: {counter:?}"
                ))
            })?,
    };
    Ok(AttributeValue::N((current + by).to_string()))
}

fn apply_counter(item: &mut Item, counter: &CounterPath, value: AttributeValue) {
    match counter {
        CounterPath::Attribute(name) => {
            item.insert(name.to_string(), value);
        }
        CounterPath::MapEntry { map, entry } => {
            if let Some(AttributeValue::M(values)) = item.get_mut(*map) {
                values.insert(entry.clone(), value);
            }
        }
    }
}

#[async_trait]
impl ItemStore for InMemoryStore {
    async fn get_item(&self, key: &TableKey) -> Result<Option<Item>, StoreError> {
        let state = self.state.read().await;
        check_available(&state)?;
        Ok(state.table.get(key).cloned())
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryPage, StoreError> {
        let state = self.state.read().await;
        check_available(&state)?;
        if request.index == IndexTarget::InvertedIndex && state.backfilling {
            return Err(StoreError::BackfillPending {
                index: INVERTED_INDEX_NAME.to_string(),
            });
        }

        let mut rows = matching_rows(&state, request.index, &request.condition);
        if !request.scan_forward {
            rows.reverse();
        }

        let start = match &request.exclusive_start_key {
            Some(start_key) => {
                let start_key = key_of(start_key)?;
                rows.iter()
                    .position(|(key, _)| **key == start_key)
                    .map_or(rows.len(), |i| i + 1)
            }
            None => 0,
        };

        let limit = match (request.limit, state.page_size) {
            (Some(limit), Some(size)) => usize::try_from(limit).unwrap_or(0).min(size),
            (Some(limit), None) => usize::try_from(limit).unwrap_or(0),
            (None, Some(size)) => size,
            (None, None) => usize::MAX,
        };

        let page: Vec<_> = rows.iter().skip(start).take(limit).collect();
        let last_evaluated_key = if start + page.len() < rows.len() {
            page.last().map(|(key, _)| codec::key_to_item(key))
        } else {
            None
        };

        Ok(QueryPage {
            items: page.into_iter().map(|(_, item)| (*item).clone()).collect(),
            last_evaluated_key,
        })
    }

    async fn batch_get_items(&self, keys: &[TableKey]) -> Result<BatchGetOutput, StoreError> {
        let mut state = self.state.write().await;
        check_available(&state)?;
        if keys.len() > BATCH_GET_LIMIT {
            return Err(StoreError::InvalidRequest(format!(
                "Too many items requested for the BatchGetItem call: {}",
                keys.len()
            )));
        }
        state.batch_calls += 1;

        let mut output = BatchGetOutput::default();
        // Reverse order: callers must not rely on response position.
        for key in keys.iter().rev() {
            if state.deferred.contains(key) {
                output.unprocessed_keys.push(key.clone());
            } else if let Some(item) = state.table.get(key) {
                output.items.push(item.clone());
            }
        }
        Ok(output)
    }

    async fn transact_write_items(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        check_available(&state)?;

        let mut touched = HashSet::new();
        let mut planned = Vec::with_capacity(ops.len());

        for (operation, op) in ops.iter().enumerate() {
            match op {
                WriteOp::PutIfAbsent { item } => {
                    let key = key_of(item)?;
                    if !touched.insert(key.clone()) {
                        return Err(StoreError::InvalidRequest(
                            "Transaction request cannot include multiple operations on one item"
                                .to_string(),
                        ));
                    }
                    if state.table.contains_key(&key) {
                        return Err(StoreError::ConditionCheckFailed { operation });
                    }
                    planned.push((key, None));
                }
                WriteOp::Increment { key, counter, by } => {
                    if !touched.insert(key.clone()) {
                        return Err(StoreError::InvalidRequest(
                            "Transaction request cannot include multiple operations on one item"
                                .to_string(),
                        ));
                    }
                    let Some(existing) = state.table.get(key) else {
                        return Err(StoreError::ConditionCheckFailed { operation });
                    };
                    planned.push((key.clone(), Some(incremented(existing, counter, *by)?)));
                }
            }
        }

        // Every precondition holds; apply all operations.
        for ((key, value), op) in planned.into_iter().zip(ops) {
            match (op, value) {
                (WriteOp::PutIfAbsent { item }, _) => {
                    state.table.insert(key, item);
                }
                (WriteOp::Increment { counter, .. }, Some(value)) => {
                    if let Some(existing) = state.table.get_mut(&key) {
                        apply_counter(existing, &counter, value);
                    }
                }
                (WriteOp::Increment { .. }, None) => {}
            }
        }

        Ok(())
    }
}
