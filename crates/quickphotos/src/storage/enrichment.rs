//! Batch enrichment of partially denormalized query results.
//!
//! Friendship edges carry only usernames. The metadata rows of the users on
//! the far side are fetched with BatchGetItem and joined back by key, never by
//! position, since the store returns batch results in arbitrary order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::try_join_all;
use quickphotos_core::social::{EnrichedFriendship, FollowDirection, Friendship, User};
use quickphotos_core::storage::{keys, RepositoryError, Result, TableKey};

use super::codec::{self, StoredEntity};
use super::store::{ItemStore, BATCH_GET_LIMIT};

pub struct BatchEnricher<S> {
    store: Arc<S>,
}

impl<S: ItemStore> BatchEnricher<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Joins each edge with the metadata of its counterpart in `direction`.
    ///
    /// Output order follows `edges`. If any counterpart cannot be fetched the
    /// whole call fails with `PartialBatchFailure`, carrying the users that were
    /// found and the keys that were not.
    pub async fn enrich(
        &self,
        edges: Vec<Friendship>,
        direction: FollowDirection,
    ) -> Result<Vec<EnrichedFriendship>> {
        let requested: Vec<TableKey> = edges
            .iter()
            .map(|edge| keys::user_key(edge.counterpart(direction)))
            .collect();

        let mut users = self.fetch_users(&requested).await?;

        let missing = dedup(&requested)
            .into_iter()
            .filter(|key| !users.contains_key(key))
            .collect::<Vec<_>>();

        if !missing.is_empty() {
            tracing::warn!(
                requested = requested.len(),
                missing = missing.len(),
                "batch enrichment incomplete"
            );
            let found = dedup(&requested)
                .into_iter()
                .filter_map(|key| users.remove(&key))
                .collect();
            return Err(RepositoryError::PartialBatchFailure { found, missing });
        }

        edges
            .into_iter()
            .zip(requested)
            .map(|(friendship, key)| {
                let user = users.get(&key).cloned().ok_or_else(|| {
                    RepositoryError::Decode(format!("No metadata returned for {key}"))
                })?;
                Ok(EnrichedFriendship { friendship, user })
            })
            .collect()
    }

    /// Fetches user metadata rows, keyed by their primary key.
    ///
    /// Duplicate keys are requested once. Requests are split into chunks of
    /// [`BATCH_GET_LIMIT`] and dispatched concurrently. Keys the store did not
    /// return are simply absent from the map.
    pub async fn fetch_users(&self, requested: &[TableKey]) -> Result<HashMap<TableKey, User>> {
        let unique = dedup(requested);
        if unique.is_empty() {
            return Ok(HashMap::new());
        }

        tracing::debug!(
            keys = unique.len(),
            chunks = unique.len().div_ceil(BATCH_GET_LIMIT),
            "batch_get_items"
        );

        let outputs = try_join_all(
            unique
                .chunks(BATCH_GET_LIMIT)
                .map(|chunk| self.store.batch_get_items(chunk)),
        )
        .await?;

        let mut users = HashMap::new();
        for output in outputs {
            if !output.unprocessed_keys.is_empty() {
                tracing::debug!(
                    unprocessed = output.unprocessed_keys.len(),
                    "store left keys unprocessed"
                );
            }
            for item in &output.items {
                match codec::decode(item)? {
                    StoredEntity::User(user) => {
                        users.insert(keys::user_key(&user.username), user);
                    }
                    other => {
                        return Err(RepositoryError::Decode(format!(
                            "Expected User metadata, got {} at {}",
                            other.entity_type(),
                            other.key()
                        )))
                    }
                }
            }
        }

        Ok(users)
    }
}

/// Removes duplicate keys, keeping first occurrences in order.
fn dedup(keys: &[TableKey]) -> Vec<TableKey> {
    let mut seen = HashSet::new();
    keys.iter()
        .filter(|key| seen.insert(*key))
        .cloned()
        .collect()
}
