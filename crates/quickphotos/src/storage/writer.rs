//! Transactional writer: fixed multi-item write recipes.
//!
//! Each recipe inserts one fact row guarded by a not-exists precondition and
//! increments the counters that fact justifies, in a single
//! TransactWriteItems call. Either everything commits or nothing does.

use std::sync::Arc;

use quickphotos_core::social::{Friendship, PhotoRef, Reaction, ReactionKind, Timestamp, Username};
use quickphotos_core::storage::{keys, RepositoryError, Result, StoreError};

use super::codec::{self, StoredEntity, ATTR_FOLLOWERS, ATTR_FOLLOWING, ATTR_REACTIONS};
use super::store::{CounterPath, ItemStore, WriteOp};

/// The write recipes this layer supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRecipe {
    AddReaction {
        reacting_user: Username,
        kind: ReactionKind,
        photo: PhotoRef,
    },
    FollowUser {
        followed_user: Username,
        following_user: Username,
    },
}

impl WriteRecipe {
    pub fn name(&self) -> &'static str {
        match self {
            WriteRecipe::AddReaction { .. } => "add_reaction",
            WriteRecipe::FollowUser { .. } => "follow_user",
        }
    }

    /// Builds the fact row created at `now` and the operations that commit it.
    ///
    /// Operation 0 is always the guarded insert; the increments follow.
    pub fn plan(&self, now: Timestamp) -> Result<(StoredEntity, Vec<WriteOp>)> {
        match self {
            WriteRecipe::AddReaction {
                reacting_user,
                kind,
                photo,
            } => {
                let reaction = StoredEntity::Reaction(Reaction {
                    reacting_user: reacting_user.clone(),
                    kind: *kind,
                    photo: photo.clone(),
                    timestamp: now,
                });
                let ops = vec![
                    WriteOp::PutIfAbsent {
                        item: codec::encode(&reaction),
                    },
                    WriteOp::Increment {
                        key: keys::photo_key(photo),
                        counter: CounterPath::MapEntry {
                            map: ATTR_REACTIONS,
                            entry: kind.as_str().to_string(),
                        },
                        by: 1,
                    },
                ];
                Ok((reaction, ops))
            }
            WriteRecipe::FollowUser {
                followed_user,
                following_user,
            } => {
                if followed_user == following_user {
                    return Err(RepositoryError::InvalidRequest(format!(
                        "{following_user} cannot follow themselves"
                    )));
                }
                let edge = StoredEntity::Friendship(Friendship {
                    followed_user: followed_user.clone(),
                    following_user: following_user.clone(),
                    timestamp: now,
                });
                let ops = vec![
                    WriteOp::PutIfAbsent {
                        item: codec::encode(&edge),
                    },
                    WriteOp::Increment {
                        key: keys::user_key(followed_user),
                        counter: CounterPath::Attribute(ATTR_FOLLOWERS),
                        by: 1,
                    },
                    WriteOp::Increment {
                        key: keys::user_key(following_user),
                        counter: CounterPath::Attribute(ATTR_FOLLOWING),
                        by: 1,
                    },
                ];
                Ok((edge, ops))
            }
        }
    }

    /// Translates a failed precondition on `operation` into a domain error.
    pub fn condition_failure(&self, operation: usize) -> RepositoryError {
        match (self, operation) {
            (
                WriteRecipe::AddReaction {
                    reacting_user,
                    kind,
                    photo,
                },
                0,
            ) => RepositoryError::AlreadyReacted {
                reacting_user: reacting_user.to_string(),
                reaction: kind.to_string(),
                photo: keys::photo_sk(photo),
            },
            (WriteRecipe::AddReaction { photo, .. }, 1) => RepositoryError::NotFound {
                entity_type: "Photo",
                id: keys::photo_sk(photo),
            },
            (
                WriteRecipe::FollowUser {
                    followed_user,
                    following_user,
                },
                0,
            ) => RepositoryError::AlreadyFollowing {
                followed_user: followed_user.to_string(),
                following_user: following_user.to_string(),
            },
            (WriteRecipe::FollowUser { followed_user, .. }, 1) => RepositoryError::NotFound {
                entity_type: "User",
                id: followed_user.to_string(),
            },
            (WriteRecipe::FollowUser { following_user, .. }, 2) => RepositoryError::NotFound {
                entity_type: "User",
                id: following_user.to_string(),
            },
            (_, operation) => RepositoryError::TransactionCancelled { operation },
        }
    }
}

/// Executes [`WriteRecipe`]s as single atomic store transactions.
pub struct TransactionalWriter<S> {
    store: Arc<S>,
}

impl<S: ItemStore> TransactionalWriter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn add_reaction(
        &self,
        reacting_user: &Username,
        kind: ReactionKind,
        photo: &PhotoRef,
    ) -> Result<Reaction> {
        let recipe = WriteRecipe::AddReaction {
            reacting_user: reacting_user.clone(),
            kind,
            photo: photo.clone(),
        };
        match self.execute(&recipe, Timestamp::now()).await? {
            StoredEntity::Reaction(reaction) => Ok(reaction),
            other => Err(RepositoryError::Decode(format!(
                "add_reaction produced a {}",
                other.entity_type()
            ))),
        }
    }

    pub async fn follow_user(
        &self,
        followed_user: &Username,
        following_user: &Username,
    ) -> Result<Friendship> {
        let recipe = WriteRecipe::FollowUser {
            followed_user: followed_user.clone(),
            following_user: following_user.clone(),
        };
        match self.execute(&recipe, Timestamp::now()).await? {
            StoredEntity::Friendship(edge) => Ok(edge),
            other => Err(RepositoryError::Decode(format!(
                "follow_user produced a {}",
                other.entity_type()
            ))),
        }
    }

    /// Commits `recipe` and returns the fact row it created.
    pub async fn execute(&self, recipe: &WriteRecipe, now: Timestamp) -> Result<StoredEntity> {
        let (entity, ops) = recipe.plan(now)?;
        let key = entity.key();

        tracing::debug!(
            recipe = recipe.name(),
            key = %key,
            operations = ops.len(),
            "transact_write_items"
        );

        match self.store.transact_write_items(ops).await {
            Ok(()) => {
                tracing::info!(recipe = recipe.name(), key = %key, "transaction committed");
                Ok(entity)
            }
            Err(StoreError::ConditionCheckFailed { operation }) => {
                let err = recipe.condition_failure(operation);
                tracing::debug!(recipe = recipe.name(), operation, error = %err, "precondition failed");
                Err(err)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn username(value: &str) -> Username {
        Username::parse(value).unwrap()
    }

    fn timestamp(value: &str) -> Timestamp {
        Timestamp::parse(value).unwrap()
    }

    fn photo() -> PhotoRef {
        PhotoRef::new(username("ppierce"), timestamp("2019-04-14T08:09:34"))
    }

    fn add_reaction() -> WriteRecipe {
        WriteRecipe::AddReaction {
            reacting_user: username("kennedyheather"),
            kind: ReactionKind::Sunglasses,
            photo: photo(),
        }
    }

    fn follow() -> WriteRecipe {
        WriteRecipe::FollowUser {
            followed_user: username("tmartinez"),
            following_user: username("john42"),
        }
    }

    #[test]
    fn test_add_reaction_plan() {
        let now = timestamp("2020-01-01T10:00:00");
        let (entity, ops) = add_reaction().plan(now).unwrap();

        assert_eq!(
            entity.key(),
            keys::reaction_key(&username("kennedyheather"), ReactionKind::Sunglasses, &photo())
        );
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], WriteOp::PutIfAbsent { .. }));
        assert_eq!(
            ops[1],
            WriteOp::Increment {
                key: keys::photo_key(&photo()),
                counter: CounterPath::MapEntry {
                    map: "reactions",
                    entry: "sunglasses".to_string(),
                },
                by: 1,
            }
        );
    }

    #[test]
    fn test_follow_user_plan() {
        let (entity, ops) = follow().plan(timestamp("2020-01-01T10:00:00")).unwrap();

        assert_eq!(entity.key().sk, "#FRIEND#john42");
        assert_eq!(ops.len(), 3);
        assert_eq!(
            ops[1],
            WriteOp::Increment {
                key: keys::user_key(&username("tmartinez")),
                counter: CounterPath::Attribute("followers"),
                by: 1,
            }
        );
        assert_eq!(
            ops[2],
            WriteOp::Increment {
                key: keys::user_key(&username("john42")),
                counter: CounterPath::Attribute("following"),
                by: 1,
            }
        );
    }

    #[test]
    fn test_self_follow_is_rejected() {
        let recipe = WriteRecipe::FollowUser {
            followed_user: username("john42"),
            following_user: username("john42"),
        };

        assert!(matches!(
            recipe.plan(Timestamp::now()),
            Err(RepositoryError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_condition_failure_mapping() {
        assert!(add_reaction().condition_failure(0).is_precondition_failure());
        assert_eq!(
            add_reaction().condition_failure(1),
            RepositoryError::NotFound {
                entity_type: "Photo",
                id: "PHOTO#ppierce#2019-04-14T08:09:34".to_string(),
            }
        );
        assert_eq!(
            follow().condition_failure(0),
            RepositoryError::AlreadyFollowing {
                followed_user: "tmartinez".to_string(),
                following_user: "john42".to_string(),
            }
        );
        assert_eq!(
            follow().condition_failure(2),
            RepositoryError::NotFound {
                entity_type: "User",
                id: "john42".to_string(),
            }
        );
        assert_eq!(
            follow().condition_failure(5),
            RepositoryError::TransactionCancelled { operation: 5 }
        );
    }

    #[cfg(feature = "inmemory")]
    mod with_store {
        use super::*;
        use crate::storage::inmemory::InMemoryStore;
        use aws_sdk_dynamodb::types::AttributeValue;
        use quickphotos_core::social::{Photo, User};

        async fn seeded_store() -> Arc<InMemoryStore> {
            let store = InMemoryStore::new();
            for name in ["tmartinez", "john42", "kennedyheather", "ppierce"] {
                store
                    .seed(StoredEntity::User(User::new(username(name))))
                    .await;
            }
            store
                .seed(StoredEntity::Photo(Photo::new(
                    username("ppierce"),
                    timestamp("2019-04-14T08:09:34"),
                )))
                .await;
            Arc::new(store)
        }

        async fn load_user(store: &InMemoryStore, name: &str) -> User {
            let item = store
                .get_item(&keys::user_key(&username(name)))
                .await
                .unwrap()
                .unwrap();
            codec::item_to_user(&item).unwrap()
        }

        async fn load_photo(store: &InMemoryStore) -> Photo {
            let item = store
                .get_item(&keys::photo_key(&photo()))
                .await
                .unwrap()
                .unwrap();
            codec::item_to_photo(&item).unwrap()
        }

        #[tokio::test]
        async fn test_add_reaction_twice_increments_once() {
            let store = seeded_store().await;
            let writer = TransactionalWriter::new(store.clone());
            let reactor = username("kennedyheather");

            let reaction = writer
                .add_reaction(&reactor, ReactionKind::Sunglasses, &photo())
                .await
                .unwrap();
            assert_eq!(reaction.kind, ReactionKind::Sunglasses);
            assert_eq!(load_photo(&store).await.reactions.get(ReactionKind::Sunglasses), 1);

            let err = writer
                .add_reaction(&reactor, ReactionKind::Sunglasses, &photo())
                .await
                .unwrap_err();
            assert!(matches!(err, RepositoryError::AlreadyReacted { .. }));
            assert_eq!(load_photo(&store).await.reactions.get(ReactionKind::Sunglasses), 1);
        }

        #[tokio::test]
        async fn test_different_reaction_types_count_separately() {
            let store = seeded_store().await;
            let writer = TransactionalWriter::new(store.clone());
            let reactor = username("kennedyheather");

            writer
                .add_reaction(&reactor, ReactionKind::PlusOne, &photo())
                .await
                .unwrap();
            writer
                .add_reaction(&reactor, ReactionKind::Heart, &photo())
                .await
                .unwrap();

            let counts = load_photo(&store).await.reactions;
            assert_eq!(counts.get(ReactionKind::PlusOne), 1);
            assert_eq!(counts.get(ReactionKind::Heart), 1);
            assert_eq!(counts.total(), 2);
        }

        #[tokio::test]
        async fn test_add_reaction_to_missing_photo_writes_nothing() {
            let store = seeded_store().await;
            let writer = TransactionalWriter::new(store.clone());
            let missing = PhotoRef::new(username("ppierce"), timestamp("2000-01-01T00:00:00"));

            let err = writer
                .add_reaction(&username("kennedyheather"), ReactionKind::Heart, &missing)
                .await
                .unwrap_err();

            assert!(matches!(
                err,
                RepositoryError::NotFound {
                    entity_type: "Photo",
                    ..
                }
            ));
            let reaction_key =
                keys::reaction_key(&username("kennedyheather"), ReactionKind::Heart, &missing);
            assert_eq!(store.get_item(&reaction_key).await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_follow_user_updates_both_counters() {
            let store = seeded_store().await;
            let writer = TransactionalWriter::new(store.clone());

            let edge = writer
                .follow_user(&username("tmartinez"), &username("john42"))
                .await
                .unwrap();
            assert_eq!(edge.followed_user.as_str(), "tmartinez");

            assert_eq!(load_user(&store, "tmartinez").await.followers, 1);
            assert_eq!(load_user(&store, "tmartinez").await.following, 0);
            assert_eq!(load_user(&store, "john42").await.following, 1);
            assert_eq!(load_user(&store, "john42").await.followers, 0);
        }

        #[tokio::test]
        async fn test_follow_user_twice_leaves_counters_unchanged() {
            let store = seeded_store().await;
            let writer = TransactionalWriter::new(store.clone());
            let (followed, following) = (username("tmartinez"), username("john42"));

            writer.follow_user(&followed, &following).await.unwrap();
            let err = writer.follow_user(&followed, &following).await.unwrap_err();

            assert!(matches!(err, RepositoryError::AlreadyFollowing { .. }));
            assert!(err.is_precondition_failure());
            assert_eq!(load_user(&store, "tmartinez").await.followers, 1);
            assert_eq!(load_user(&store, "john42").await.following, 1);
        }

        #[tokio::test]
        async fn test_follow_missing_user_writes_nothing() {
            let store = seeded_store().await;
            let writer = TransactionalWriter::new(store.clone());

            let err = writer
                .follow_user(&username("tmartinez"), &username("ghost"))
                .await
                .unwrap_err();

            assert_eq!(
                err,
                RepositoryError::NotFound {
                    entity_type: "User",
                    id: "ghost".to_string(),
                }
            );
            assert_eq!(load_user(&store, "tmartinez").await.followers, 0);
            let edge_key = keys::friendship_key(&username("tmartinez"), &username("ghost"));
            assert_eq!(store.get_item(&edge_key).await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_add_reaction_creates_absent_map_entry() {
            let store = seeded_store().await;
            let mut item = codec::photo_to_item(&load_photo(&store).await);
            if let Some(AttributeValue::M(counts)) = item.get_mut(ATTR_REACTIONS) {
                counts.remove("heart");
            }
            store.put_item(item).await.unwrap();
            assert_eq!(load_photo(&store).await.reactions.get(ReactionKind::Heart), 0);

            let writer = TransactionalWriter::new(store.clone());
            writer
                .add_reaction(&username("kennedyheather"), ReactionKind::Heart, &photo())
                .await
                .unwrap();

            assert_eq!(load_photo(&store).await.reactions.get(ReactionKind::Heart), 1);
        }

        #[tokio::test]
        async fn test_follow_user_without_stored_counter() {
            let store = seeded_store().await;
            let mut item = codec::user_to_item(&load_user(&store, "tmartinez").await);
            item.remove(ATTR_FOLLOWERS);
            store.put_item(item).await.unwrap();

            let writer = TransactionalWriter::new(store.clone());
            writer
                .follow_user(&username("tmartinez"), &username("john42"))
                .await
                .unwrap();

            assert_eq!(load_user(&store, "tmartinez").await.followers, 1);
            assert_eq!(load_user(&store, "john42").await.following, 1);
        }

        #[tokio::test]
        async fn test_store_unavailable_is_retryable() {
            let store = seeded_store().await;
            store.set_unavailable(true).await;
            let writer = TransactionalWriter::new(store);

            let err = writer
                .follow_user(&username("tmartinez"), &username("john42"))
                .await
                .unwrap_err();
            assert!(err.is_retryable());
        }
    }
}
