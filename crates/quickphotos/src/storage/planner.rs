//! Query planner: one store query per access pattern.
//!
//! Each fetch follows pagination to the end, then hands out an [`EntityIter`]
//! that decodes items lazily in logical order. The `hydrate_*` functions fold
//! such a sequence into the typed aggregates.

use std::sync::Arc;

use quickphotos_core::social::{
    FollowDirection, Friendship, PhotoRef, PhotoWithReactions, User, UserWithPhotos, Username,
};
use quickphotos_core::storage::{keys, AccessPattern, RepositoryError, Result};

use super::codec::{self, StoredEntity};
use super::store::{Item, ItemStore, QueryRequest};

/// A finite, single-pass sequence of decoded entities.
///
/// Items are decoded as they are pulled, so a malformed row surfaces as an
/// `Err` at its position without affecting the rows before it.
#[derive(Debug)]
pub struct EntityIter {
    items: std::vec::IntoIter<Item>,
}

impl EntityIter {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl Iterator for EntityIter {
    type Item = Result<StoredEntity>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next().map(|item| codec::decode(&item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl ExactSizeIterator for EntityIter {}

/// Runs the fixed access patterns against an [`ItemStore`].
pub struct QueryPlanner<S> {
    store: Arc<S>,
}

impl<S: ItemStore> QueryPlanner<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Metadata row first, then photos in ascending timestamp order.
    pub async fn fetch_user_with_photos(&self, username: &Username) -> Result<EntityIter> {
        self.run(&AccessPattern::UserWithPhotos(username.clone()))
            .await
    }

    /// Photo row first, then its reactions.
    pub async fn fetch_photo_with_reactions(&self, photo: &PhotoRef) -> Result<EntityIter> {
        self.run(&AccessPattern::PhotoWithReactions(photo.clone()))
            .await
    }

    /// Every friendship edge on one side of a user's follow graph.
    pub async fn fetch_followers_or_following(
        &self,
        username: &Username,
        direction: FollowDirection,
    ) -> Result<EntityIter> {
        self.run(&AccessPattern::Connections {
            username: username.clone(),
            direction,
        })
        .await
    }

    /// Point lookup of a user's metadata row.
    pub async fn fetch_user(&self, username: &Username) -> Result<Option<User>> {
        let key = keys::user_key(username);
        tracing::debug!(key = %key, "get_item");

        match self.store.get_item(&key).await? {
            Some(item) => Ok(Some(codec::item_to_user(&item)?)),
            None => Ok(None),
        }
    }

    async fn run(&self, pattern: &AccessPattern) -> Result<EntityIter> {
        let spec = pattern.query_spec();
        let mut items = Vec::new();
        let mut start_key = None;
        let mut pages = 0usize;

        loop {
            let request = QueryRequest::new(spec.index, spec.condition.clone(), spec.scan_forward)
                .with_start_key(start_key.take());
            let page = self.store.query(request).await?;
            pages += 1;
            items.extend(page.items);

            match page.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }

        if spec.reverse_results {
            items.reverse();
        }

        tracing::debug!(
            pattern = pattern.name(),
            partition = %spec.condition.partition,
            pages,
            items = items.len(),
            "query completed"
        );

        Ok(EntityIter::new(items))
    }
}

// ============================================================================
// Hydration
// ============================================================================

fn unexpected(entity: &StoredEntity, context: &str) -> RepositoryError {
    RepositoryError::Decode(format!(
        "Unexpected {} {} in {context} result",
        entity.entity_type(),
        entity.key()
    ))
}

/// Folds a user-with-photos sequence into its aggregate.
///
/// A sequence without a leading metadata row means the user does not exist.
pub fn hydrate_user_with_photos(
    username: &Username,
    mut entities: impl Iterator<Item = Result<StoredEntity>>,
) -> Result<UserWithPhotos> {
    let user = match entities.next().transpose()? {
        Some(StoredEntity::User(user)) => user,
        _ => {
            return Err(RepositoryError::NotFound {
                entity_type: "User",
                id: username.to_string(),
            })
        }
    };

    let photos = entities
        .map(|entity| match entity? {
            StoredEntity::Photo(photo) => Ok(photo),
            other => Err(unexpected(&other, "user-with-photos")),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(UserWithPhotos { user, photos })
}

/// Folds a photo-with-reactions sequence into its aggregate.
///
/// Returns `None` when the photo row itself is absent.
pub fn hydrate_photo_with_reactions(
    mut entities: impl Iterator<Item = Result<StoredEntity>>,
) -> Result<Option<PhotoWithReactions>> {
    let photo = match entities.next().transpose()? {
        Some(StoredEntity::Photo(photo)) => photo,
        _ => return Ok(None),
    };

    let reactions = entities
        .map(|entity| match entity? {
            StoredEntity::Reaction(reaction) => Ok(reaction),
            other => Err(unexpected(&other, "photo-with-reactions")),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(PhotoWithReactions { photo, reactions }))
}

pub fn hydrate_friendships(
    entities: impl Iterator<Item = Result<StoredEntity>>,
) -> Result<Vec<Friendship>> {
    entities
        .map(|entity| match entity? {
            StoredEntity::Friendship(edge) => Ok(edge),
            other => Err(unexpected(&other, "connections")),
        })
        .collect()
}
