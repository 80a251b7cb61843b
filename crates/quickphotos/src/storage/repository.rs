//! Repository facade over any [`ItemStore`].

use std::sync::Arc;

use async_trait::async_trait;
use quickphotos_core::social::{
    EnrichedFriendship, FollowDirection, Friendship, PhotoRef, PhotoWithReactions, Reaction,
    ReactionKind, User, UserWithPhotos, Username,
};
use quickphotos_core::storage::{Result, SocialRepository};

use super::enrichment::BatchEnricher;
use super::planner::{self, QueryPlanner};
use super::store::ItemStore;
use super::writer::TransactionalWriter;

/// Wires the planner, enrichment and writer to one shared store.
pub struct Repository<S> {
    planner: QueryPlanner<S>,
    enricher: BatchEnricher<S>,
    writer: TransactionalWriter<S>,
}

impl<S: ItemStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    pub fn from_arc(store: Arc<S>) -> Self {
        Self {
            planner: QueryPlanner::new(store.clone()),
            enricher: BatchEnricher::new(store.clone()),
            writer: TransactionalWriter::new(store),
        }
    }

    /// Gets a user's metadata row without their photos.
    pub async fn fetch_user(&self, username: &Username) -> Result<Option<User>> {
        self.planner.fetch_user(username).await
    }
}

#[async_trait]
impl<S: ItemStore> SocialRepository for Repository<S> {
    async fn fetch_user_with_photos(&self, username: &Username) -> Result<UserWithPhotos> {
        let entities = self.planner.fetch_user_with_photos(username).await?;
        planner::hydrate_user_with_photos(username, entities)
    }

    async fn fetch_photo_with_reactions(
        &self,
        photo: &PhotoRef,
    ) -> Result<Option<PhotoWithReactions>> {
        let entities = self.planner.fetch_photo_with_reactions(photo).await?;
        planner::hydrate_photo_with_reactions(entities)
    }

    async fn fetch_connections(
        &self,
        username: &Username,
        direction: FollowDirection,
    ) -> Result<Vec<Friendship>> {
        let entities = self
            .planner
            .fetch_followers_or_following(username, direction)
            .await?;
        planner::hydrate_friendships(entities)
    }

    async fn fetch_connections_enriched(
        &self,
        username: &Username,
        direction: FollowDirection,
    ) -> Result<Vec<EnrichedFriendship>> {
        let edges = self.fetch_connections(username, direction).await?;
        self.enricher.enrich(edges, direction).await
    }

    async fn add_reaction(
        &self,
        reacting_user: &Username,
        kind: ReactionKind,
        photo: &PhotoRef,
    ) -> Result<Reaction> {
        self.writer.add_reaction(reacting_user, kind, photo).await
    }

    async fn follow_user(
        &self,
        followed_user: &Username,
        following_user: &Username,
    ) -> Result<Friendship> {
        self.writer.follow_user(followed_user, following_user).await
    }
}
