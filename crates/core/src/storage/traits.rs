use async_trait::async_trait;

use crate::social::{
    EnrichedFriendship, FollowDirection, Friendship, PhotoRef, PhotoWithReactions, Reaction,
    ReactionKind, UserWithPhotos, Username,
};

use super::Result;

/// Read and write paths of the photo-sharing application.
///
/// Implementations perform no implicit retries; check
/// [`RepositoryError::is_retryable`](super::RepositoryError::is_retryable)
/// before trying again.
#[async_trait]
pub trait SocialRepository: Send + Sync {
    /// Gets a user's metadata together with all of their photos, oldest first.
    ///
    /// Returns `NotFound` when the user has no rows at all.
    async fn fetch_user_with_photos(&self, username: &Username) -> Result<UserWithPhotos>;

    /// Gets a photo followed by every reaction left on it.
    async fn fetch_photo_with_reactions(
        &self,
        photo: &PhotoRef,
    ) -> Result<Option<PhotoWithReactions>>;

    /// Lists friendship edges on one side of a user's follow graph.
    async fn fetch_connections(
        &self,
        username: &Username,
        direction: FollowDirection,
    ) -> Result<Vec<Friendship>>;

    /// Lists friendship edges joined with the metadata of the user on the far side.
    async fn fetch_connections_enriched(
        &self,
        username: &Username,
        direction: FollowDirection,
    ) -> Result<Vec<EnrichedFriendship>>;

    /// Records a reaction and bumps the photo's counter in one transaction.
    async fn add_reaction(
        &self,
        reacting_user: &Username,
        kind: ReactionKind,
        photo: &PhotoRef,
    ) -> Result<Reaction>;

    /// Creates a follow edge and bumps both users' counters in one transaction.
    async fn follow_user(
        &self,
        followed_user: &Username,
        following_user: &Username,
    ) -> Result<Friendship>;
}
