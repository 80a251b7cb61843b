mod error;
mod types;

pub use error::IdentifierError;
pub use types::{
    EnrichedFriendship, FollowDirection, Friendship, Photo, PhotoRef, PhotoWithReactions,
    Reaction, ReactionCounts, ReactionKind, Timestamp, User, UserWithPhotos, Username,
    TIMESTAMP_FORMAT,
};
