//! Access-pattern descriptors.
//!
//! Each read path of the application maps to exactly one key-condition query,
//! either on the base table (`PK`, `SK`) or on the inverted index (`SK`, `PK`).
//! Range bounds are expressed as [`KeyRange`] values built here, so sentinel
//! strings never leak into call sites.

use serde::{Deserialize, Serialize};

use crate::social::{FollowDirection, PhotoRef, Username};

use super::keys;

/// Name of the inverted secondary index.
pub const INVERTED_INDEX_NAME: &str = "InvertedIndex";

pub const PK_ATTRIBUTE: &str = "PK";
pub const SK_ATTRIBUTE: &str = "SK";

/// Sorts after every `PHOTO#...` sort key.
pub const PHOTO_RANGE_SENTINEL: &str = "PHOTO$";
/// Sorts before every reaction partition key.
pub const REACTION_RANGE_START: &str = "REACTION#";
/// Sorts after every `USER#...` partition key.
pub const USER_RANGE_SENTINEL: &str = "USER$";
/// Sorts after every `#FRIEND#...` sort key.
pub const FRIEND_RANGE_SENTINEL: &str = "#FRIEND$";

/// Which key structure a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexTarget {
    /// Base table: hash `PK`, range `SK`.
    Table,
    /// Inverted index: hash `SK`, range `PK`.
    InvertedIndex,
}

impl IndexTarget {
    pub fn hash_attribute(&self) -> &'static str {
        match self {
            IndexTarget::Table => PK_ATTRIBUTE,
            IndexTarget::InvertedIndex => SK_ATTRIBUTE,
        }
    }

    pub fn range_attribute(&self) -> &'static str {
        match self {
            IndexTarget::Table => SK_ATTRIBUTE,
            IndexTarget::InvertedIndex => PK_ATTRIBUTE,
        }
    }
}

/// A range over the range attribute: inclusive lower bound, exclusive upper sentinel.
///
/// The upper bound is a sentinel that can never be a stored key, so an
/// inclusive `BETWEEN` on the store behaves as a half-open range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    pub lower: String,
    pub upper_exclusive_sentinel: String,
}

impl KeyRange {
    pub fn new(lower: impl Into<String>, upper_exclusive_sentinel: impl Into<String>) -> Self {
        Self {
            lower: lower.into(),
            upper_exclusive_sentinel: upper_exclusive_sentinel.into(),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        value >= self.lower.as_str() && value < self.upper_exclusive_sentinel.as_str()
    }

    /// User metadata followed by every photo in the user's partition.
    ///
    /// `[#METADATA#<username>, PHOTO$)`
    pub fn user_with_photos(username: &Username) -> Self {
        Self::new(keys::user_metadata_sk(username), PHOTO_RANGE_SENTINEL)
    }

    /// Every reaction partition plus the owning user's partition.
    ///
    /// `[REACTION#, USER$)`
    pub fn photo_with_reactions() -> Self {
        Self::new(REACTION_RANGE_START, USER_RANGE_SENTINEL)
    }

    /// Every friendship edge in a user's partition.
    ///
    /// `[#FRIEND#, #FRIEND$)`
    pub fn friendship_edges() -> Self {
        Self::new(keys::FRIEND_PREFIX, FRIEND_RANGE_SENTINEL)
    }
}

/// Exact match on the hash attribute, optionally narrowed by a range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCondition {
    pub partition: String,
    pub range: Option<KeyRange>,
}

/// A fully described key-condition query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuerySpec {
    pub index: IndexTarget,
    pub condition: KeyCondition,
    pub scan_forward: bool,
    /// Whether the caller must reverse the store order to get the logical order.
    pub reverse_results: bool,
}

/// The fixed read paths this layer supports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessPattern {
    UserWithPhotos(Username),
    PhotoWithReactions(PhotoRef),
    Connections {
        username: Username,
        direction: FollowDirection,
    },
}

impl AccessPattern {
    /// Translates this access pattern into its key-condition query.
    pub fn query_spec(&self) -> QuerySpec {
        match self {
            AccessPattern::UserWithPhotos(username) => QuerySpec {
                index: IndexTarget::Table,
                condition: KeyCondition {
                    partition: keys::user_pk(username),
                    range: Some(KeyRange::user_with_photos(username)),
                },
                scan_forward: true,
                reverse_results: false,
            },
            // The photo row's partition (USER#...) sorts after every REACTION#
            // partition, so the ascending result ends with the photo.
            AccessPattern::PhotoWithReactions(photo) => QuerySpec {
                index: IndexTarget::InvertedIndex,
                condition: KeyCondition {
                    partition: keys::photo_sk(photo),
                    range: Some(KeyRange::photo_with_reactions()),
                },
                scan_forward: true,
                reverse_results: true,
            },
            AccessPattern::Connections {
                username,
                direction: FollowDirection::Following,
            } => QuerySpec {
                index: IndexTarget::InvertedIndex,
                condition: KeyCondition {
                    partition: keys::friend_sk(username),
                    range: None,
                },
                scan_forward: true,
                reverse_results: false,
            },
            AccessPattern::Connections {
                username,
                direction: FollowDirection::Followers,
            } => QuerySpec {
                index: IndexTarget::Table,
                condition: KeyCondition {
                    partition: keys::user_pk(username),
                    range: Some(KeyRange::friendship_edges()),
                },
                scan_forward: true,
                reverse_results: false,
            },
        }
    }

    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            AccessPattern::UserWithPhotos(_) => "user_with_photos",
            AccessPattern::PhotoWithReactions(_) => "photo_with_reactions",
            AccessPattern::Connections {
                direction: FollowDirection::Following,
                ..
            } => "following",
            AccessPattern::Connections {
                direction: FollowDirection::Followers,
                ..
            } => "followers",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::{ReactionKind, Timestamp};

    fn username(value: &str) -> Username {
        Username::parse(value).unwrap()
    }

    fn photo() -> PhotoRef {
        PhotoRef::new(
            username("ppierce"),
            Timestamp::parse("2019-04-14T08:09:34").unwrap(),
        )
    }

    #[test]
    fn test_user_with_photos_spec() {
        let spec = AccessPattern::UserWithPhotos(username("jacksonjason")).query_spec();

        assert_eq!(spec.index, IndexTarget::Table);
        assert_eq!(spec.condition.partition, "USER#jacksonjason");
        assert_eq!(
            spec.condition.range,
            Some(KeyRange::new("#METADATA#jacksonjason", "PHOTO$"))
        );
        assert!(spec.scan_forward);
        assert!(!spec.reverse_results);
    }

    #[test]
    fn test_photo_with_reactions_spec() {
        let spec = AccessPattern::PhotoWithReactions(photo()).query_spec();

        assert_eq!(spec.index, IndexTarget::InvertedIndex);
        assert_eq!(spec.condition.partition, "PHOTO#ppierce#2019-04-14T08:09:34");
        assert_eq!(
            spec.condition.range,
            Some(KeyRange::new("REACTION#", "USER$"))
        );
        assert!(spec.reverse_results);
    }

    #[test]
    fn test_following_spec_is_exact_match_on_index() {
        let spec = AccessPattern::Connections {
            username: username("haroldwatkins"),
            direction: FollowDirection::Following,
        }
        .query_spec();

        assert_eq!(spec.index, IndexTarget::InvertedIndex);
        assert_eq!(spec.condition.partition, "#FRIEND#haroldwatkins");
        assert_eq!(spec.condition.range, None);
    }

    #[test]
    fn test_followers_spec_uses_base_table() {
        let spec = AccessPattern::Connections {
            username: username("haroldwatkins"),
            direction: FollowDirection::Followers,
        }
        .query_spec();

        assert_eq!(spec.index, IndexTarget::Table);
        assert_eq!(spec.condition.partition, "USER#haroldwatkins");
        assert_eq!(
            spec.condition.range,
            Some(KeyRange::new("#FRIEND#", "#FRIEND$"))
        );
    }

    #[test]
    fn test_user_range_excludes_friend_edges() {
        let user = username("haroldwatkins");
        let range = KeyRange::user_with_photos(&user);

        assert!(range.contains(&keys::user_metadata_sk(&user)));
        assert!(range.contains(&keys::photo_sk(&PhotoRef::new(
            user.clone(),
            Timestamp::parse("2019-01-01T00:00:00").unwrap()
        ))));
        assert!(!range.contains(&keys::friend_sk(&username("someone"))));
        assert!(!range.contains(PHOTO_RANGE_SENTINEL));
    }

    #[test]
    fn test_photo_range_covers_reactions_and_owner() {
        let range = KeyRange::photo_with_reactions();

        assert!(range.contains(&keys::reaction_pk(&username("a"), ReactionKind::Heart)));
        assert!(range.contains(&keys::user_pk(&username("ppierce"))));
        assert!(!range.contains("ZZZ"));
    }

    #[test]
    fn test_index_target_attributes() {
        assert_eq!(IndexTarget::Table.hash_attribute(), "PK");
        assert_eq!(IndexTarget::Table.range_attribute(), "SK");
        assert_eq!(IndexTarget::InvertedIndex.hash_attribute(), "SK");
        assert_eq!(IndexTarget::InvertedIndex.range_attribute(), "PK");
    }
}
