use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::IdentifierError;

/// Timestamp format used in keys and attributes.
///
/// Fixed-width, so lexicographic order of the formatted string equals
/// chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ============================================================================
// Identifiers
// ============================================================================

/// A validated username.
///
/// Usernames are embedded in partition and sort keys, so they may never be
/// empty or contain the `#` key delimiter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validates and wraps a username.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if value.is_empty() {
            return Err(IdentifierError::Empty { kind: "Username" });
        }
        if value.contains('#') {
            return Err(IdentifierError::ContainsDelimiter {
                kind: "Username",
                value,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Username {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Username {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A second-precision point in time, rendered as `YYYY-MM-DDTHH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Current UTC time, truncated to whole seconds.
    pub fn now() -> Self {
        Self(Utc::now().naive_utc().trunc_subsecs(0))
    }

    /// Parses a `YYYY-MM-DDTHH:MM:SS` string.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
            .map(Self)
            .map_err(|_| IdentifierError::InvalidTimestamp(value.to_string()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl FromStr for Timestamp {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.to_string()
    }
}

// ============================================================================
// Reactions
// ============================================================================

/// The closed set of reactions a user can leave on a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReactionKind {
    #[serde(rename = "+1")]
    PlusOne,
    #[serde(rename = "smiley")]
    Smiley,
    #[serde(rename = "sunglasses")]
    Sunglasses,
    #[serde(rename = "heart")]
    Heart,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 4] = [
        ReactionKind::PlusOne,
        ReactionKind::Smiley,
        ReactionKind::Sunglasses,
        ReactionKind::Heart,
    ];

    /// Returns the stored name of this reaction type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::PlusOne => "+1",
            ReactionKind::Smiley => "smiley",
            ReactionKind::Sunglasses => "sunglasses",
            ReactionKind::Heart => "heart",
        }
    }

    fn index(&self) -> usize {
        match self {
            ReactionKind::PlusOne => 0,
            ReactionKind::Smiley => 1,
            ReactionKind::Sunglasses => 2,
            ReactionKind::Heart => 3,
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReactionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| IdentifierError::UnknownReaction(s.to_string()))
    }
}

/// Per-photo reaction counters, one per [`ReactionKind`].
///
/// Kinds that were never reacted with count as zero, so a photo always
/// carries a full set of counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<ReactionKind, u64>",
    into = "BTreeMap<ReactionKind, u64>"
)]
pub struct ReactionCounts {
    counts: [u64; 4],
}

impl ReactionCounts {
    pub fn get(&self, kind: ReactionKind) -> u64 {
        self.counts[kind.index()]
    }

    pub fn set(&mut self, kind: ReactionKind, count: u64) {
        self.counts[kind.index()] = count;
    }

    pub fn with(mut self, kind: ReactionKind, count: u64) -> Self {
        self.set(kind, count);
        self
    }

    /// Iterates every reaction kind with its count, zeros included.
    pub fn iter(&self) -> impl Iterator<Item = (ReactionKind, u64)> + '_ {
        ReactionKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

impl From<BTreeMap<ReactionKind, u64>> for ReactionCounts {
    fn from(map: BTreeMap<ReactionKind, u64>) -> Self {
        map.into_iter()
            .fold(Self::default(), |counts, (kind, count)| counts.with(kind, count))
    }
}

impl From<ReactionCounts> for BTreeMap<ReactionKind, u64> {
    fn from(counts: ReactionCounts) -> Self {
        counts.iter().collect()
    }
}

// ============================================================================
// Entities
// ============================================================================

/// User metadata row: profile fields plus the derived follow counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: Username,
    pub name: Option<String>,
    pub email: Option<String>,
    pub birthdate: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub interests: Vec<String>,
    /// Number of users following this user.
    pub followers: u64,
    /// Number of users this user follows.
    pub following: u64,
    pub pinned_image: Option<String>,
    /// Ordered list of suggested usernames.
    pub recommended_friends: Vec<String>,
}

impl User {
    /// Creates a user with no profile fields and zeroed counters.
    pub fn new(username: Username) -> Self {
        Self {
            username,
            name: None,
            email: None,
            birthdate: None,
            address: None,
            status: None,
            interests: Vec::new(),
            followers: 0,
            following: 0,
            pinned_image: None,
            recommended_friends: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_pinned_image(mut self, pinned_image: impl Into<String>) -> Self {
        self.pinned_image = Some(pinned_image.into());
        self
    }

    pub fn with_recommended_friends(mut self, friends: Vec<String>) -> Self {
        self.recommended_friends = friends;
        self
    }
}

/// Identifies a photo by its owner and upload time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhotoRef {
    pub owner: Username,
    pub timestamp: Timestamp,
}

impl PhotoRef {
    pub fn new(owner: Username, timestamp: Timestamp) -> Self {
        Self { owner, timestamp }
    }
}

/// A photo row, child of its owner's partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub owner: Username,
    pub timestamp: Timestamp,
    pub location: Option<String>,
    pub reactions: ReactionCounts,
}

impl Photo {
    pub fn new(owner: Username, timestamp: Timestamp) -> Self {
        Self {
            owner,
            timestamp,
            location: None,
            reactions: ReactionCounts::default(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn photo_ref(&self) -> PhotoRef {
        PhotoRef::new(self.owner.clone(), self.timestamp)
    }
}

/// A single reaction event left by a user on a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub reacting_user: Username,
    pub kind: ReactionKind,
    pub photo: PhotoRef,
    /// When the reaction was recorded.
    pub timestamp: Timestamp,
}

/// A directed follow relationship: `following_user` follows `followed_user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    pub followed_user: Username,
    pub following_user: Username,
    pub timestamp: Timestamp,
}

impl Friendship {
    /// Returns the user on the other side of the edge when listing `direction`.
    ///
    /// Following lists are keyed by the follower, so the counterpart is the
    /// followed user; follower lists are the reverse.
    pub fn counterpart(&self, direction: FollowDirection) -> &Username {
        match direction {
            FollowDirection::Following => &self.followed_user,
            FollowDirection::Followers => &self.following_user,
        }
    }
}

/// Which side of the follow graph to list for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FollowDirection {
    /// Users following the given user.
    Followers,
    /// Users the given user follows.
    Following,
}

// ============================================================================
// Aggregates
// ============================================================================

/// User metadata together with every photo in the user's partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWithPhotos {
    pub user: User,
    /// Ascending by timestamp.
    pub photos: Vec<Photo>,
}

/// A photo together with every reaction left on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoWithReactions {
    pub photo: Photo,
    pub reactions: Vec<Reaction>,
}

/// A friendship edge joined with the metadata of the user on its far side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedFriendship {
    pub friendship: Friendship,
    pub user: User,
}
