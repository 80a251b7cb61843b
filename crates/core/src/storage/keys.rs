//! Single-table key generation and parsing.
//!
//! Pure functions for building partition and sort keys for every entity type,
//! and for recovering the entity identity from a stored key pair. Identifiers
//! are validated types (see [`Username`]), so encoding cannot fail; parsing a
//! foreign key pair can.
//!
//! | Entity     | PK                              | SK                          |
//! |------------|---------------------------------|-----------------------------|
//! | User       | `USER#<username>`               | `#METADATA#<username>`      |
//! | Photo      | `USER#<owner>`                  | `PHOTO#<owner>#<timestamp>` |
//! | Reaction   | `REACTION#<user>#<type>`        | `PHOTO#<owner>#<timestamp>` |
//! | Friendship | `USER#<followed>`               | `#FRIEND#<following>`       |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::social::{IdentifierError, PhotoRef, ReactionKind, Timestamp, Username};

// ============================================================================
// Key prefixes
// ============================================================================

pub const DELIMITER: char = '#';
pub const USER_PREFIX: &str = "USER#";
pub const METADATA_PREFIX: &str = "#METADATA#";
pub const PHOTO_PREFIX: &str = "PHOTO#";
pub const REACTION_PREFIX: &str = "REACTION#";
pub const FRIEND_PREFIX: &str = "#FRIEND#";

/// A primary key: partition key plus sort key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableKey {
    pub pk: String,
    pub sk: String,
}

impl TableKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.pk, self.sk)
    }
}

// ============================================================================
// User keys
// ============================================================================

/// Pattern: `USER#<username>`
pub fn user_pk(username: &Username) -> String {
    format!("{USER_PREFIX}{username}")
}

/// Pattern: `#METADATA#<username>`
pub fn user_metadata_sk(username: &Username) -> String {
    format!("{METADATA_PREFIX}{username}")
}

pub fn user_key(username: &Username) -> TableKey {
    TableKey::new(user_pk(username), user_metadata_sk(username))
}

// ============================================================================
// Photo keys
// ============================================================================

/// Pattern: `PHOTO#<owner>#<timestamp>`
///
/// The timestamp is fixed-width ISO 8601, so photos sort chronologically
/// within the owner's partition.
pub fn photo_sk(photo: &PhotoRef) -> String {
    format!("{PHOTO_PREFIX}{}{DELIMITER}{}", photo.owner, photo.timestamp)
}

pub fn photo_key(photo: &PhotoRef) -> TableKey {
    TableKey::new(user_pk(&photo.owner), photo_sk(photo))
}

/// Parses a `PHOTO#<owner>#<timestamp>` sort key.
pub fn parse_photo_sk(sk: &str) -> Result<PhotoRef, IdentifierError> {
    let rest = sk
        .strip_prefix(PHOTO_PREFIX)
        .ok_or_else(|| IdentifierError::MalformedKey(sk.to_string()))?;
    let (owner, timestamp) = rest
        .split_once(DELIMITER)
        .ok_or_else(|| IdentifierError::MalformedKey(sk.to_string()))?;

    Ok(PhotoRef::new(
        Username::parse(owner)?,
        Timestamp::parse(timestamp)?,
    ))
}

// ============================================================================
// Reaction keys
// ============================================================================

/// Pattern: `REACTION#<reacting_user>#<reaction_type>`
pub fn reaction_pk(reacting_user: &Username, kind: ReactionKind) -> String {
    format!("{REACTION_PREFIX}{reacting_user}{DELIMITER}{kind}")
}

/// The sort key of a reaction is the sort key of the photo it targets.
pub fn reaction_key(reacting_user: &Username, kind: ReactionKind, photo: &PhotoRef) -> TableKey {
    TableKey::new(reaction_pk(reacting_user, kind), photo_sk(photo))
}

// ============================================================================
// Friendship keys
// ============================================================================

/// Pattern: `#FRIEND#<following_user>`
pub fn friend_sk(following_user: &Username) -> String {
    format!("{FRIEND_PREFIX}{following_user}")
}

/// Edge key: lives in the followed user's partition.
pub fn friendship_key(followed_user: &Username, following_user: &Username) -> TableKey {
    TableKey::new(user_pk(followed_user), friend_sk(following_user))
}

// ============================================================================
// Parsing
// ============================================================================

/// The identity of a stored item, recovered from its key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKey {
    UserMetadata {
        username: Username,
    },
    Photo(PhotoRef),
    Reaction {
        reacting_user: Username,
        kind: ReactionKind,
        photo: PhotoRef,
    },
    Friendship {
        followed_user: Username,
        following_user: Username,
    },
}

impl EntityKey {
    /// Classifies a `(PK, SK)` pair by its type-tagged prefixes.
    pub fn parse(pk: &str, sk: &str) -> Result<Self, IdentifierError> {
        if let Some(user) = pk.strip_prefix(USER_PREFIX) {
            let username = Username::parse(user)?;

            if let Some(meta) = sk.strip_prefix(METADATA_PREFIX) {
                if meta != username.as_str() {
                    return Err(IdentifierError::MalformedKey(format!("{pk}/{sk}")));
                }
                return Ok(EntityKey::UserMetadata { username });
            }
            if let Some(following) = sk.strip_prefix(FRIEND_PREFIX) {
                return Ok(EntityKey::Friendship {
                    followed_user: username,
                    following_user: Username::parse(following)?,
                });
            }
            if sk.starts_with(PHOTO_PREFIX) {
                let photo = parse_photo_sk(sk)?;
                if photo.owner != username {
                    return Err(IdentifierError::MalformedKey(format!("{pk}/{sk}")));
                }
                return Ok(EntityKey::Photo(photo));
            }
            return Err(IdentifierError::MalformedKey(sk.to_string()));
        }

        if let Some(rest) = pk.strip_prefix(REACTION_PREFIX) {
            let (user, kind) = rest
                .split_once(DELIMITER)
                .ok_or_else(|| IdentifierError::MalformedKey(pk.to_string()))?;
            return Ok(EntityKey::Reaction {
                reacting_user: Username::parse(user)?,
                kind: kind.parse()?,
                photo: parse_photo_sk(sk)?,
            });
        }

        Err(IdentifierError::MalformedKey(pk.to_string()))
    }

    /// Re-encodes this identity as a key pair.
    pub fn to_table_key(&self) -> TableKey {
        match self {
            EntityKey::UserMetadata { username } => user_key(username),
            EntityKey::Photo(photo) => photo_key(photo),
            EntityKey::Reaction {
                reacting_user,
                kind,
                photo,
            } => reaction_key(reacting_user, *kind, photo),
            EntityKey::Friendship {
                followed_user,
                following_user,
            } => friendship_key(followed_user, following_user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn username(value: &str) -> Username {
        Username::parse(value).unwrap()
    }

    fn photo(owner: &str, ts: &str) -> PhotoRef {
        PhotoRef::new(username(owner), Timestamp::parse(ts).unwrap())
    }

    #[test]
    fn test_user_key() {
        let key = user_key(&username("jacksonjason"));
        assert_eq!(key.pk, "USER#jacksonjason");
        assert_eq!(key.sk, "#METADATA#jacksonjason");
    }

    #[test]
    fn test_photo_key() {
        let key = photo_key(&photo("ppierce", "2019-04-14T08:09:34"));
        assert_eq!(key.pk, "USER#ppierce");
        assert_eq!(key.sk, "PHOTO#ppierce#2019-04-14T08:09:34");
    }

    #[test]
    fn test_reaction_key() {
        let key = reaction_key(
            &username("kennedyheather"),
            ReactionKind::Sunglasses,
            &photo("ppierce", "2019-04-14T08:09:34"),
        );
        assert_eq!(key.pk, "REACTION#kennedyheather#sunglasses");
        assert_eq!(key.sk, "PHOTO#ppierce#2019-04-14T08:09:34");
    }

    #[test]
    fn test_friendship_key() {
        let key = friendship_key(&username("tmartinez"), &username("john42"));
        assert_eq!(key.pk, "USER#tmartinez");
        assert_eq!(key.sk, "#FRIEND#john42");
    }

    #[test]
    fn test_metadata_sorts_before_photos_before_sentinel() {
        let user = username("david25");
        let meta = user_metadata_sk(&user);
        let first = photo_sk(&photo("david25", "2019-03-02T09:11:30"));
        let second = photo_sk(&photo("david25", "2019-11-20T23:01:00"));

        assert!(meta < first);
        assert!(first < second);
        assert!(second.as_str() < "PHOTO$");
    }

    #[test]
    fn test_friend_edges_sort_before_metadata() {
        let edge = friend_sk(&username("zed"));
        let meta = user_metadata_sk(&username("aaron"));
        assert!(edge < meta);
    }

    #[test]
    fn test_reaction_partitions_sort_before_user_partitions() {
        let reaction = reaction_pk(&username("zzz"), ReactionKind::Heart);
        let user = user_pk(&username("aaa"));
        assert!("REACTION#" <= reaction.as_str());
        assert!(reaction < user);
        assert!(user.as_str() < "USER$");
    }

    #[test]
    fn test_parse_round_trips_every_entity() {
        let keys = vec![
            EntityKey::UserMetadata {
                username: username("jacksonjason"),
            },
            EntityKey::Photo(photo("ppierce", "2019-04-14T08:09:34")),
            EntityKey::Reaction {
                reacting_user: username("kennedyheather"),
                kind: ReactionKind::PlusOne,
                photo: photo("ppierce", "2019-04-14T08:09:34"),
            },
            EntityKey::Friendship {
                followed_user: username("tmartinez"),
                following_user: username("john42"),
            },
        ];

        for key in keys {
            let table_key = key.to_table_key();
            assert_eq!(EntityKey::parse(&table_key.pk, &table_key.sk).unwrap(), key);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_prefix() {
        assert!(matches!(
            EntityKey::parse("ORDER#1", "ORDER#1"),
            Err(IdentifierError::MalformedKey(_))
        ));
        assert!(matches!(
            EntityKey::parse("USER#a", "COMMENT#1"),
            Err(IdentifierError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_parse_rejects_mismatched_owner() {
        assert!(EntityKey::parse("USER#a", "PHOTO#b#2019-04-14T08:09:34").is_err());
        assert!(EntityKey::parse("USER#a", "#METADATA#b").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_reaction() {
        assert_eq!(
            EntityKey::parse("REACTION#a#wink", "PHOTO#b#2019-04-14T08:09:34"),
            Err(IdentifierError::UnknownReaction("wink".to_string()))
        );
    }

    #[test]
    fn test_parse_photo_sk_requires_timestamp() {
        assert!(parse_photo_sk("PHOTO#ppierce").is_err());
        assert!(parse_photo_sk("PHOTO#ppierce#yesterday").is_err());
    }
}
