//! Attribute-map conversion for every entity stored in the table.
//!
//! Pure functions between domain types and `AttributeValue` maps. All
//! run-time shape handling of stored items happens here: callers above this
//! module only ever see [`StoredEntity`] or concrete domain types.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use quickphotos_core::social::{
    Friendship, Photo, Reaction, ReactionCounts, ReactionKind, Timestamp, User, Username,
};
use quickphotos_core::storage::{
    keys, EntityKey, RepositoryError, Result, TableKey, PK_ATTRIBUTE, SK_ATTRIBUTE,
};

use super::store::Item;

// ============================================================================
// Attribute names
// ============================================================================

pub const ATTR_USERNAME: &str = "username";
pub const ATTR_NAME: &str = "name";
pub const ATTR_EMAIL: &str = "email";
pub const ATTR_BIRTHDATE: &str = "birthdate";
pub const ATTR_ADDRESS: &str = "address";
pub const ATTR_STATUS: &str = "status";
pub const ATTR_INTERESTS: &str = "interests";
pub const ATTR_FOLLOWERS: &str = "followers";
pub const ATTR_FOLLOWING: &str = "following";
pub const ATTR_PINNED_IMAGE: &str = "pinnedImage";
pub const ATTR_RECOMMENDED_FRIENDS: &str = "recommendedFriends";
/// Misspelled variant present in the seeded data set.
pub const ATTR_RECOMMENDED_FRIENDS_LEGACY: &str = "reccomendedFriends";
pub const ATTR_TIMESTAMP: &str = "timestamp";
pub const ATTR_LOCATION: &str = "location";
pub const ATTR_REACTIONS: &str = "reactions";
pub const ATTR_REACTING_USER: &str = "reactingUser";
pub const ATTR_REACTION_TYPE: &str = "reactionType";
pub const ATTR_PHOTO: &str = "photo";
pub const ATTR_FOLLOWED_USER: &str = "followedUser";
pub const ATTR_FOLLOWING_USER: &str = "followingUser";

const ENTITY_USER: &str = "User";
const ENTITY_PHOTO: &str = "Photo";
const ENTITY_REACTION: &str = "Reaction";
const ENTITY_FRIENDSHIP: &str = "Friendship";
const ENTITY_ITEM: &str = "Item";

// ============================================================================
// StoredEntity
// ============================================================================

/// A decoded table row, tagged by entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredEntity {
    User(User),
    Photo(Photo),
    Reaction(Reaction),
    Friendship(Friendship),
}

impl StoredEntity {
    /// The primary key this entity is stored under.
    pub fn key(&self) -> TableKey {
        match self {
            StoredEntity::User(user) => keys::user_key(&user.username),
            StoredEntity::Photo(photo) => keys::photo_key(&photo.photo_ref()),
            StoredEntity::Reaction(reaction) => {
                keys::reaction_key(&reaction.reacting_user, reaction.kind, &reaction.photo)
            }
            StoredEntity::Friendship(edge) => {
                keys::friendship_key(&edge.followed_user, &edge.following_user)
            }
        }
    }

    pub fn entity_type(&self) -> &'static str {
        match self {
            StoredEntity::User(_) => ENTITY_USER,
            StoredEntity::Photo(_) => ENTITY_PHOTO,
            StoredEntity::Reaction(_) => ENTITY_REACTION,
            StoredEntity::Friendship(_) => ENTITY_FRIENDSHIP,
        }
    }
}

/// Encodes any entity into its stored attribute map.
pub fn encode(entity: &StoredEntity) -> Item {
    match entity {
        StoredEntity::User(user) => user_to_item(user),
        StoredEntity::Photo(photo) => photo_to_item(photo),
        StoredEntity::Reaction(reaction) => reaction_to_item(reaction),
        StoredEntity::Friendship(edge) => friendship_to_item(edge),
    }
}

/// Decodes a stored item, dispatching on the type tags of its key pair.
///
/// The decoded entity must re-encode to the same key, so an item whose
/// attributes disagree with its `PK`/`SK` is rejected.
pub fn decode(item: &Item) -> Result<StoredEntity> {
    let key = item_key(item)?;

    let entity = match EntityKey::parse(&key.pk, &key.sk)? {
        EntityKey::UserMetadata { .. } => StoredEntity::User(item_to_user(item)?),
        EntityKey::Photo(_) => StoredEntity::Photo(item_to_photo(item)?),
        EntityKey::Reaction { .. } => StoredEntity::Reaction(item_to_reaction(item)?),
        EntityKey::Friendship { .. } => StoredEntity::Friendship(item_to_friendship(item)?),
    };

    if entity.key() != key {
        return Err(RepositoryError::Decode(format!(
            "{} attributes do not match key {key}",
            entity.entity_type()
        )));
    }

    Ok(entity)
}

// ============================================================================
// Keys
// ============================================================================

/// Builds the `{PK, SK}` attribute map used to address an item.
pub fn key_to_item(key: &TableKey) -> Item {
    let mut item = HashMap::new();
    item.insert(PK_ATTRIBUTE.to_string(), AttributeValue::S(key.pk.clone()));
    item.insert(SK_ATTRIBUTE.to_string(), AttributeValue::S(key.sk.clone()));
    item
}

/// Reads the primary key out of a stored item.
pub fn item_key(item: &Item) -> Result<TableKey> {
    Ok(TableKey::new(
        get_string(item, ENTITY_ITEM, PK_ATTRIBUTE)?,
        get_string(item, ENTITY_ITEM, SK_ATTRIBUTE)?,
    ))
}

// ============================================================================
// User conversions
// ============================================================================

/// Convert a User to a table item.
///
/// Absent optional fields and empty lists are omitted. Both counters are
/// always written.
pub fn user_to_item(user: &User) -> Item {
    let mut item = key_to_item(&keys::user_key(&user.username));

    item.insert(
        ATTR_USERNAME.to_string(),
        AttributeValue::S(user.username.to_string()),
    );
    insert_optional_string(&mut item, ATTR_NAME, &user.name);
    insert_optional_string(&mut item, ATTR_EMAIL, &user.email);
    insert_optional_string(&mut item, ATTR_BIRTHDATE, &user.birthdate);
    insert_optional_string(&mut item, ATTR_ADDRESS, &user.address);
    insert_optional_string(&mut item, ATTR_STATUS, &user.status);
    insert_string_list(&mut item, ATTR_INTERESTS, &user.interests);
    item.insert(ATTR_FOLLOWERS.to_string(), number(user.followers));
    item.insert(ATTR_FOLLOWING.to_string(), number(user.following));
    insert_optional_string(&mut item, ATTR_PINNED_IMAGE, &user.pinned_image);
    insert_string_list(&mut item, ATTR_RECOMMENDED_FRIENDS, &user.recommended_friends);

    item
}

/// Convert a table item to a User.
pub fn item_to_user(item: &Item) -> Result<User> {
    let recommended_friends = if item.contains_key(ATTR_RECOMMENDED_FRIENDS) {
        get_string_list(item, ENTITY_USER, ATTR_RECOMMENDED_FRIENDS)?
    } else {
        get_string_list(item, ENTITY_USER, ATTR_RECOMMENDED_FRIENDS_LEGACY)?
    };

    Ok(User {
        username: get_username(item, ENTITY_USER, ATTR_USERNAME)?,
        name: get_optional_string(item, ENTITY_USER, ATTR_NAME)?,
        email: get_optional_string(item, ENTITY_USER, ATTR_EMAIL)?,
        birthdate: get_optional_string(item, ENTITY_USER, ATTR_BIRTHDATE)?,
        address: get_optional_string(item, ENTITY_USER, ATTR_ADDRESS)?,
        status: get_optional_string(item, ENTITY_USER, ATTR_STATUS)?,
        interests: get_string_list(item, ENTITY_USER, ATTR_INTERESTS)?,
        followers: get_count(item, ENTITY_USER, ATTR_FOLLOWERS)?,
        following: get_count(item, ENTITY_USER, ATTR_FOLLOWING)?,
        pinned_image: get_optional_string(item, ENTITY_USER, ATTR_PINNED_IMAGE)?,
        recommended_friends,
    })
}

// ============================================================================
// Photo conversions
// ============================================================================

/// Convert a Photo to a table item. Every reaction type is written, zeros included.
pub fn photo_to_item(photo: &Photo) -> Item {
    let mut item = key_to_item(&keys::photo_key(&photo.photo_ref()));

    item.insert(
        ATTR_USERNAME.to_string(),
        AttributeValue::S(photo.owner.to_string()),
    );
    item.insert(
        ATTR_TIMESTAMP.to_string(),
        AttributeValue::S(photo.timestamp.to_string()),
    );
    insert_optional_string(&mut item, ATTR_LOCATION, &photo.location);
    item.insert(ATTR_REACTIONS.to_string(), reactions_to_attribute(&photo.reactions));

    item
}

/// Convert a table item to a Photo.
pub fn item_to_photo(item: &Item) -> Result<Photo> {
    Ok(Photo {
        owner: get_username(item, ENTITY_PHOTO, ATTR_USERNAME)?,
        timestamp: get_timestamp(item, ENTITY_PHOTO, ATTR_TIMESTAMP)?,
        location: get_optional_string(item, ENTITY_PHOTO, ATTR_LOCATION)?,
        reactions: get_reactions(item)?,
    })
}

fn reactions_to_attribute(counts: &ReactionCounts) -> AttributeValue {
    AttributeValue::M(
        counts
            .iter()
            .map(|(kind, count)| (kind.as_str().to_string(), number(count)))
            .collect(),
    )
}

fn get_reactions(item: &Item) -> Result<ReactionCounts> {
    let Some(value) = present(item, ATTR_REACTIONS) else {
        return Ok(ReactionCounts::default());
    };
    let map = value
        .as_m()
        .map_err(|_| wrong_type(ENTITY_PHOTO, ATTR_REACTIONS, "map"))?;

    let mut counts = ReactionCounts::default();
    for (name, value) in map {
        let kind: ReactionKind = name
            .parse()
            .map_err(|_| RepositoryError::Decode(format!("Unknown reaction type: {name}")))?;
        counts.set(kind, parse_count(value, ENTITY_PHOTO, ATTR_REACTIONS)?);
    }
    Ok(counts)
}

// ============================================================================
// Reaction conversions
// ============================================================================

/// Convert a Reaction to a table item.
pub fn reaction_to_item(reaction: &Reaction) -> Item {
    let mut item = key_to_item(&keys::reaction_key(
        &reaction.reacting_user,
        reaction.kind,
        &reaction.photo,
    ));

    item.insert(
        ATTR_REACTING_USER.to_string(),
        AttributeValue::S(reaction.reacting_user.to_string()),
    );
    item.insert(
        ATTR_REACTION_TYPE.to_string(),
        AttributeValue::S(reaction.kind.as_str().to_string()),
    );
    item.insert(
        ATTR_PHOTO.to_string(),
        AttributeValue::S(keys::photo_sk(&reaction.photo)),
    );
    item.insert(
        ATTR_TIMESTAMP.to_string(),
        AttributeValue::S(reaction.timestamp.to_string()),
    );

    item
}

/// Convert a table item to a Reaction.
pub fn item_to_reaction(item: &Item) -> Result<Reaction> {
    let kind = get_string(item, ENTITY_REACTION, ATTR_REACTION_TYPE)?
        .parse::<ReactionKind>()
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Reaction {
        reacting_user: get_username(item, ENTITY_REACTION, ATTR_REACTING_USER)?,
        kind,
        photo: keys::parse_photo_sk(&get_string(item, ENTITY_REACTION, ATTR_PHOTO)?)?,
        timestamp: get_timestamp(item, ENTITY_REACTION, ATTR_TIMESTAMP)?,
    })
}

// ============================================================================
// Friendship conversions
// ============================================================================

/// Convert a Friendship to a table item.
pub fn friendship_to_item(edge: &Friendship) -> Item {
    let mut item = key_to_item(&keys::friendship_key(&edge.followed_user, &edge.following_user));

    item.insert(
        ATTR_FOLLOWED_USER.to_string(),
        AttributeValue::S(edge.followed_user.to_string()),
    );
    item.insert(
        ATTR_FOLLOWING_USER.to_string(),
        AttributeValue::S(edge.following_user.to_string()),
    );
    item.insert(
        ATTR_TIMESTAMP.to_string(),
        AttributeValue::S(edge.timestamp.to_string()),
    );

    item
}

/// Convert a table item to a Friendship.
pub fn item_to_friendship(item: &Item) -> Result<Friendship> {
    Ok(Friendship {
        followed_user: get_username(item, ENTITY_FRIENDSHIP, ATTR_FOLLOWED_USER)?,
        following_user: get_username(item, ENTITY_FRIENDSHIP, ATTR_FOLLOWING_USER)?,
        timestamp: get_timestamp(item, ENTITY_FRIENDSHIP, ATTR_TIMESTAMP)?,
    })
}

// ============================================================================
// Helper functions
// ============================================================================

fn number(value: u64) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

fn insert_optional_string(item: &mut Item, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        item.insert(key.to_string(), AttributeValue::S(value.clone()));
    }
}

fn insert_string_list(item: &mut Item, key: &str, values: &[String]) {
    if !values.is_empty() {
        item.insert(
            key.to_string(),
            AttributeValue::L(values.iter().cloned().map(AttributeValue::S).collect()),
        );
    }
}

/// Returns an attribute unless it is absent or an explicit NULL.
fn present<'a>(item: &'a Item, key: &str) -> Option<&'a AttributeValue> {
    item.get(key).filter(|value| !value.is_null())
}

fn wrong_type(entity_type: &str, field: &str, expected: &str) -> RepositoryError {
    RepositoryError::Decode(format!("{entity_type}.{field} is not a {expected}"))
}

/// Get a required string attribute.
fn get_string(item: &Item, entity_type: &'static str, field: &'static str) -> Result<String> {
    let value = present(item, field).ok_or(RepositoryError::MissingField { entity_type, field })?;
    value
        .as_s()
        .map(|s| s.to_string())
        .map_err(|_| wrong_type(entity_type, field, "string"))
}

/// Get an optional string attribute.
fn get_optional_string(
    item: &Item,
    entity_type: &'static str,
    field: &'static str,
) -> Result<Option<String>> {
    match present(item, field) {
        None => Ok(None),
        Some(value) => value
            .as_s()
            .map(|s| Some(s.to_string()))
            .map_err(|_| wrong_type(entity_type, field, "string")),
    }
}

fn get_username(item: &Item, entity_type: &'static str, field: &'static str) -> Result<Username> {
    Ok(Username::parse(get_string(item, entity_type, field)?)?)
}

fn get_timestamp(
    item: &Item,
    entity_type: &'static str,
    field: &'static str,
) -> Result<Timestamp> {
    Ok(Timestamp::parse(&get_string(item, entity_type, field)?)?)
}

/// Get a list of strings; absent means empty.
///
/// Accepts a list, a string set, or a bare string (stored as a one-element list).
fn get_string_list(
    item: &Item,
    entity_type: &'static str,
    field: &'static str,
) -> Result<Vec<String>> {
    match present(item, field) {
        None => Ok(Vec::new()),
        Some(AttributeValue::L(values)) => values
            .iter()
            .map(|value| {
                value
                    .as_s()
                    .map(|s| s.to_string())
                    .map_err(|_| wrong_type(entity_type, field, "list of strings"))
            })
            .collect(),
        Some(AttributeValue::Ss(values)) => Ok(values.clone()),
        Some(AttributeValue::S(value)) => Ok(vec![value.clone()]),
        Some(_) => Err(wrong_type(entity_type, field, "list of strings")),
    }
}

/// Get a non-negative counter; absent means zero.
fn get_count(item: &Item, entity_type: &'static str, field: &'static str) -> Result<u64> {
    match present(item, field) {
        None => Ok(0),
        Some(value) => parse_count(value, entity_type, field),
    }
}

fn parse_count(value: &AttributeValue, entity_type: &str, field: &str) -> Result<u64> {
    value
        .as_n()
        .map_err(|_| wrong_type(entity_type, field, "number"))?
        .parse::<u64>()
        .map_err(|e| RepositoryError::Decode(format!("Invalid count {entity_type}.{field}: {e}")))
}
