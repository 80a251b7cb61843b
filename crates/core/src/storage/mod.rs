mod error;
pub mod keys;
mod patterns;
mod traits;

pub use error::{RepositoryError, Result, StoreError};
pub use keys::{EntityKey, TableKey};
pub use patterns::{
    AccessPattern, IndexTarget, KeyCondition, KeyRange, QuerySpec, FRIEND_RANGE_SENTINEL,
    INVERTED_INDEX_NAME, PHOTO_RANGE_SENTINEL, PK_ATTRIBUTE, REACTION_RANGE_START, SK_ATTRIBUTE,
    USER_RANGE_SENTINEL,
};
pub use traits::SocialRepository;
