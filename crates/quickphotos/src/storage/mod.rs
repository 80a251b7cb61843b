//! Store-facing half of the data layer.
//!
//! The pure pieces (codec, planner hydration, write recipes) sit beside the
//! [`ItemStore`] seam. Concrete stores are selected via feature flags.
//!
//! # Feature Flags
//!
//! - `dynamodb` (default): DynamoDB store using `aws-sdk-dynamodb`
//! - `inmemory` (default): in-memory store for tests and local runs

pub mod codec;
pub mod enrichment;
pub mod planner;
pub mod repository;
pub mod store;
pub mod writer;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(feature = "inmemory")]
pub mod inmemory;

pub use codec::StoredEntity;
pub use enrichment::BatchEnricher;
pub use planner::{EntityIter, QueryPlanner};
pub use repository::Repository;
pub use store::{ItemStore, WriteOp};
pub use writer::{TransactionalWriter, WriteRecipe};

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbStore;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryStore;
