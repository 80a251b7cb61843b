//! In-memory store backend, for tests and local experiments.

mod store;

pub use store::InMemoryStore;
