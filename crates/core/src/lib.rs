//! quickphotos_core - Functional core for the quick-photos single-table data layer.
//!
//! Everything in this crate is pure: domain types, key encoding, access-pattern
//! descriptors and the error taxonomy. Store I/O lives in the `quickphotos` crate.

pub mod social;
pub mod storage;
