//! quickphotos - Single-table DynamoDB data layer for a photo-sharing app.

pub mod cli;
pub mod config;
pub mod output;
pub mod storage;

pub use config::Config;
pub use storage::Repository;
