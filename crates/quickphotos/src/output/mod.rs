//! Output formatting functions.

pub mod pretty;

use serde::Serialize;

use crate::cli::OutputFormat;

/// Renders `value` as compact JSON, or through `pretty` for human output.
pub fn render<T: Serialize>(
    value: &T,
    format: OutputFormat,
    pretty: impl FnOnce(&T) -> String,
) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(value).unwrap_or_default(),
        OutputFormat::Pretty => pretty(value),
    }
}
