use std::{env, time::Duration};

/// Data-layer configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// DynamoDB table name (default: "quick-photos")
    pub table_name: String,
    /// Name of the inverted global secondary index (default: "InvertedIndex")
    pub index_name: String,
    /// AWS region (default: "ap-northeast-1")
    pub region: String,
    /// Endpoint override, e.g. DynamoDB Local (default: none)
    pub endpoint_url: Option<String>,
    /// Per-operation timeout in milliseconds (default: 3,000)
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `QUICKPHOTOS_TABLE` - Table name (default: "quick-photos")
    /// - `QUICKPHOTOS_INDEX` - Inverted index name (default: "InvertedIndex")
    /// - `AWS_REGION` - AWS region (default: "ap-northeast-1")
    /// - `AWS_ENDPOINT_URL` - Endpoint override (default: none)
    /// - `QUICKPHOTOS_REQUEST_TIMEOUT_MS` - Operation timeout (default: 3,000)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            table_name: lookup("QUICKPHOTOS_TABLE").unwrap_or_else(|| "quick-photos".to_string()),
            index_name: lookup("QUICKPHOTOS_INDEX")
                .unwrap_or_else(|| "InvertedIndex".to_string()),
            region: lookup("AWS_REGION").unwrap_or_else(|| "ap-northeast-1".to_string()),
            endpoint_url: lookup("AWS_ENDPOINT_URL").filter(|url| !url.is_empty()),
            request_timeout_ms: lookup("QUICKPHOTOS_REQUEST_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3_000),
        }
    }

    /// Get the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_lookup(lookup_from(&[]));

        assert_eq!(config.table_name, "quick-photos");
        assert_eq!(config.index_name, "InvertedIndex");
        assert_eq!(config.region, "ap-northeast-1");
        assert_eq!(config.endpoint_url, None);
        assert_eq!(config.request_timeout_ms, 3_000);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("QUICKPHOTOS_TABLE", "photos-test"),
            ("AWS_REGION", "us-east-1"),
            ("AWS_ENDPOINT_URL", "http://localhost:8000"),
            ("QUICKPHOTOS_REQUEST_TIMEOUT_MS", "250"),
        ]));

        assert_eq!(config.table_name, "photos-test");
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_unparseable_timeout_falls_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("QUICKPHOTOS_REQUEST_TIMEOUT_MS", "soon"),
            ("AWS_ENDPOINT_URL", ""),
        ]));

        assert_eq!(config.request_timeout_ms, 3_000);
        assert_eq!(config.endpoint_url, None);
    }
}
