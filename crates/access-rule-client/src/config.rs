//! Client configuration.
//!
//! Passed explicitly into [`crate::HttpClient::new`]; there is no ambient
//! settings state.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TransportError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_API_PREFIX: &str = "/admin/chemtrails_permissions/accessrule/neo4j";

/// Where and how to reach the permissions backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Origin of the host admin application.
    #[serde(alias = "base_url")]
    pub base_url: String,

    /// Path under which the graph endpoints are mounted.
    #[serde(alias = "api_prefix")]
    pub api_prefix: String,

    /// Alternate direct driver URL for the graph database, if configured.
    #[serde(alias = "neo4j_url")]
    pub neo4j_url: Option<String>,

    /// Per-request timeout. `None` leaves requests unbounded.
    #[serde(alias = "request_timeout_ms")]
    pub request_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            neo4j_url: None,
            request_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    pub fn neo4j_url(mut self, url: impl Into<String>) -> Self {
        self.neo4j_url = Some(url.into());
        self
    }

    /// Timeouts beyond `u64::MAX` milliseconds saturate.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Absolute URL of an endpoint path relative to the API prefix.
    pub fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        let path = path.trim_start_matches('/');
        let raw = if prefix.is_empty() {
            format!("{}/{}", base, path)
        } else {
            format!("{}/{}/{}", base, prefix, path)
        };
        Url::parse(&raw).map_err(|e| TransportError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        let config = ClientConfig::default();
        assert_eq!(
            config.endpoint("meta-graph/").unwrap().as_str(),
            "http://localhost:8000/admin/chemtrails_permissions/accessrule/neo4j/meta-graph/"
        );
    }

    #[test]
    fn test_builder_pattern() {
        let config = ClientConfig::default()
            .base_url("https://admin.example.org/")
            .api_prefix("/api/")
            .neo4j_url("bolt://graph:7687")
            .request_timeout(Duration::from_secs(5));

        assert_eq!(
            config.endpoint("access-rules/4").unwrap().as_str(),
            "https://admin.example.org/api/access-rules/4"
        );
        assert_eq!(config.neo4j_url.as_deref(), Some("bolt://graph:7687"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_huge_timeout_saturates() {
        let config = ClientConfig::default().request_timeout(Duration::MAX);
        assert_eq!(config.request_timeout_ms, Some(u64::MAX));
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig::default().base_url("not a url");
        assert!(matches!(
            config.endpoint("meta-graph/"),
            Err(TransportError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_host_settings_json() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"baseUrl": "http://admin:9000", "neo4jUrl": "http://neo4j:7474"}"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://admin:9000");
        assert_eq!(config.neo4j_url.as_deref(), Some("http://neo4j:7474"));
        assert_eq!(config.api_prefix, DEFAULT_API_PREFIX);
    }
}
