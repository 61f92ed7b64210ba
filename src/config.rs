//! Widget configuration.
//!
//! Read once at startup, either from the environment (with `.env` support)
//! or from the settings object the host admin page injects, then passed
//! explicitly to [`crate::Runtime::spawn`].

use std::time::Duration;

use access_rule_client::ClientConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controls::DEFAULT_MENU_ITEM;
use crate::graph::DanglingPolicy;

pub const ENV_BASE_URL: &str = "ACCESS_RULE_BASE_URL";
pub const ENV_API_PREFIX: &str = "ACCESS_RULE_API_PREFIX";
pub const ENV_NEO4J_URL: &str = "ACCESS_RULE_NEO4J_URL";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "ACCESS_RULE_REQUEST_TIMEOUT_MS";
pub const ENV_DANGLING_POLICY: &str = "ACCESS_RULE_DANGLING_POLICY";
pub const ENV_EVENT_BUFFER: &str = "ACCESS_RULE_EVENT_BUFFER";

/// Capacity of the applied-event broadcast.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {var}: {reason}")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid widget settings: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetConfig {
    #[serde(flatten)]
    pub client: ClientConfig,

    #[serde(alias = "dangling_policy")]
    pub dangling_policy: DanglingPolicy,

    /// Applied events a slow subscriber may fall behind by before it skips.
    #[serde(alias = "event_buffer")]
    pub event_buffer: usize,

    #[serde(alias = "active_menu_item")]
    pub active_menu_item: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            dangling_policy: DanglingPolicy::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
            active_menu_item: DEFAULT_MENU_ITEM.to_string(),
        }
    }
}

impl WidgetConfig {
    /// Load `.env` if present, then read `ACCESS_RULE_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_BASE_URL) {
            config.client = config.client.base_url(url);
        }
        if let Some(prefix) = lookup(ENV_API_PREFIX) {
            config.client = config.client.api_prefix(prefix);
        }
        if let Some(url) = lookup(ENV_NEO4J_URL).filter(|u| !u.is_empty()) {
            config.client = config.client.neo4j_url(url);
        }
        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            let ms = parse_var::<u64>(ENV_REQUEST_TIMEOUT_MS, value)?;
            config.client = config.client.request_timeout(Duration::from_millis(ms));
        }
        if let Some(value) = lookup(ENV_DANGLING_POLICY) {
            config.dangling_policy = value
                .parse()
                .map_err(|reason| ConfigError::InvalidVar {
                    var: ENV_DANGLING_POLICY,
                    value,
                    reason,
                })?;
        }
        if let Some(value) = lookup(ENV_EVENT_BUFFER) {
            config.event_buffer = parse_var(ENV_EVENT_BUFFER, value)?;
        }

        Ok(config)
    }

    /// Parse the settings object injected by the host page, e.g.
    /// `{"baseUrl": "...", "neo4jUrl": "..."}`.
    pub fn from_json(settings: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(settings)?)
    }

    pub fn client(mut self, client: ClientConfig) -> Self {
        self.client = client;
        self
    }

    pub fn dangling_policy(mut self, policy: DanglingPolicy) -> Self {
        self.dangling_policy = policy;
        self
    }

    pub fn event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size;
        self
    }
}

fn parse_var<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidVar {
        var,
        reason: e.to_string(),
        value,
    })
}
