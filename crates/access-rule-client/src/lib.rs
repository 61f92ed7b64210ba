//! AccessRuleApi trait: the sole transport boundary between the graph widget
//! and the permissions backend. The widget depends on this trait, never on
//! reqwest directly.

pub mod config;
pub mod error;
pub mod http;
pub mod inprocess;

use access_rule_types::{AccessRule, NodeList, RawSchemaGraph, RulePayload};
use async_trait::async_trait;

pub use config::ClientConfig;
pub use error::TransportError;
pub use http::HttpClient;
pub use inprocess::InMemoryClient;

pub type Result<T> = std::result::Result<T, TransportError>;

/// Relative endpoint paths under [`ClientConfig::api_prefix`].
pub mod paths {
    pub const META_GRAPH: &str = "meta-graph/";
    pub const NODE_LIST: &str = "nodelist/";
    pub const ACCESS_RULES: &str = "access-rules/";

    pub fn access_rule(id: i64) -> String {
        format!("{}{}", ACCESS_RULES, id)
    }
}

#[async_trait]
pub trait AccessRuleApi: Send + Sync {
    /// `GET meta-graph/`: the raw schema graph.
    async fn fetch_meta_graph(&self) -> Result<RawSchemaGraph>;

    /// `GET nodelist/`: node label to relation names.
    async fn fetch_node_list(&self) -> Result<NodeList>;

    /// `POST access-rules/`: create a rule, returns the stored rule.
    async fn post_rule(&self, payload: &RulePayload) -> Result<AccessRule>;

    /// `GET access-rules/{id}`: an existing rule.
    async fn fetch_rule(&self, id: i64) -> Result<AccessRule>;
}
