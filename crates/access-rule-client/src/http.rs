//! reqwest-backed [`AccessRuleApi`] implementation.

use access_rule_types::{AccessRule, NodeList, RawSchemaGraph, RulePayload};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::{paths, AccessRuleApi, ClientConfig, Result, TransportError};

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: ClientConfig,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Network(format!("failed to create HTTP client: {}", e)))?;

        tracing::debug!(
            base_url = %config.base_url,
            api_prefix = %config.api_prefix,
            neo4j_url = ?config.neo4j_url,
            "HttpClient configured"
        );

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.config.endpoint(path)?;
        tracing::debug!(%url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        Self::read(url, response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.config.endpoint(path)?;
        tracing::debug!(%url, "POST");
        let response = self.client.post(url.clone()).json(body).send().await?;
        Self::read(url, response).await
    }

    async fn read<T: DeserializeOwned>(url: Url, response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "bad response from the server");
            return Err(TransportError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AccessRuleApi for HttpClient {
    async fn fetch_meta_graph(&self) -> Result<RawSchemaGraph> {
        self.get(paths::META_GRAPH).await
    }

    async fn fetch_node_list(&self) -> Result<NodeList> {
        self.get(paths::NODE_LIST).await
    }

    async fn post_rule(&self, payload: &RulePayload) -> Result<AccessRule> {
        self.post(paths::ACCESS_RULES, payload).await
    }

    async fn fetch_rule(&self, id: i64) -> Result<AccessRule> {
        self.get(&paths::access_rule(id)).await
    }
}
