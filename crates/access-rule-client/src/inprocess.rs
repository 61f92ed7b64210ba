//! In-process [`AccessRuleApi`] backed by fixed data.
//!
//! Used by tests and by hosts that embed the schema directly.

use std::sync::{Mutex, MutexGuard};

use access_rule_types::{AccessRule, NodeList, RawSchemaGraph, RulePayload};
use async_trait::async_trait;

use crate::{paths, AccessRuleApi, Result, TransportError};

#[derive(Default)]
struct Inner {
    rules: Vec<AccessRule>,
    next_id: i64,
    failure: Option<TransportError>,
}

pub struct InMemoryClient {
    schema: RawSchemaGraph,
    node_list: NodeList,
    inner: Mutex<Inner>,
}

impl InMemoryClient {
    pub fn new(schema: RawSchemaGraph, node_list: NodeList) -> Self {
        Self {
            schema,
            node_list,
            inner: Mutex::new(Inner {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Seed an existing rule; an id is assigned when missing.
    pub fn with_rule(self, mut rule: AccessRule) -> Self {
        {
            let mut inner = self.lock();
            let id = rule.id.unwrap_or(inner.next_id);
            inner.next_id = inner.next_id.max(id + 1);
            rule.id = Some(id);
            inner.rules.push(rule);
        }
        self
    }

    /// Make every subsequent call fail with `error` until [`Self::recover`].
    pub fn fail_with(&self, error: TransportError) {
        self.lock().failure = Some(error);
    }

    pub fn recover(&self) {
        self.lock().failure = None;
    }

    /// Rules stored so far, seeded and posted.
    pub fn rules(&self) -> Vec<AccessRule> {
        self.lock().rules.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> Result<()> {
        match &self.lock().failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AccessRuleApi for InMemoryClient {
    async fn fetch_meta_graph(&self) -> Result<RawSchemaGraph> {
        self.check()?;
        Ok(self.schema.clone())
    }

    async fn fetch_node_list(&self) -> Result<NodeList> {
        self.check()?;
        Ok(self.node_list.clone())
    }

    async fn post_rule(&self, payload: &RulePayload) -> Result<AccessRule> {
        self.check()?;
        let mut inner = self.lock();
        let mut rule = AccessRule::from(payload.clone());
        rule.id = Some(inner.next_id);
        rule.is_active = Some(true);
        inner.next_id += 1;
        inner.rules.push(rule.clone());
        Ok(rule)
    }

    async fn fetch_rule(&self, id: i64) -> Result<AccessRule> {
        self.check()?;
        self.lock()
            .rules
            .iter()
            .find(|r| r.id == Some(id))
            .cloned()
            .ok_or_else(|| TransportError::Http {
                status: 404,
                url: paths::access_rule(id),
            })
    }
}
