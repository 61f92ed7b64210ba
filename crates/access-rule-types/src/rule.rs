//! Access rule wire types

use serde::{Deserialize, Serialize};

/// Body of `POST access-rules/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePayload {
    /// Source content type natural key, `"{app_label}.{model}"`.
    pub ctype_source: String,
    /// Target content type natural key.
    pub ctype_target: String,
    /// Relation types in traversal order.
    pub relation_types: Vec<String>,
    /// Permission natural keys, `"{app_label}.{codename}"`.
    pub permissions: Vec<String>,
}

/// An access rule as returned by the backend (created or fetched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub ctype_source: String,
    pub ctype_target: String,
    #[serde(default)]
    pub relation_types: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl AccessRule {
    /// The rule's submittable shape, without server-managed fields.
    pub fn payload(&self) -> RulePayload {
        RulePayload {
            ctype_source: self.ctype_source.clone(),
            ctype_target: self.ctype_target.clone(),
            relation_types: self.relation_types.clone(),
            permissions: self.permissions.clone(),
        }
    }
}

impl From<RulePayload> for AccessRule {
    fn from(payload: RulePayload) -> Self {
        Self {
            id: None,
            ctype_source: payload.ctype_source,
            ctype_target: payload.ctype_target,
            relation_types: payload.relation_types,
            permissions: payload.permissions,
            is_active: None,
            created: None,
            updated: None,
        }
    }
}
