//! Rule Codec
//!
//! `encode` turns the selected path into the payload posted to
//! `access-rules/`; `decode` splits a fetched rule's natural keys back into
//! their parts so it can be reconciled against the render graph.

use std::fmt;

use access_rule_types::{AccessRule, NodeDescriptor, RulePayload};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::selection::SelectedSubgraph;

/// Build the submission payload from a selection and the chosen permission
/// codenames.
///
/// Source is the first selected node, target the last; relation types follow
/// edge selection order, which is traversal order. Codenames are namespaced
/// with the target's app label.
pub fn encode(selected: &SelectedSubgraph, permissions: &[String]) -> Result<RulePayload, CodecError> {
    let (source, target) = match selected.nodes.as_slice() {
        [source, .., target] => (source, target),
        nodes => return Err(CodecError::TooFewNodes { count: nodes.len() }),
    };

    let ctype_source = content_type(source)?;
    let ctype_target = content_type(target)?;
    let app_label = ContentTypeRef::parse(&ctype_target)?.app_label;

    Ok(RulePayload {
        ctype_source,
        ctype_target,
        relation_types: selected.edges.iter().map(|e| e.relation_type.clone()).collect(),
        permissions: permissions
            .iter()
            .map(|codename| format!("{}.{}", app_label, codename))
            .collect(),
    })
}

fn content_type(node: &NodeDescriptor) -> Result<String, CodecError> {
    node.content_type().ok_or_else(|| CodecError::MissingContentType {
        label: node.label.clone(),
    })
}

/// A content type natural key, `"{app_label}.{model}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentTypeRef {
    pub app_label: String,
    pub model: String,
}

impl ContentTypeRef {
    pub fn parse(natural_key: &str) -> Result<Self, CodecError> {
        split_natural_key(natural_key)
            .map(|(app_label, model)| Self { app_label, model })
            .ok_or_else(|| CodecError::MalformedContentType(natural_key.to_string()))
    }
}

impl fmt::Display for ContentTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model)
    }
}

/// A permission natural key, `"{app_label}.{codename}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionRef {
    pub app_label: String,
    pub codename: String,
}

impl PermissionRef {
    pub fn parse(natural_key: &str) -> Result<Self, CodecError> {
        split_natural_key(natural_key)
            .map(|(app_label, codename)| Self { app_label, codename })
            .ok_or_else(|| CodecError::MalformedPermission(natural_key.to_string()))
    }
}

fn split_natural_key(key: &str) -> Option<(String, String)> {
    match key.split_once('.') {
        Some((left, right)) if !left.is_empty() && !right.is_empty() => {
            Some((left.to_string(), right.to_string()))
        }
        _ => None,
    }
}

/// A fetched rule with its natural keys split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedRule {
    pub source: ContentTypeRef,
    pub target: ContentTypeRef,
    pub relation_types: Vec<String>,
    pub permissions: Vec<PermissionRef>,
}

impl DecodedRule {
    /// Permission codenames without their app label, as the selection stores them.
    pub fn codenames(&self) -> Vec<String> {
        self.permissions.iter().map(|p| p.codename.clone()).collect()
    }
}

pub fn decode(rule: &AccessRule) -> Result<DecodedRule, CodecError> {
    Ok(DecodedRule {
        source: ContentTypeRef::parse(&rule.ctype_source)?,
        target: ContentTypeRef::parse(&rule.ctype_target)?,
        relation_types: rule.relation_types.clone(),
        permissions: rule
            .permissions
            .iter()
            .map(|p| PermissionRef::parse(p))
            .collect::<Result<_, _>>()?,
    })
}
