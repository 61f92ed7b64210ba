//! Schema graph wire types
//!
//! The backend serves the schema graph as a mapping from node label to a
//! loosely-typed entry. [`RawSchemaGraph`] keeps those entries untouched (and
//! in order); [`NodeDescriptor::from_entry`] classifies each entry once into
//! tagged [`SchemaProperty`] values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IngestError;

/// Reserved entry key carrying the permission codenames of a node.
pub const DEFAULT_PERMISSIONS_KEY: &str = "default_permissions";

/// Entry keys lifted into dedicated [`NodeDescriptor`] fields.
const IDENTITY_KEYS: &[&str] = &["id", "label", "app_label", "model_name"];

// ============================================================================
// RAW SCHEMA GRAPH
// ============================================================================

/// Raw schema graph exactly as fetched, in enumeration order.
///
/// Accepts both payload shapes the backend has served: a mapping keyed by
/// label, or a list of entries that each carry a `label`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSchemaPayload", into = "IndexMap<String, Value>")]
pub struct RawSchemaGraph {
    entries: Vec<(String, Value)>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSchemaPayload {
    Mapping(IndexMap<String, Value>),
    List(Vec<Value>),
}

impl TryFrom<RawSchemaPayload> for RawSchemaGraph {
    type Error = IngestError;

    fn try_from(payload: RawSchemaPayload) -> Result<Self, Self::Error> {
        let entries = match payload {
            RawSchemaPayload::Mapping(map) => map.into_iter().collect(),
            RawSchemaPayload::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(position, item)| {
                    let label = item
                        .get("label")
                        .and_then(Value::as_str)
                        .ok_or(IngestError::MissingLabel { position })?
                        .to_string();
                    Ok((label, item))
                })
                .collect::<Result<Vec<_>, IngestError>>()?,
        };
        Ok(Self { entries })
    }
}

impl From<RawSchemaGraph> for IndexMap<String, Value> {
    fn from(graph: RawSchemaGraph) -> Self {
        graph.entries.into_iter().collect()
    }
}

impl RawSchemaGraph {
    /// Build from `(label, entry)` pairs, keeping their order.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Classify every entry into a [`NodeDescriptor`], preserving order.
    ///
    /// Duplicate labels are kept; deduplication belongs to normalization.
    pub fn ingest(&self) -> Result<Vec<NodeDescriptor>, IngestError> {
        self.iter()
            .map(|(key, entry)| NodeDescriptor::from_entry(key, entry))
            .collect()
    }
}

// ============================================================================
// TAGGED SCHEMA
// ============================================================================

/// One outgoing relation of a schema node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTarget {
    /// Label of the target node.
    pub to: String,
    pub relation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl RelationTarget {
    fn from_value(label: &str, property: &str, value: &Value) -> Result<Self, IngestError> {
        let malformed = |reason: &str| IngestError::MalformedRelation {
            label: label.to_string(),
            property: property.to_string(),
            reason: reason.to_string(),
        };
        let to = value
            .get("to")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing string `to`"))?;
        let relation_type = value
            .get("relation_type")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing string `relation_type`"))?;
        Ok(Self {
            to: to.to_string(),
            relation_type: relation_type.to_string(),
            direction: value.get("direction").and_then(Value::as_i64),
            meta: value.get("meta").cloned(),
        })
    }
}

/// A schema property, resolved once at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaProperty {
    Relation { targets: Vec<RelationTarget> },
    Scalar { value: Value },
}

impl SchemaProperty {
    pub fn is_relation(&self) -> bool {
        matches!(self, SchemaProperty::Relation { .. })
    }
}

/// Schema-level description of a content type node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub id: i64,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<String, SchemaProperty>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl NodeDescriptor {
    /// Classify one raw entry. `key` is the mapping key and the fallback label.
    ///
    /// Entries already in tagged form (a `properties` object whose values all
    /// carry a `kind`) are deserialized directly.
    pub fn from_entry(key: &str, entry: &Value) -> Result<Self, IngestError> {
        let Value::Object(map) = entry else {
            return Err(IngestError::NotAnObject {
                label: key.to_string(),
            });
        };

        if is_tagged(map) {
            return serde_json::from_value(entry.clone()).map_err(|e| IngestError::InvalidTagged {
                label: key.to_string(),
                reason: e.to_string(),
            });
        }

        let label = map
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(key)
            .to_string();
        let id = map
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| IngestError::MissingId {
                label: label.clone(),
            })?;

        let mut properties = IndexMap::new();
        let mut permissions = Vec::new();
        for (name, value) in map {
            if IDENTITY_KEYS.contains(&name.as_str()) {
                continue;
            }
            if name == DEFAULT_PERMISSIONS_KEY {
                permissions = parse_permissions(&label, value)?;
                continue;
            }
            properties.insert(name.clone(), classify_property(&label, name, value)?);
        }

        Ok(Self {
            id,
            label,
            app_label: string_field(map, "app_label"),
            model_name: string_field(map, "model_name"),
            properties,
            permissions,
        })
    }

    /// Outgoing relations as `(property name, target)` pairs, in property order.
    pub fn relations(&self) -> impl Iterator<Item = (&str, &RelationTarget)> {
        self.properties
            .iter()
            .filter_map(|(name, prop)| match prop {
                SchemaProperty::Relation { targets } => Some((name.as_str(), targets)),
                SchemaProperty::Scalar { .. } => None,
            })
            .flat_map(|(name, targets)| targets.iter().map(move |t| (name, t)))
    }

    pub fn scalar(&self, name: &str) -> Option<&Value> {
        match self.properties.get(name)? {
            SchemaProperty::Scalar { value } => Some(value),
            SchemaProperty::Relation { .. } => None,
        }
    }

    /// Natural key of the node's content type, `"{app_label}.{model_name}"`.
    pub fn content_type(&self) -> Option<String> {
        match (self.app_label.as_deref(), self.model_name.as_deref()) {
            (Some(app), Some(model)) if !app.is_empty() && !model.is_empty() => {
                Some(format!("{}.{}", app, model))
            }
            _ => None,
        }
    }

    /// True when `name` is this node's label or its content type natural key.
    pub fn answers_to(&self, name: &str) -> bool {
        self.label == name || self.content_type().as_deref() == Some(name)
    }
}

fn is_tagged(map: &Map<String, Value>) -> bool {
    matches!(
        map.get("properties"),
        Some(Value::Object(props)) if props.values().all(|p| p.get("kind").is_some())
    )
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn parse_permissions(label: &str, value: &Value) -> Result<Vec<String>, IngestError> {
    let malformed = || IngestError::MalformedPermissions {
        label: label.to_string(),
    };
    value
        .as_array()
        .ok_or_else(malformed)?
        .iter()
        .map(|p| p.as_str().map(str::to_string).ok_or_else(malformed))
        .collect()
}

fn classify_property(label: &str, name: &str, value: &Value) -> Result<SchemaProperty, IngestError> {
    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
            let targets = items
                .iter()
                .map(|item| RelationTarget::from_value(label, name, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SchemaProperty::Relation { targets })
        }
        Value::Object(obj) if obj.contains_key("to") => Ok(SchemaProperty::Relation {
            targets: vec![RelationTarget::from_value(label, name, value)?],
        }),
        other => Ok(SchemaProperty::Scalar {
            value: other.clone(),
        }),
    }
}

// ============================================================================
// NODE LIST
// ============================================================================

/// Simplified `label -> relation names` mapping served by the node list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeList(pub IndexMap<String, Vec<String>>);

impl NodeList {
    pub fn contains(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    pub fn relations(&self, label: &str) -> Option<&[String]> {
        self.0.get(label).map(Vec::as_slice)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
