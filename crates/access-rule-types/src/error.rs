//! Ingestion error types.

use thiserror::Error;

/// Errors raised while classifying raw schema entries into [`crate::NodeDescriptor`]s.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    /// A schema entry is not a JSON object.
    #[error("Schema entry '{label}' is not an object")]
    NotAnObject {
        /// Key (or list position) of the offending entry.
        label: String,
    },

    /// A schema entry has no integer `id`.
    #[error("Schema entry '{label}' has no integer id")]
    MissingId { label: String },

    /// A list-shaped payload contained an entry without a `label`.
    #[error("Schema entry at position {position} has no label")]
    MissingLabel { position: usize },

    /// A relation property entry is missing `to` or `relation_type`.
    #[error("Malformed relation '{property}' on '{label}': {reason}")]
    MalformedRelation {
        label: String,
        property: String,
        reason: String,
    },

    /// The reserved permissions key is not a list of strings.
    #[error("Malformed default permissions on '{label}'")]
    MalformedPermissions { label: String },

    /// An entry claimed the tagged format but did not match it.
    #[error("Tagged schema entry '{label}' is invalid: {reason}")]
    InvalidTagged { label: String, reason: String },
}

impl IngestError {
    /// Label of the schema entry the error refers to, if known.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::NotAnObject { label }
            | Self::MissingId { label }
            | Self::MalformedRelation { label, .. }
            | Self::MalformedPermissions { label }
            | Self::InvalidTagged { label, .. } => Some(label),
            Self::MissingLabel { .. } => None,
        }
    }
}
