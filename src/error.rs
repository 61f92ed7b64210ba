//! Error handling for the graph state core
//!
//! Pure transforms (normalizer, selection, codec) return these errors
//! synchronously. Failures of asynchronous side effects are carried inside
//! result events as [`TaskError`].

use access_rule_client::TransportError;
use access_rule_types::IngestError;
use thiserror::Error;

/// Normalization failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// A relation references a label absent from the schema (reject policy only).
    #[error("Dangling relation: {source_label}.{property} -> {to} (target not found in schema)")]
    DanglingRelation {
        source_label: String,
        property: String,
        to: String,
    },
}

/// Why a toggle would break the single-simple-path shape of the selection.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathViolation {
    #[error("edge would branch the selected path")]
    Branch,

    #[error("edge would close a cycle in the selected path")]
    Cycle,

    #[error("edge does not touch the selected path")]
    Disconnected,

    #[error("only the first or last edge of the selected path can be removed")]
    Split,
}

/// Selection State Machine failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No schema graph loaded")]
    NoGraph,

    #[error("Unknown node id {0}")]
    UnknownNode(i64),

    #[error("Unknown edge {source_index} -> {target_index}")]
    UnknownEdge {
        source_index: usize,
        target_index: usize,
    },

    #[error("Invalid path: {0}")]
    Path(#[from] PathViolation),
}

/// Rule Codec failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("A rule needs a source and a target node, {count} selected")]
    TooFewNodes { count: usize },

    #[error("Node '{label}' has no content type (app_label/model_name)")]
    MissingContentType { label: String },

    #[error("Selected endpoints '{source_label}' -> '{target_label}' do not match the selected path")]
    EndpointMismatch {
        source_label: String,
        target_label: String,
    },

    #[error("Malformed content type '{0}', expected 'app_label.model'")]
    MalformedContentType(String),

    #[error("Malformed permission '{0}', expected 'app_label.codename'")]
    MalformedPermission(String),
}

/// Dropdown control failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlsError {
    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    #[error("Choose a source node first")]
    NoSourceNode,
}

/// Widget runtime failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Widget runtime has shut down")]
    ShutDown,

    #[error("Widget store task failed: {0}")]
    StoreFailed(String),
}

/// Failure carried by a result event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl TaskError {
    /// Message to surface to the operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { .. } => access_rule_client::error::BAD_RESPONSE_MESSAGE.to_string(),
            Self::Validation { message } => message.clone(),
        }
    }
}

impl From<TransportError> for TaskError {
    fn from(error: TransportError) -> Self {
        Self::Transport {
            status: error.status(),
            message: error.to_string(),
        }
    }
}

impl From<CodecError> for TaskError {
    fn from(error: CodecError) -> Self {
        Self::Validation {
            message: error.to_string(),
        }
    }
}
