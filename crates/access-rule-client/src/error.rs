//! Transport error types.

use thiserror::Error;

/// Generic text shown to the user for any transport failure.
pub const BAD_RESPONSE_MESSAGE: &str = "Bad response from the server";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl TransportError {
    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// User-facing message. Transport failures are not distinguished in the UI.
    pub fn user_message(&self) -> &'static str {
        BAD_RESPONSE_MESSAGE
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Http {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            Self::Network(e.to_string())
        }
    }
}
