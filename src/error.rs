//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Text or image service answered non-2xx, or could not be reached.
    #[error("Upstream error{}: {message}", fmt_status(.status))]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// Model output that is not the expected JSON document, even after
    /// fence stripping. `raw` is the untouched model text.
    #[error("Malformed model response: {message}")]
    MalformedResponse { message: String, raw: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Story storage error: {0}")]
    Storage(String),
}

impl Error {
    pub fn upstream(status: impl Into<Option<u16>>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status: status.into(),
            message: message.into(),
        }
    }

    /// Detail string suitable for the `details` field of an API error body.
    pub fn details(&self) -> Option<String> {
        match self {
            Error::MalformedResponse { raw, .. } => Some(raw.clone()),
            Error::Upstream { message, .. } => Some(message.clone()),
            Error::Configuration(message) => Some(message.clone()),
            _ => None,
        }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" (status {})", s))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_display_includes_status() {
        let err = Error::upstream(503, "unavailable");
        assert_eq!(err.to_string(), "Upstream error (status 503): unavailable");

        let err = Error::upstream(None, "connection refused");
        assert_eq!(err.to_string(), "Upstream error: connection refused");
    }

    #[test]
    fn test_malformed_details_carry_raw_text() {
        let err = Error::MalformedResponse {
            message: "expected value".to_string(),
            raw: "not json".to_string(),
        };
        assert_eq!(err.details().as_deref(), Some("not json"));
    }
}
