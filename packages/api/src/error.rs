//! Errors from the processing backend API layer.

use podcast_core::SchemaError;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Schema(#[from] SchemaError),

    /// The call was rejected before reaching the network.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Request(_))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Build a [`ApiError::Backend`] from a failed response, preferring the
/// structured `{"error": ...}` message over the raw body.
pub(crate) fn backend_error(status: reqwest::StatusCode, body: &str) -> ApiError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    ApiError::Backend {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn structured_error_body_wins() {
        let err = backend_error(StatusCode::BAD_REQUEST, r#"{"error":"Invalid RSS URL"}"#);
        assert!(matches!(
            err,
            ApiError::Backend { status: 400, ref message } if message == "Invalid RSS URL"
        ));
    }

    #[test]
    fn falls_back_to_raw_text_then_reason() {
        let raw = backend_error(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert!(matches!(raw, ApiError::Backend { ref message, .. } if message == "upstream down"));

        let empty = backend_error(StatusCode::NOT_FOUND, "");
        assert!(matches!(empty, ApiError::Backend { ref message, .. } if message == "Not Found"));
    }
}
