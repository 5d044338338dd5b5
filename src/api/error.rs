use crate::types::ErrorResponse;
use crate::util::is_local_endpoint_url;
use thiserror::Error;

/// Failures of the live stream transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("{0}")]
    Request(String),
    #[error("Stream connection failed: {status} {reason}")]
    Status { status: u16, reason: String },
    #[error("Stream response has no body")]
    MissingBody,
    #[error("Stream is already connected")]
    AlreadyConnected,
    #[error("Stream connection was cancelled")]
    Cancelled,
    #[error("{0}")]
    Read(String),
    #[error("invalid stream URL: {0}")]
    InvalidUrl(String),
}

/// Failures of the REST client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response carrying the backend's `{error, code}` body.
    #[error("{message}")]
    Server {
        message: String,
        code: Option<String>,
        status: u16,
    },
    #[error("API endpoint '{url}' returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("{message}")]
    Request {
        message: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode response from '{url}': {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Server { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } | ApiError::Status { status, .. } => Some(*status),
            ApiError::Request { source, .. } => source.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Maps a non-2xx response body to a typed error.
    pub fn from_error_body(url: &str, status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorResponse>(body) {
            Ok(ErrorResponse { error, code }) => ApiError::Server {
                message: error,
                code,
                status,
            },
            Err(_) => ApiError::Status {
                url: url.to_string(),
                status,
                body: String::from_utf8_lossy(body).trim().to_string(),
            },
        }
    }

    pub fn request(error: reqwest::Error, url: &str) -> Self {
        ApiError::Request {
            message: describe_request_error(&error, url),
            source: error,
        }
    }
}

/// Human-readable description of a reqwest failure, with a hint when the
/// target is a local backend that is probably not running.
pub fn describe_request_error(error: &reqwest::Error, request_url: &str) -> String {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return format!(
            "cannot reach local backend '{request_url}': {error}. Start your backend server or update CCUI_API_BASE_URL."
        );
    }
    if error.is_connect() {
        return format!("cannot reach backend '{request_url}': {error}");
    }
    if error.is_timeout() {
        return format!("request to '{request_url}' timed out: {error}");
    }
    if let Some(status) = error.status() {
        return format!("backend '{request_url}' returned HTTP {status}: {error}");
    }
    format!("request to '{request_url}' failed: {error}")
}
