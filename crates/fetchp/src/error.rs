//! Error types for Fetchp

use crate::hooks::HookKind;
use thiserror::Error;

/// Error returned by a hook callback
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while orchestrating a request
///
/// Transport failures are kept as strings so a single in-flight result can
/// be handed to every call that shares it through the cache.
#[derive(Debug, Clone, Error)]
pub enum FetchpError {
    /// URL could not be parsed, or could not be resolved against the base URL
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// HTTP method is not a valid token
    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    /// Header name or value is malformed
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    /// URL template could not be compiled
    #[error("Invalid URL template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client: {0}")]
    ClientBuildError(String),

    /// Failed to connect to server
    #[error("Failed to connect to server: {0}")]
    ConnectError(String),

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),

    /// The transport observed the cancellation signal
    #[error("Request canceled")]
    Canceled,

    /// A lifecycle hook rejected
    #[error("{kind} hook failed: {message}")]
    Hook { kind: HookKind, message: String },

    /// Body could not be decoded into the requested type
    #[error("Failed to deserialize response body: {0}")]
    Deserialize(String),
}

impl FetchpError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_connect() {
            FetchpError::ConnectError(err.to_string())
        } else if err.is_builder() {
            FetchpError::RequestError(format!("invalid request: {err}"))
        } else {
            FetchpError::RequestError(err.to_string())
        }
    }

    /// Wrap a failed hook callback
    pub fn from_hook(kind: HookKind, err: HookError) -> Self {
        FetchpError::Hook {
            kind,
            message: err.to_string(),
        }
    }

    /// True when the error only reports that the call was canceled
    pub fn is_canceled(&self) -> bool {
        matches!(self, FetchpError::Canceled)
    }
}

impl From<serde_json::Error> for FetchpError {
    fn from(err: serde_json::Error) -> Self {
        FetchpError::Deserialize(err.to_string())
    }
}
