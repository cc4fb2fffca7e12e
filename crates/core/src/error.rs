//! Error taxonomy shared by every market-data backend.
//!
//! Callers classify failures through this enum instead of matching on
//! backend-specific messages: `exists` and `supports_options` turn
//! not-found and shape errors into `false`, the estimator turns
//! [`ProviderError::Timeout`] into an absent prediction.

use thiserror::Error;

/// Errors that can occur when talking to a market-data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider has no such symbol or resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Request or search timed out.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Session is missing or was rejected.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Login was refused. Never carries credentials.
    #[error("login failed at {url}: {reason}")]
    LoginFailed {
        /// Login endpoint.
        url: String,
        /// Provider-supplied reason.
        reason: String,
    },

    /// API request failed.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error message from API.
        message: String,
    },

    /// Response did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Caller passed something the provider cannot accept.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Operation not offered by this backend.
    #[error("{operation} is not supported by {backend}")]
    Unsupported {
        /// Backend name.
        backend: &'static str,
        /// Operation name.
        operation: &'static str,
    },
}

impl ProviderError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Creates a login failure. `reason` must not contain secrets.
    pub fn login_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoginFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unsupported-operation error.
    pub fn unsupported(backend: &'static str, operation: &'static str) -> Self {
        Self::Unsupported { backend, operation }
    }

    /// Returns true if the provider reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api { status_code, .. } => *status_code == 404,
            _ => false,
        }
    }

    /// Returns true for lookup failures that mean "this ticker has no
    /// such data" rather than "the provider is unreachable".
    #[must_use]
    pub fn is_lookup_failure(&self) -> bool {
        match self {
            Self::NotFound(_) | Self::UnexpectedResponse(_) => true,
            Self::Api { status_code, .. } => (400..500).contains(status_code) && *status_code != 429,
            _ => false,
        }
    }

    /// Returns true if the error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            Self::Network(_) | Self::Timeout(_) => Some(1),
            Self::Api { status_code, .. } if *status_code >= 500 => Some(2),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::UnexpectedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::api(status.as_u16(), err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
