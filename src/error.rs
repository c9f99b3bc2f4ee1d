//! Error types for the collaborators around the layout core.
//!
//! Provider failures carry an `ErrorKind` so callers can tell a retryable
//! hiccup (timeout, 429, 5xx) from a request that will never succeed.

use serde::Serialize;
use thiserror::Error;

/// Whether retrying the same request can succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Transient,
    Permanent,
}

/// Failure talking to an external OCR, language-model or embedding service.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} is not configured: {reason}")]
    NotConfigured {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} request failed: {message}")]
    Request {
        provider: &'static str,
        kind: ErrorKind,
        message: String,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an unusable response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::NotConfigured { .. } => ErrorKind::Permanent,
            ProviderError::Request { kind, .. } => *kind,
            ProviderError::Status { status, .. } => status_kind(*status),
            ProviderError::InvalidResponse { .. } => ErrorKind::Permanent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    pub fn not_configured(provider: &'static str, reason: impl Into<String>) -> Self {
        ProviderError::NotConfigured {
            provider,
            reason: reason.into(),
        }
    }

    pub fn invalid_response(provider: &'static str, message: impl Into<String>) -> Self {
        ProviderError::InvalidResponse {
            provider,
            message: message.into(),
        }
    }

    /// Classify a transport-level reqwest failure.
    pub fn from_reqwest(provider: &'static str, err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return ProviderError::Status {
                provider,
                status: status.as_u16(),
                body: err.to_string(),
            };
        }
        let kind = if err.is_timeout() || err.is_connect() || err.is_request() {
            ErrorKind::Transient
        } else {
            ErrorKind::Permanent
        };
        ProviderError::Request {
            provider,
            kind,
            message: err.to_string(),
        }
    }

    /// Non-success HTTP status with a (truncated) body for context.
    pub fn from_status(provider: &'static str, status: u16, body: &str) -> Self {
        ProviderError::Status {
            provider,
            status,
            body: truncate(body, 200).to_string(),
        }
    }
}

/// 408, 429 and 5xx are worth retrying; every other status is final.
pub fn status_kind(status: u16) -> ErrorKind {
    match status {
        408 | 429 => ErrorKind::Transient,
        500..=599 => ErrorKind::Transient,
        _ => ErrorKind::Permanent,
    }
}

/// Truncate on a char boundary so log lines never split a code point.
pub fn truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{what} '{id}' not found")]
    NotFound { what: &'static str, id: String },
}

/// Everything the ingestion pipeline can fail with.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("could not decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Provider(e) => e.kind(),
            _ => ErrorKind::Permanent,
        }
    }
}
