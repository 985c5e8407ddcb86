//! Error type shared by the review engine and its collaborators.
//!
//! Fatal conditions surface as [`RevkError`] and abort the current run
//! before any state is written. Unanchorable annotations and unreadable
//! state records are not errors: they are logged where they occur and the
//! run carries on.

use thiserror::Error;

/// Errors returned by library functions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RevkError {
    #[error("unable to determine repository")]
    RepoNotFound,
    #[error("invalid reference")]
    InvalidRef,
    #[error("configuration error: {0}")]
    Config(Box<str>),
    #[error("configuration error: {0}")]
    ConfigLoad(#[from] std::sync::Arc<ortho_config::OrthoError>),
    #[error("request failed when running {context}: {source}")]
    RequestContext {
        context: Box<str>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("HTTP status {status} when running {context} | body snippet: {snippet}")]
    HttpStatus {
        status: u16,
        context: Box<str>,
        snippet: Box<str>,
    },
    #[error("malformed response: {message} | snippet: {snippet}")]
    MalformedResponse {
        message: Box<str>,
        snippet: Box<str>,
    },
    #[error("invalid review artifact {path}: {message}")]
    Artifact { path: Box<str>, message: Box<str> },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RevkError {
    /// Build a [`RevkError::Config`] from any message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into().into_boxed_str())
    }

    /// Whether a failed request is worth repeating.
    ///
    /// Connection failures, rate limiting and server errors are transient.
    /// Everything else (bad credentials, malformed payloads, missing
    /// resources) fails the same way on every attempt.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestContext { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
