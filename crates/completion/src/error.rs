//! Errors raised by completion providers and their configuration.
//!
//! Config problems are startup errors; everything else is a per-request
//! failure that the caller is expected to surface, not retry.

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompletionError>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("completion transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion endpoint returned HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    #[error("completion response could not be decoded: {0}")]
    Decode(String),

    #[error("completion response contained no choices")]
    EmptyChoices,
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("unsupported completion provider: {0}")]
    UnsupportedProvider(String),

    #[error("invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },

    #[error("invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    #[error("completion model name must not be empty")]
    EmptyModel,
}

/// Trims a response body for logs and error messages.
pub(crate) fn make_snippet(body: &str) -> String {
    const MAX: usize = 240;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX {
        return trimmed.to_string();
    }
    let mut snippet = trimmed.chars().take(MAX).collect::<String>();
    snippet.push('…');
    snippet
}
