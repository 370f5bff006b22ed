use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const RATE_LIMIT_STATUS: u16 = 429;
const RATE_LIMIT_MARKER: &str = "429";

static RETRY_AFTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Retry-After:\s*(\d+)").expect("valid Retry-After regex"));

/// Failure of a single completion request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("429 Too Many Requests: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("no text output returned from model")]
    EmptyResponse,
    #[error("{0}")]
    Request(String),
}

/// How the retry loop should treat a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited { retry_after: Option<Duration> },
    Other,
}

impl CompletionError {
    /// Classifies an error that only exposes its text, e.g. one coming from an
    /// upstream client library.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains(RATE_LIMIT_MARKER) {
            let retry_after = parse_retry_after(&message);
            return CompletionError::RateLimited {
                retry_after,
                message,
            };
        }
        CompletionError::Request(message)
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            CompletionError::RateLimited { retry_after, .. } => FailureKind::RateLimited {
                retry_after: *retry_after,
            },
            CompletionError::Status { status, message } if *status == RATE_LIMIT_STATUS => {
                FailureKind::RateLimited {
                    retry_after: parse_retry_after(message),
                }
            }
            // Unstructured errors still get the text check.
            CompletionError::Request(message) if message.contains(RATE_LIMIT_MARKER) => {
                FailureKind::RateLimited {
                    retry_after: parse_retry_after(message),
                }
            }
            _ => FailureKind::Other,
        }
    }
}

/// Extracts the `Retry-After: <seconds>` hint from error text. Values that do
/// not fit in a `u64` are ignored.
pub fn parse_retry_after(text: &str) -> Option<Duration> {
    let caps = RETRY_AFTER_RE.captures(text)?;
    let seconds = caps.get(1)?.as_str().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}
