//! Error types for autodeploy.

use std::time::Duration;
use thiserror::Error;

/// Webhook authentication failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingSignature,

    #[error("invalid signature")]
    InvalidSignature,
}

/// Failures turning verified bytes into a push event.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported event type: {0}")]
    UnsupportedEventType(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid ref {0:?}: expected refs/<kind>/<name>")]
    InvalidRef(String),
}

/// Why a deploy invocation did not succeed.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("failed to run remote command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(
        "remote command exited with {}",
        .code.map_or_else(|| "no exit code (killed by signal)".to_string(), |c| format!("code {c}"))
    )]
    Exited { code: Option<i32>, stderr: String },

    #[error("remote command timed out after {0:?}")]
    TimedOut(Duration),

    #[error("deploy task aborted: {0}")]
    Aborted(String),
}

impl DeployError {
    /// Standard error captured from the remote command, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            DeployError::Exited { stderr, .. } if !stderr.trim().is_empty() => Some(stderr),
            _ => None,
        }
    }
}
