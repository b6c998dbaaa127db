//! Inter-service call errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    // === Explicit answers: the call reached the service and was refused ===
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("operation voided: {0}")]
    Voided(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    // === Unknown outcome: the call may or may not have taken effect ===
    #[error("upstream timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Map a non-success HTTP status and its body
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            404 => UpstreamError::NotFound(body),
            409 => UpstreamError::Conflict(body),
            410 => UpstreamError::Voided(body),
            422 => UpstreamError::InsufficientFunds(body),
            400..=499 => UpstreamError::Rejected { status, body },
            _ => UpstreamError::Status { status, body },
        }
    }

    /// Outcome unknown: safe to retry idempotent calls, never safe to assume
    /// the call had no effect.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            UpstreamError::Timeout
                | UpstreamError::Transport(_)
                | UpstreamError::Status { .. }
                | UpstreamError::Decode(_)
        )
    }

    /// Text safe to hand to a caller: the Users service's own response body
    /// when there was one, a fixed message otherwise. Transport errors carry
    /// internal addresses and are only logged.
    pub fn public_detail(&self) -> String {
        match self {
            UpstreamError::NotFound(b)
            | UpstreamError::Conflict(b)
            | UpstreamError::Voided(b)
            | UpstreamError::InsufficientFunds(b) => b.clone(),
            UpstreamError::Rejected { body, .. } | UpstreamError::Status { body, .. } => {
                body.clone()
            }
            UpstreamError::Timeout => "users service timed out".to_string(),
            UpstreamError::Transport(_) | UpstreamError::Decode(_) => {
                "users service unavailable".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_decode() {
            UpstreamError::Decode(e.to_string())
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}
