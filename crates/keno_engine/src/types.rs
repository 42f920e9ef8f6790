use std::fmt;

use keno_core::FailureReason;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Why `RunAccumulator::start` did not finish normally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    /// The trigger call failed or was answered with a non-success status.
    #[error("trigger request failed: {0}")]
    Request(FetchError),
    /// The response body errored while it was being read.
    #[error("stream transport failed: {0}")]
    Transport(FetchError),
    #[error("run cancelled")]
    Cancelled,
    #[error("a run is already in progress")]
    AlreadyRunning,
}

impl RunError {
    /// Reason recorded on the run, or `None` when the run was never started.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            RunError::Request(_) => Some(FailureReason::Request),
            RunError::Transport(_) => Some(FailureReason::Transport),
            RunError::Cancelled => Some(FailureReason::Cancelled),
            RunError::AlreadyRunning => None,
        }
    }
}
