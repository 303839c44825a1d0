//! Backend error types

use thiserror::Error;

/// Backend error with classification
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Rejected { status }, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Transport, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Timeout, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Malformed, message)
    }

    /// HTTP status when the backend answered with a non-success response
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            BackendErrorKind::Rejected { status } => Some(status),
            _ => None,
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The service answered with a non-success status
    Rejected { status: u16 },
    /// The request never completed (connection refused, reset, DNS)
    Transport,
    /// The transport gave up waiting
    Timeout,
    /// Success status but the body could not be decoded
    Malformed,
}

impl BackendErrorKind {
    /// Whether the request failed before any response arrived
    pub fn is_unreachable(self) -> bool {
        matches!(self, Self::Transport | Self::Timeout)
    }
}
