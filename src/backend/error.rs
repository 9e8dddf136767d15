//! Backend error types and handling

use crate::core::AnchorId;
use thiserror::Error;

/// Failures reported by a native anchor backend
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// Backend was shut down or never started
    #[error("anchor backend is not running")]
    NotRunning,
    /// Backend refused to start tracking a payload
    #[error("backend rejected tracking request: {reason}")]
    TrackingRejected { reason: String },
    /// Backend does not know the anchor
    #[error("backend has no anchor {id}")]
    UnknownAnchor { id: AnchorId },
    /// Native error code passed through unchanged
    #[error("native backend error {code}: {message}")]
    Native { code: i32, message: String },
}

impl BackendError {
    /// Transient errors may succeed if the call is repeated on a later tick
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Native { .. })
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
