//! Common API types and error handling

use crate::backend::BackendError;
use crate::utils::ConfigError;
use crate::validation::AnchorError;
use thiserror::Error;

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error(transparent)]
    Anchor(#[from] AnchorError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// No anchor has been localized in the current session
    #[error("no active VPS session")]
    NoActiveSession,
    /// Handle was never issued or was already released
    #[error("unknown subscription handle {handle}")]
    InvalidSubscription { handle: u32 },
    /// Manager was disposed
    #[error("anchor manager has been disposed")]
    Disposed,
}

/// Outcome of one tick or direct ingest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestSummary {
    /// Events delivered to subscribers
    pub dispatched: usize,
    /// Records skipped during reconciliation
    pub rejected: Vec<AnchorError>,
}

impl IngestSummary {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}
