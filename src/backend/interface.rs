//! Native anchor backend trait and configuration

use crate::backend::BackendResult;
use crate::core::{AnchorBatch, AnchorId, AnchorPayload};
use serde::{Deserialize, Serialize};

/// Abstraction over the native VPS/SLAM anchor backend
pub trait AnchorBackend {
    /// Apply localization settings
    fn configure(&mut self, config: &BackendConfig) -> BackendResult<()>;

    /// Begin localizing a payload; returns the id the backend will report it under
    fn start_tracking(&mut self, payload: &AnchorPayload) -> BackendResult<AnchorId>;

    /// Stop localizing an anchor
    fn stop_tracking(&mut self, id: AnchorId) -> BackendResult<()>;

    /// Drain the added/updated/removed records accumulated since the last call.
    /// Returns an empty batch if nothing changed.
    fn poll_changes(&mut self) -> BackendResult<AnchorBatch>;

    /// Check whether the backend accepts requests
    fn is_running(&self) -> bool;

    /// Release native resources; the backend stops accepting requests
    fn shutdown(&mut self);
}

/// Localization settings forwarded to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Keep localizing after the first success
    pub continuous_localization_enabled: bool,
    /// Request rate cap; 0 leaves the backend default
    pub max_localization_requests_per_second: f32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            continuous_localization_enabled: true,
            max_localization_requests_per_second: 0.0,
        }
    }
}
