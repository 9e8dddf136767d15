//! Persistent Anchors
//!
//! Tracking core for cloud-localized persistent anchors: reconciles the
//! native backend's added/updated/removed batches into a stable registry,
//! optionally fuses and interpolates poses, and notifies subscribers of
//! every observable change.

pub mod core;
pub mod processing;
pub mod tracking;
pub mod validation;
pub mod utils;
pub mod backend;
pub mod api;

// Re-export commonly used types
pub use core::{
    AnchorBatch, AnchorId, AnchorPayload, NativeTrackingState, Pose, RawAnchorRecord, RawObservation,
    TrackingState, TrackingStateReason,
};
pub use processing::{PoseInterpolator, PoseSmoother};
pub use tracking::{AnchorChangeEvent, AnchorReconciler, ChangeKind, IngestReport, PersistentAnchor, ReconcilerSettings};
pub use validation::AnchorError;
pub use utils::{AnchorManagerConfig, ConfigError, ConfigurationManager};
pub use backend::{AnchorBackend, BackendConfig, BackendError, MockBackend};
pub use api::{ApiError, ApiResult, IngestSummary, PersistentAnchorManager, SubscriptionHandle};
