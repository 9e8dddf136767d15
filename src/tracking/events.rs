//! Change notifications emitted by the reconciler

use crate::core::{AnchorId, Pose, TrackingState, TrackingStateReason};
use serde::{Deserialize, Serialize};

/// What happened to an anchor during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Updated,
    Removed,
}

/// One observable change to one anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorChangeEvent {
    pub kind: ChangeKind,
    pub anchor: AnchorId,
    pub tracking_state: TrackingState,
    pub tracking_state_reason: TrackingStateReason,
    /// Rendered pose; `None` until the anchor has been localized
    pub pose: Option<Pose>,
    pub confidence: f32,
    /// Timestamp of the backend sample behind this state
    pub timestamp_ms: u64,
}

/// The observable part of an anchor, used to detect real changes
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AnchorSnapshot {
    pub tracking_state: TrackingState,
    pub tracking_state_reason: TrackingStateReason,
    pub pose: Option<Pose>,
}
