//! Core data types for the anchor tracking pipeline

use crate::core::payload::AnchorPayload;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Backend-issued identifier of a persistent anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(Uuid);

impl AnchorId {
    /// Mint a fresh random identifier
    pub fn new_random() -> Self {
        AnchorId(Uuid::new_v4())
    }

    pub fn from_u128(value: u128) -> Self {
        AnchorId(Uuid::from_u128(value))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for AnchorId {
    fn from(value: Uuid) -> Self {
        AnchorId(value)
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Rigid transform of an anchor in session space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in meters
    pub position: Vector3<f64>,
    /// Orientation
    pub rotation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), UnitQuaternion::identity())
    }

    /// Pose at `(x, y, z)` with identity orientation
    pub fn from_position(x: f64, y: f64, z: f64) -> Self {
        Self::new(Vector3::new(x, y, z), UnitQuaternion::identity())
    }

    /// True when no component is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.rotation.coords.iter().all(|v| v.is_finite())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tracking state as reported by the native backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NativeTrackingState {
    #[default]
    None,
    Limited,
    Tracking,
}

/// Tracking state exposed on an anchor; `Removed` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackingState {
    #[default]
    None,
    Limited,
    Tracking,
    Removed,
}

impl From<NativeTrackingState> for TrackingState {
    fn from(state: NativeTrackingState) -> Self {
        match state {
            NativeTrackingState::None => TrackingState::None,
            NativeTrackingState::Limited => TrackingState::Limited,
            NativeTrackingState::Tracking => TrackingState::Tracking,
        }
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackingState::None => "none",
            TrackingState::Limited => "limited",
            TrackingState::Tracking => "tracking",
            TrackingState::Removed => "removed",
        };
        f.write_str(name)
    }
}

/// Why an anchor is not fully tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackingStateReason {
    #[default]
    None,
    Initializing,
    Relocalizing,
    InsufficientLight,
    InsufficientFeatures,
    ExcessiveMotion,
    Unsupported,
    /// Anchor was removed by the backend or destroyed by the caller
    Removed,
}

/// One backend localization sample for an anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub pose: Pose,
    pub tracking_state: NativeTrackingState,
    pub tracking_state_reason: TrackingStateReason,
    /// Localization confidence in `0.0..=1.0`
    pub confidence: f32,
    /// Native timestamp; negative values are malformed
    pub timestamp_ms: i64,
}

impl RawObservation {
    /// Fully tracking sample with full confidence
    pub fn tracking(pose: Pose, timestamp_ms: i64) -> Self {
        Self {
            pose,
            tracking_state: NativeTrackingState::Tracking,
            tracking_state_reason: TrackingStateReason::None,
            confidence: 1.0,
            timestamp_ms,
        }
    }

    pub fn with_state(mut self, state: NativeTrackingState, reason: TrackingStateReason) -> Self {
        self.tracking_state = state;
        self.tracking_state_reason = reason;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

/// Observation tagged with the anchor it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAnchorRecord {
    pub id: AnchorId,
    pub payload: AnchorPayload,
    pub observation: RawObservation,
}

impl RawAnchorRecord {
    pub fn new(id: AnchorId, payload: AnchorPayload, observation: RawObservation) -> Self {
        Self { id, payload, observation }
    }
}

/// Changes reported by the backend for one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorBatch {
    pub added: Vec<RawAnchorRecord>,
    pub updated: Vec<RawAnchorRecord>,
    pub removed: Vec<AnchorId>,
}

impl AnchorBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_added(mut self, record: RawAnchorRecord) -> Self {
        self.added.push(record);
        self
    }

    pub fn with_updated(mut self, record: RawAnchorRecord) -> Self {
        self.updated.push(record);
        self
    }

    pub fn with_removed(mut self, id: AnchorId) -> Self {
        self.removed.push(id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Total number of records across all three lists
    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }
}
