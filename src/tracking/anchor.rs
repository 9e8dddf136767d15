//! The long-lived anchor entity and its pose pipeline

use crate::core::{AnchorId, AnchorPayload, NativeTrackingState, Pose, RawObservation, TrackingState, TrackingStateReason};
use crate::processing::{PoseInterpolator, PoseSmoother};
use crate::tracking::events::{AnchorChangeEvent, AnchorSnapshot, ChangeKind};
use crate::tracking::reconciler::ReconcilerSettings;
use crate::tracking::state::{AnchorTrackingState, StateTransition};

/// A persistent anchor owned by the registry
#[derive(Debug, Clone)]
pub struct PersistentAnchor {
    id: AnchorId,
    payload: AnchorPayload,
    tracking: AnchorTrackingState,
    /// Latest backend pose from a Limited or Tracking sample
    raw_pose: Option<Pose>,
    /// Temporally fused pose; set by the first Tracking sample
    fused_pose: Option<Pose>,
    /// Pose handed to clients
    rendered_pose: Option<Pose>,
    smoother: PoseSmoother,
    interpolator: Option<PoseInterpolator>,
    confidence: f32,
    timestamp_ms: Option<u64>,
    /// Whether an `Added` event has gone out for this anchor
    announced: bool,
    last_emitted: Option<AnchorSnapshot>,
}

impl PersistentAnchor {
    pub fn new(id: AnchorId, payload: AnchorPayload, fusion_window: usize) -> Self {
        Self {
            id,
            payload,
            tracking: AnchorTrackingState::new(),
            raw_pose: None,
            fused_pose: None,
            rendered_pose: None,
            smoother: PoseSmoother::new(fusion_window),
            interpolator: None,
            confidence: 0.0,
            timestamp_ms: None,
            announced: false,
            last_emitted: None,
        }
    }

    pub fn id(&self) -> AnchorId {
        self.id
    }

    pub fn payload(&self) -> &AnchorPayload {
        &self.payload
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.tracking.state()
    }

    pub fn tracking_state_reason(&self) -> TrackingStateReason {
        self.tracking.reason()
    }

    pub fn raw_pose(&self) -> Option<Pose> {
        self.raw_pose
    }

    pub fn fused_pose(&self) -> Option<Pose> {
        self.fused_pose
    }

    /// Pose clients should render (interpolated when interpolation is on)
    pub fn pose(&self) -> Option<Pose> {
        self.rendered_pose
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn timestamp_ms(&self) -> Option<u64> {
        self.timestamp_ms
    }

    pub fn is_announced(&self) -> bool {
        self.announced
    }

    pub fn smoother(&self) -> &PoseSmoother {
        &self.smoother
    }

    pub fn interpolator(&self) -> Option<&PoseInterpolator> {
        self.interpolator.as_ref()
    }

    /// First backend report for this anchor; the pose snaps with no smoothing
    pub(crate) fn seed(&mut self, observation: &RawObservation, settings: &ReconcilerSettings) {
        self.tracking
            .apply(observation.tracking_state, observation.tracking_state_reason);
        self.record_sample(observation);
        self.announced = true;

        if observation.tracking_state == NativeTrackingState::None {
            return;
        }

        let pose = observation.pose;
        self.raw_pose = Some(pose);
        if observation.tracking_state == NativeTrackingState::Tracking {
            self.fused_pose = Some(if settings.temporal_fusion_enabled {
                self.smoother.push(pose)
            } else {
                pose
            });
        }
        self.snap_to(pose, settings);
    }

    /// Subsequent backend report: state machine, then the pose pipeline
    pub(crate) fn observe(&mut self, observation: &RawObservation, settings: &ReconcilerSettings) -> StateTransition {
        let transition = self
            .tracking
            .apply(observation.tracking_state, observation.tracking_state_reason);
        if transition == StateTransition::Frozen {
            return transition;
        }
        self.record_sample(observation);

        let pose = observation.pose;
        let target = match observation.tracking_state {
            NativeTrackingState::None => {
                let lost = matches!(transition, StateTransition::Changed { from, .. } if from != TrackingState::None);
                if lost && settings.temporal_fusion_enabled {
                    if let Some(last) = self.rendered_pose {
                        self.smoother.clear(last);
                        self.fused_pose = Some(last);
                    }
                }
                return transition;
            }
            NativeTrackingState::Tracking => {
                let fused = if settings.temporal_fusion_enabled {
                    self.smoother.push(pose)
                } else {
                    pose
                };
                self.fused_pose = Some(fused);
                fused
            }
            NativeTrackingState::Limited => {
                if settings.temporal_fusion_enabled {
                    // Low-confidence samples never enter the fusion window.
                    self.fused_pose.unwrap_or(pose)
                } else {
                    pose
                }
            }
        };
        self.raw_pose = Some(pose);

        if self.rendered_pose.is_none() {
            self.snap_to(target, settings);
        } else if settings.interpolation_enabled {
            let current = self.rendered_pose.unwrap_or(target);
            self.interpolator
                .get_or_insert_with(|| PoseInterpolator::new(current, settings.interpolation_duration_s))
                .retarget(target);
        } else {
            self.rendered_pose = Some(target);
        }
        transition
    }

    /// Advance interpolation by one host frame
    pub(crate) fn advance(&mut self, delta_time_s: f64, settings: &ReconcilerSettings) {
        if !settings.interpolation_enabled || self.tracking.is_removed() {
            return;
        }
        if let Some(interpolator) = self.interpolator.as_mut() {
            self.rendered_pose = Some(interpolator.advance(delta_time_s));
        }
    }

    /// Terminal removal; later backend reports are ignored
    pub(crate) fn force_removed(&mut self) -> StateTransition {
        self.tracking.force_removed(TrackingStateReason::Removed)
    }

    /// Build an event of `kind` if it should go out.
    ///
    /// `Added` and `Removed` are always emitted; `Updated` only when the
    /// observable snapshot differs from the last emitted one.
    pub(crate) fn take_event(&mut self, kind: ChangeKind) -> Option<AnchorChangeEvent> {
        let snapshot = self.snapshot();
        if kind == ChangeKind::Updated && self.last_emitted == Some(snapshot) {
            return None;
        }
        self.last_emitted = Some(snapshot);
        Some(AnchorChangeEvent {
            kind,
            anchor: self.id,
            tracking_state: snapshot.tracking_state,
            tracking_state_reason: snapshot.tracking_state_reason,
            pose: snapshot.pose,
            confidence: self.confidence,
            timestamp_ms: self.timestamp_ms.unwrap_or(0),
        })
    }

    fn snapshot(&self) -> AnchorSnapshot {
        AnchorSnapshot {
            tracking_state: self.tracking.state(),
            tracking_state_reason: self.tracking.reason(),
            pose: self.rendered_pose,
        }
    }

    fn snap_to(&mut self, pose: Pose, settings: &ReconcilerSettings) {
        self.rendered_pose = Some(pose);
        if settings.interpolation_enabled {
            match self.interpolator.as_mut() {
                Some(interpolator) => interpolator.snap(pose),
                None => {
                    self.interpolator = Some(PoseInterpolator::new(pose, settings.interpolation_duration_s));
                }
            }
        }
    }

    fn record_sample(&mut self, observation: &RawObservation) {
        self.confidence = observation.confidence;
        if observation.timestamp_ms >= 0 {
            self.timestamp_ms = Some(observation.timestamp_ms as u64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn settings(fusion: bool, interpolation: bool) -> ReconcilerSettings {
        ReconcilerSettings {
            temporal_fusion_enabled: fusion,
            interpolation_enabled: interpolation,
            fusion_window_size: 5,
            interpolation_duration_s: 1.0,
        }
    }

    fn anchor() -> PersistentAnchor {
        PersistentAnchor::new(AnchorId::from_u128(1), AnchorPayload::from_bytes(vec![1, 2]), 5)
    }

    fn limited(pose: Pose, ts: i64) -> RawObservation {
        RawObservation::tracking(pose, ts)
            .with_state(NativeTrackingState::Limited, TrackingStateReason::InsufficientFeatures)
    }

    #[test]
    fn test_seed_snaps_even_with_smoothing() {
        let s = settings(true, true);
        let mut a = anchor();
        let pose = Pose::from_position(3.0, 2.0, 1.0);
        a.seed(&RawObservation::tracking(pose, 10), &s);
        assert_eq!(a.pose(), Some(pose));
        assert_eq!(a.fused_pose(), Some(pose));
        a.advance(0.1, &s);
        assert_eq!(a.pose(), Some(pose));
    }

    #[test]
    fn test_seed_without_localization_has_no_pose() {
        let s = settings(false, false);
        let mut a = anchor();
        let observation = RawObservation::tracking(Pose::from_position(1.0, 0.0, 0.0), 0)
            .with_state(NativeTrackingState::None, TrackingStateReason::Initializing);
        a.seed(&observation, &s);
        assert_eq!(a.pose(), None);
        assert!(a.is_announced());
    }

    #[test]
    fn test_limited_reuses_fused_pose() {
        let s = settings(true, false);
        let mut a = anchor();
        a.seed(&RawObservation::tracking(Pose::from_position(0.0, 0.0, 0.0), 0), &s);
        a.observe(&RawObservation::tracking(Pose::from_position(2.0, 0.0, 0.0), 1), &s);
        let fused = a.pose().unwrap();
        assert_relative_eq!(fused.position, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);

        a.observe(&limited(Pose::from_position(50.0, 0.0, 0.0), 2), &s);
        assert_eq!(a.pose(), Some(fused));
        assert_eq!(a.smoother().len(), 2);
        assert_eq!(a.raw_pose(), Some(Pose::from_position(50.0, 0.0, 0.0)));
    }

    #[test]
    fn test_tracking_loss_clears_window_to_last_pose() {
        let s = settings(true, false);
        let mut a = anchor();
        a.seed(&RawObservation::tracking(Pose::from_position(1.0, 0.0, 0.0), 0), &s);
        a.observe(&RawObservation::tracking(Pose::from_position(3.0, 0.0, 0.0), 1), &s);
        let last = a.pose().unwrap();

        let lost = RawObservation::tracking(Pose::identity(), 2)
            .with_state(NativeTrackingState::None, TrackingStateReason::Relocalizing);
        a.observe(&lost, &s);
        assert!(a.smoother().is_empty());
        assert_eq!(a.smoother().fused(), Some(last));
        assert_eq!(a.pose(), Some(last));

        let regained = a.observe(&RawObservation::tracking(Pose::from_position(9.0, 0.0, 0.0), 3), &s);
        assert!(matches!(regained, StateTransition::Changed { to: TrackingState::Tracking, .. }));
        assert_eq!(a.pose(), Some(Pose::from_position(9.0, 0.0, 0.0)));
    }

    #[test]
    fn test_interpolation_retargets_from_rendered_pose() {
        let s = settings(false, true);
        let mut a = anchor();
        a.seed(&RawObservation::tracking(Pose::from_position(0.0, 0.0, 0.0), 0), &s);
        a.observe(&RawObservation::tracking(Pose::from_position(10.0, 0.0, 0.0), 1), &s);
        assert_eq!(a.pose(), Some(Pose::from_position(0.0, 0.0, 0.0)));
        a.advance(0.5, &s);
        assert_relative_eq!(a.pose().unwrap().position.x, 5.0, epsilon = 1e-12);
        a.advance(0.5, &s);
        assert_eq!(a.pose(), Some(Pose::from_position(10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_updated_event_only_on_change() {
        let s = settings(false, false);
        let mut a = anchor();
        a.seed(&RawObservation::tracking(Pose::from_position(1.0, 0.0, 0.0), 0), &s);
        assert!(a.take_event(ChangeKind::Added).is_some());

        a.observe(&RawObservation::tracking(Pose::from_position(1.0, 0.0, 0.0), 1), &s);
        assert!(a.take_event(ChangeKind::Updated).is_none());

        a.observe(&RawObservation::tracking(Pose::from_position(1.5, 0.0, 0.0), 2), &s);
        let event = a.take_event(ChangeKind::Updated).unwrap();
        assert_eq!(event.pose, Some(Pose::from_position(1.5, 0.0, 0.0)));
        assert_eq!(event.timestamp_ms, 2);
    }

    #[test]
    fn test_removed_anchor_ignores_reports() {
        let s = settings(false, false);
        let mut a = anchor();
        a.seed(&RawObservation::tracking(Pose::from_position(1.0, 0.0, 0.0), 0), &s);
        a.force_removed();
        let transition = a.observe(&RawObservation::tracking(Pose::from_position(7.0, 0.0, 0.0), 1), &s);
        assert_eq!(transition, StateTransition::Frozen);
        assert_eq!(a.pose(), Some(Pose::from_position(1.0, 0.0, 0.0)));
        assert_eq!(a.tracking_state_reason(), TrackingStateReason::Removed);
    }
}
