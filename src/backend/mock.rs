//! Scriptable in-memory backend for tests and demos

use crate::backend::{AnchorBackend, BackendConfig, BackendError, BackendResult};
use crate::core::{
    AnchorBatch, AnchorId, AnchorPayload, NativeTrackingState, Pose, RawAnchorRecord, RawObservation,
    TrackingStateReason,
};
use std::collections::HashMap;
use std::mem;

#[derive(Debug, Clone)]
struct MockAnchor {
    payload: AnchorPayload,
    /// Whether an `added` record has been queued
    announced: bool,
    last: Option<RawObservation>,
    /// First Tracking pose; single-shot localization never moves past it
    fix: Option<Pose>,
}

/// Mock backend with deterministic ids and scripted localization results.
///
/// Tracking state can be set directly through [`MockBackend::set_tracking_state`].
#[derive(Debug)]
pub struct MockBackend {
    next_id: u128,
    running: bool,
    config: Option<BackendConfig>,
    tracked: HashMap<AnchorId, MockAnchor>,
    pending: AnchorBatch,
    stopped: Vec<AnchorId>,
    reject_reason: Option<String>,
    poll_failure: Option<BackendError>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a running mock backend; ids are issued from 1 upward
    pub fn new() -> Self {
        Self {
            next_id: 1,
            running: true,
            config: None,
            tracked: HashMap::new(),
            pending: AnchorBatch::default(),
            stopped: Vec::new(),
            reject_reason: None,
            poll_failure: None,
        }
    }

    /// Queue a localization result for a tracked anchor.
    ///
    /// The first result becomes an `added` record, later ones `updated`.
    pub fn report_localization(&mut self, id: AnchorId, observation: RawObservation) -> BackendResult<()> {
        let single_shot = self
            .config
            .as_ref()
            .map_or(false, |config| !config.continuous_localization_enabled);
        let anchor = self.tracked.get_mut(&id).ok_or(BackendError::UnknownAnchor { id })?;

        let mut observation = observation;
        if single_shot {
            match anchor.fix {
                Some(fix) => observation.pose = fix,
                None if observation.tracking_state == NativeTrackingState::Tracking => {
                    anchor.fix = Some(observation.pose);
                }
                None => {}
            }
        }

        let record = RawAnchorRecord::new(id, anchor.payload.clone(), observation.clone());
        if anchor.announced {
            self.pending.updated.push(record);
        } else {
            anchor.announced = true;
            self.pending.added.push(record);
        }
        anchor.last = Some(observation);
        Ok(())
    }

    /// Change an anchor's tracking state, keeping its last pose and timestamp
    pub fn set_tracking_state(
        &mut self,
        id: AnchorId,
        state: NativeTrackingState,
        reason: TrackingStateReason,
    ) -> BackendResult<()> {
        let anchor = self.tracked.get(&id).ok_or(BackendError::UnknownAnchor { id })?;
        let observation = anchor
            .last
            .clone()
            .unwrap_or_else(|| RawObservation::tracking(Pose::identity(), 0))
            .with_state(state, reason);
        self.report_localization(id, observation)
    }

    /// Backend-side removal, e.g. the anchor was invalidated
    pub fn report_removed(&mut self, id: AnchorId) -> BackendResult<()> {
        self.tracked.remove(&id).ok_or(BackendError::UnknownAnchor { id })?;
        self.pending.removed.push(id);
        Ok(())
    }

    /// Queue arbitrary records, bypassing the mock's bookkeeping
    pub fn push_raw_batch(&mut self, batch: AnchorBatch) {
        self.pending.added.extend(batch.added);
        self.pending.updated.extend(batch.updated);
        self.pending.removed.extend(batch.removed);
    }

    /// Make `start_tracking` fail with the given reason; `None` restores it
    pub fn reject_tracking(&mut self, reason: Option<String>) {
        self.reject_reason = reason;
    }

    /// Make the next `poll_changes` call fail once
    pub fn fail_next_poll(&mut self, error: BackendError) {
        self.poll_failure = Some(error);
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Settings most recently applied through `configure`
    pub fn config(&self) -> Option<&BackendConfig> {
        self.config.as_ref()
    }

    /// Ids passed to `stop_tracking`, in call order
    pub fn stopped_ids(&self) -> &[AnchorId] {
        &self.stopped
    }

    pub fn is_tracking(&self, id: AnchorId) -> bool {
        self.tracked.contains_key(&id)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    fn ensure_running(&self) -> BackendResult<()> {
        if self.running {
            Ok(())
        } else {
            Err(BackendError::NotRunning)
        }
    }
}

impl AnchorBackend for MockBackend {
    fn configure(&mut self, config: &BackendConfig) -> BackendResult<()> {
        self.ensure_running()?;
        self.config = Some(config.clone());
        Ok(())
    }

    fn start_tracking(&mut self, payload: &AnchorPayload) -> BackendResult<AnchorId> {
        self.ensure_running()?;
        if let Some(reason) = &self.reject_reason {
            return Err(BackendError::TrackingRejected { reason: reason.clone() });
        }

        let id = AnchorId::from_u128(self.next_id);
        self.next_id += 1;
        self.tracked.insert(
            id,
            MockAnchor {
                payload: payload.clone(),
                announced: false,
                last: None,
                fix: None,
            },
        );
        Ok(id)
    }

    fn stop_tracking(&mut self, id: AnchorId) -> BackendResult<()> {
        self.ensure_running()?;
        self.tracked.remove(&id).ok_or(BackendError::UnknownAnchor { id })?;
        self.pending.added.retain(|record| record.id != id);
        self.pending.updated.retain(|record| record.id != id);
        self.stopped.push(id);
        Ok(())
    }

    fn poll_changes(&mut self) -> BackendResult<AnchorBatch> {
        self.ensure_running()?;
        if let Some(error) = self.poll_failure.take() {
            return Err(error);
        }
        Ok(mem::take(&mut self.pending))
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn shutdown(&mut self) {
        self.running = false;
        self.tracked.clear();
        self.pending = AnchorBatch::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> AnchorPayload {
        AnchorPayload::from_bytes(vec![7u8; 16])
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut backend = MockBackend::new();
        let a = backend.start_tracking(&payload()).unwrap();
        let b = backend.start_tracking(&payload()).unwrap();
        assert_eq!(a, AnchorId::from_u128(1));
        assert_eq!(b, AnchorId::from_u128(2));
        assert_eq!(backend.tracked_count(), 2);
    }

    #[test]
    fn test_first_report_is_added_then_updated() {
        let mut backend = MockBackend::new();
        let id = backend.start_tracking(&payload()).unwrap();
        backend.report_localization(id, RawObservation::tracking(Pose::identity(), 1)).unwrap();
        backend.report_localization(id, RawObservation::tracking(Pose::identity(), 2)).unwrap();

        let batch = backend.poll_changes().unwrap();
        assert_eq!(batch.added.len(), 1);
        assert_eq!(batch.updated.len(), 1);
        assert!(backend.poll_changes().unwrap().is_empty());
    }

    #[test]
    fn test_set_tracking_state_keeps_pose() {
        let mut backend = MockBackend::new();
        let id = backend.start_tracking(&payload()).unwrap();
        let pose = Pose::from_position(1.0, 2.0, 3.0);
        backend.report_localization(id, RawObservation::tracking(pose, 5)).unwrap();
        backend
            .set_tracking_state(id, NativeTrackingState::Limited, TrackingStateReason::InsufficientLight)
            .unwrap();

        let batch = backend.poll_changes().unwrap();
        let update = &batch.updated[0].observation;
        assert_eq!(update.pose, pose);
        assert_eq!(update.timestamp_ms, 5);
        assert_eq!(update.tracking_state, NativeTrackingState::Limited);
    }

    #[test]
    fn test_single_shot_holds_first_fix() {
        let mut backend = MockBackend::new();
        backend
            .configure(&BackendConfig {
                continuous_localization_enabled: false,
                ..BackendConfig::default()
            })
            .unwrap();
        let id = backend.start_tracking(&payload()).unwrap();
        let fix = Pose::from_position(1.0, 0.0, 0.0);
        backend.report_localization(id, RawObservation::tracking(fix, 1)).unwrap();
        backend
            .report_localization(id, RawObservation::tracking(Pose::from_position(5.0, 0.0, 0.0), 2))
            .unwrap();

        let batch = backend.poll_changes().unwrap();
        assert_eq!(batch.updated[0].observation.pose, fix);
        assert_eq!(batch.updated[0].observation.timestamp_ms, 2);
    }

    #[test]
    fn test_stop_tracking_purges_pending_records() {
        let mut backend = MockBackend::new();
        let id = backend.start_tracking(&payload()).unwrap();
        backend.report_localization(id, RawObservation::tracking(Pose::identity(), 1)).unwrap();
        backend.stop_tracking(id).unwrap();
        assert!(backend.poll_changes().unwrap().is_empty());
        assert_eq!(backend.stopped_ids(), &[id]);
        assert_eq!(backend.stop_tracking(id), Err(BackendError::UnknownAnchor { id }));
    }

    #[test]
    fn test_failure_injection() {
        let mut backend = MockBackend::new();
        backend.reject_tracking(Some("quota exceeded".to_string()));
        assert!(matches!(
            backend.start_tracking(&payload()),
            Err(BackendError::TrackingRejected { .. })
        ));

        backend.fail_next_poll(BackendError::Native { code: -3, message: "busy".to_string() });
        assert!(backend.poll_changes().unwrap_err().is_transient());
        assert!(backend.poll_changes().is_ok());

        backend.shutdown();
        assert!(!backend.is_running());
        assert_eq!(backend.poll_changes(), Err(BackendError::NotRunning));
    }
}
