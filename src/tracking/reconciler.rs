//! Per-tick reconciliation of backend anchor batches into change events

use crate::core::{AnchorBatch, AnchorId, AnchorPayload, DEFAULT_FUSION_WINDOW, DEFAULT_INTERPOLATION_DURATION_S};
use crate::tracking::anchor::PersistentAnchor;
use crate::tracking::events::{AnchorChangeEvent, ChangeKind};
use crate::tracking::registry::AnchorRegistry;
use crate::tracking::state::StateTransition;
use crate::validation::{validate_batch, AnchorError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Effective pipeline settings after configuration conflicts are resolved
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconcilerSettings {
    pub temporal_fusion_enabled: bool,
    pub interpolation_enabled: bool,
    pub fusion_window_size: usize,
    /// Always positive when interpolation is enabled
    pub interpolation_duration_s: f64,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            temporal_fusion_enabled: false,
            interpolation_enabled: false,
            fusion_window_size: DEFAULT_FUSION_WINDOW,
            interpolation_duration_s: DEFAULT_INTERPOLATION_DURATION_S,
        }
    }
}

/// Result of one `ingest` call
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Added, then updated, then removed events
    pub events: Vec<AnchorChangeEvent>,
    /// Records that were skipped, with the reason
    pub rejected: Vec<AnchorError>,
}

/// Turns raw backend batches into anchor state and change events.
///
/// Not re-entrant: the host calls [`AnchorReconciler::ingest`] once per frame
/// from a single thread.
#[derive(Debug)]
pub struct AnchorReconciler {
    settings: ReconcilerSettings,
    registry: AnchorRegistry,
}

impl AnchorReconciler {
    pub fn new(settings: ReconcilerSettings) -> Self {
        Self {
            settings,
            registry: AnchorRegistry::new(settings.fusion_window_size),
        }
    }

    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Anchor already tracking these payload bytes, if any
    pub fn tracked_id(&self, payload: &AnchorPayload) -> Option<AnchorId> {
        self.registry.find_by_payload(payload)
    }

    /// Register a caller localization request as a pending anchor.
    ///
    /// Returns `Ok(true)` for a new anchor and `Ok(false)` when `id` is
    /// already registered.
    pub fn register(&mut self, id: AnchorId, payload: &AnchorPayload) -> Result<bool, AnchorError> {
        match self.registry.get_or_create(id, payload) {
            Some((_, created)) => Ok(created),
            None => Err(AnchorError::RetiredAnchorId { id }),
        }
    }

    /// Process one backend batch and advance interpolation by `delta_time_s`.
    ///
    /// Never fails: malformed or unknown records are skipped and reported.
    pub fn ingest(&mut self, batch: &AnchorBatch, delta_time_s: f64) -> IngestReport {
        let mut report = IngestReport::default();
        let delta_time_s = if delta_time_s.is_finite() && delta_time_s >= 0.0 {
            delta_time_s
        } else {
            warn!(delta_time_s, "invalid frame delta, treating as zero");
            0.0
        };

        let registry = &self.registry;
        let validation = validate_batch(batch, |id| registry.get(id).and_then(|a| a.timestamp_ms()));
        for error in validation.rejected {
            warn!(%error, "skipping backend record");
            report.rejected.push(error);
        }

        let removing: HashSet<AnchorId> = batch.removed.iter().copied().collect();
        let mut born: HashSet<AnchorId> = HashSet::new();
        let mut touched: Vec<AnchorId> = Vec::new();
        let mut added_events = Vec::new();

        for record in validation.added {
            let Some((anchor, _)) = self.registry.get_or_create(record.id, &record.payload) else {
                let error = AnchorError::RetiredAnchorId { id: record.id };
                warn!(%error, "backend re-added a removed anchor");
                report.rejected.push(error);
                continue;
            };

            if anchor.is_announced() {
                debug!(anchor = %record.id, "backend re-reported a live anchor, treating as update");
                anchor.observe(&record.observation, &self.settings);
                if !touched.contains(&record.id) {
                    touched.push(record.id);
                }
                continue;
            }

            anchor.seed(&record.observation, &self.settings);
            info!(
                anchor = %record.id,
                state = %anchor.tracking_state(),
                "anchor added"
            );
            born.insert(record.id);
            added_events.extend(anchor.take_event(ChangeKind::Added));
        }

        for record in validation.updated {
            match self.registry.get_mut(record.id) {
                Some(anchor) if anchor.is_announced() => {
                    if let StateTransition::Changed { from, to } = anchor.observe(&record.observation, &self.settings) {
                        debug!(anchor = %record.id, %from, %to, reason = ?anchor.tracking_state_reason(), "tracking state changed");
                    }
                    if !touched.contains(&record.id) {
                        touched.push(record.id);
                    }
                }
                _ => {
                    let error = AnchorError::UnknownAnchorUpdate { id: record.id };
                    warn!(%error, "dropping update");
                    report.rejected.push(error);
                }
            }
        }

        let live: Vec<AnchorId> = self.registry.ids().to_vec();
        for id in &live {
            if let Some(anchor) = self.registry.get_mut(*id) {
                anchor.advance(delta_time_s, &self.settings);
            }
        }

        // Batch updates first, in input order, then interpolation-only movement.
        let untouched = live.iter().filter(|id| !touched.contains(id));
        let candidates: Vec<AnchorId> = touched.iter().chain(untouched).copied().collect();
        let mut updated_events = Vec::new();
        for id in candidates {
            if born.contains(&id) || removing.contains(&id) {
                continue;
            }
            if let Some(anchor) = self.registry.get_mut(id) {
                if anchor.is_announced() {
                    updated_events.extend(anchor.take_event(ChangeKind::Updated));
                }
            }
        }

        let mut removed_events = Vec::new();
        for id in &batch.removed {
            match self.remove_anchor(*id) {
                Some(event) => {
                    info!(anchor = %id, "anchor removed by backend");
                    removed_events.push(event);
                }
                None => {
                    let error = AnchorError::UnknownAnchorUpdate { id: *id };
                    warn!(%error, "dropping removal");
                    report.rejected.push(error);
                }
            }
        }

        report.events = added_events;
        report.events.extend(updated_events);
        report.events.extend(removed_events);
        debug!(
            events = report.events.len(),
            rejected = report.rejected.len(),
            live = self.registry.len(),
            "ingest complete"
        );
        report
    }

    /// Caller-requested teardown; `None` when the anchor is already gone
    pub fn destroy(&mut self, id: AnchorId) -> Option<AnchorChangeEvent> {
        let event = self.remove_anchor(id)?;
        info!(anchor = %id, "anchor destroyed by caller");
        Some(event)
    }

    pub fn anchor(&self, id: AnchorId) -> Option<&PersistentAnchor> {
        self.registry.get(id)
    }

    /// Live anchors in registration order
    pub fn anchors(&self) -> impl Iterator<Item = &PersistentAnchor> + '_ {
        self.registry.iter()
    }

    pub fn ids(&self) -> Vec<AnchorId> {
        self.registry.ids().to_vec()
    }

    pub fn is_retired(&self, id: AnchorId) -> bool {
        self.registry.is_retired(id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn remove_anchor(&mut self, id: AnchorId) -> Option<AnchorChangeEvent> {
        let anchor = self.registry.get_mut(id)?;
        anchor.force_removed();
        let event = anchor.take_event(ChangeKind::Removed);
        self.registry.remove(id);
        event
    }
}
