//! Ownership of live anchors keyed by identifier

use crate::core::{AnchorId, AnchorPayload};
use crate::tracking::anchor::PersistentAnchor;
use std::collections::{HashMap, HashSet};

/// Holds at most one anchor per id and remembers every retired id
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    anchors: HashMap<AnchorId, PersistentAnchor>,
    /// Insertion order, for deterministic iteration
    order: Vec<AnchorId>,
    /// Payload bytes to the anchor tracking them
    by_payload: HashMap<AnchorPayload, AnchorId>,
    /// Ids that were removed this session and may never come back
    retired: HashSet<AnchorId>,
    fusion_window: usize,
}

impl AnchorRegistry {
    pub fn new(fusion_window: usize) -> Self {
        Self {
            fusion_window,
            ..Self::default()
        }
    }

    /// Return the anchor for `id`, creating it if needed.
    ///
    /// The flag is `true` when a new anchor was created. Retired ids yield
    /// `None`.
    pub fn get_or_create(&mut self, id: AnchorId, payload: &AnchorPayload) -> Option<(&mut PersistentAnchor, bool)> {
        if self.retired.contains(&id) {
            return None;
        }
        let created = !self.anchors.contains_key(&id);
        if created {
            self.order.push(id);
            self.by_payload.entry(payload.clone()).or_insert(id);
        }
        let window = self.fusion_window;
        let anchor = self
            .anchors
            .entry(id)
            .or_insert_with(|| PersistentAnchor::new(id, payload.clone(), window));
        Some((anchor, created))
    }

    pub fn get(&self, id: AnchorId) -> Option<&PersistentAnchor> {
        self.anchors.get(&id)
    }

    pub fn get_mut(&mut self, id: AnchorId) -> Option<&mut PersistentAnchor> {
        self.anchors.get_mut(&id)
    }

    /// Anchor currently tracking exactly these payload bytes
    pub fn find_by_payload(&self, payload: &AnchorPayload) -> Option<AnchorId> {
        self.by_payload.get(payload).copied()
    }

    /// Evict an anchor and retire its id
    pub fn remove(&mut self, id: AnchorId) -> Option<PersistentAnchor> {
        let anchor = self.anchors.remove(&id)?;
        self.order.retain(|other| *other != id);
        if self.by_payload.get(anchor.payload()) == Some(&id) {
            self.by_payload.remove(anchor.payload());
        }
        self.retired.insert(id);
        Some(anchor)
    }

    pub fn contains(&self, id: AnchorId) -> bool {
        self.anchors.contains_key(&id)
    }

    pub fn is_retired(&self, id: AnchorId) -> bool {
        self.retired.contains(&id)
    }

    /// Live ids in the order they were first registered
    pub fn ids(&self) -> &[AnchorId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &PersistentAnchor> + '_ {
        self.order.iter().filter_map(move |id| self.anchors.get(id))
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
