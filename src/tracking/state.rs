//! Per-anchor tracking state machine.
//!
//! ```text
//! None ──► Limited ◄──► Tracking
//!   ▲         │            │
//!   └─────────┴────────────┘   (backend loses the anchor)
//!
//! any ──► Removed              (backend removal or caller destroy; terminal)
//! ```

use crate::core::{NativeTrackingState, TrackingState, TrackingStateReason};

/// Outcome of applying a backend report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTransition {
    /// Reported state and reason match the current ones
    Unchanged,
    /// State or reason moved
    Changed { from: TrackingState, to: TrackingState },
    /// Anchor is removed; the report was ignored
    Frozen,
}

/// Tracking state plus the manager-level removal override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorTrackingState {
    state: TrackingState,
    reason: TrackingStateReason,
}

impl Default for AnchorTrackingState {
    fn default() -> Self {
        Self::new()
    }
}

impl AnchorTrackingState {
    /// Fresh anchor waiting for its first localization
    pub fn new() -> Self {
        Self {
            state: TrackingState::None,
            reason: TrackingStateReason::Initializing,
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn reason(&self) -> TrackingStateReason {
        self.reason
    }

    pub fn is_removed(&self) -> bool {
        self.state == TrackingState::Removed
    }

    /// Limited and Tracking anchors carry a usable pose
    pub fn is_trackable(&self) -> bool {
        matches!(self.state, TrackingState::Limited | TrackingState::Tracking)
    }

    /// Apply a backend-reported state and reason
    pub fn apply(&mut self, reported: NativeTrackingState, reason: TrackingStateReason) -> StateTransition {
        if self.is_removed() {
            return StateTransition::Frozen;
        }

        let next = TrackingState::from(reported);
        if next == self.state && reason == self.reason {
            return StateTransition::Unchanged;
        }

        let from = self.state;
        self.state = next;
        self.reason = reason;
        StateTransition::Changed { from, to: next }
    }

    /// Move to the terminal `Removed` state; the forced reason wins over
    /// anything the backend reports afterwards
    pub fn force_removed(&mut self, reason: TrackingStateReason) -> StateTransition {
        if self.is_removed() {
            return StateTransition::Frozen;
        }
        let from = self.state;
        self.state = TrackingState::Removed;
        self.reason = reason;
        StateTransition::Changed { from, to: TrackingState::Removed }
    }
}
