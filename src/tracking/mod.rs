//! Anchor lifecycle: state machine, registry and per-tick reconciliation

pub mod anchor;
pub mod events;
pub mod reconciler;
pub mod registry;
pub mod state;

pub use anchor::PersistentAnchor;
pub use events::{AnchorChangeEvent, ChangeKind};
pub use reconciler::{AnchorReconciler, IngestReport, ReconcilerSettings};
pub use registry::AnchorRegistry;
pub use state::{AnchorTrackingState, StateTransition};
