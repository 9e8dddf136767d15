//! Caller-facing anchor API
//!
//! An owned [`PersistentAnchorManager`] driven by explicit `tick` and
//! `dispose` calls, with ordered change subscribers.

pub mod callback;
pub mod manager;
pub mod types;

pub use callback::{ChangeCallback, SubscriberList, SubscriptionHandle};
pub use manager::PersistentAnchorManager;
pub use types::{ApiError, ApiResult, IngestSummary};
