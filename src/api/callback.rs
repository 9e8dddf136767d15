//! Callback registration for anchor change events
//!
//! Subscribers are kept in registration order and invoked synchronously.

use crate::api::types::{ApiError, ApiResult};
use crate::tracking::AnchorChangeEvent;

/// Callback function type for anchor change events
pub type ChangeCallback = Box<dyn FnMut(&AnchorChangeEvent) + Send>;

/// Callback registration handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u32);

impl SubscriptionHandle {
    fn new(id: u32) -> Self {
        SubscriptionHandle(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Ordered list of change subscribers
#[derive(Default)]
pub struct SubscriberList {
    callback_counter: u32,
    callbacks: Vec<(SubscriptionHandle, ChangeCallback)>,
}

impl SubscriberList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback
    pub fn subscribe(&mut self, callback: ChangeCallback) -> SubscriptionHandle {
        self.callback_counter += 1;
        let handle = SubscriptionHandle::new(self.callback_counter);
        self.callbacks.push((handle, callback));
        handle
    }

    /// Unregister a callback
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> ApiResult<()> {
        if !self.callbacks.iter().any(|(registered, _)| *registered == handle) {
            return Err(ApiError::InvalidSubscription { handle: handle.id() });
        }
        self.callbacks.retain(|(registered, _)| *registered != handle);
        Ok(())
    }

    /// Deliver each event to every subscriber, in subscription order
    pub fn dispatch(&mut self, events: &[AnchorChangeEvent]) {
        for event in events {
            for (_, callback) in self.callbacks.iter_mut() {
                callback(event);
            }
        }
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl std::fmt::Debug for SubscriberList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberList")
            .field("subscribers", &self.callbacks.len())
            .finish()
    }
}
