//! Owned anchor manager tying the backend, reconciler and subscribers together

use crate::api::callback::{ChangeCallback, SubscriberList, SubscriptionHandle};
use crate::api::types::{ApiError, ApiResult, IngestSummary};
use crate::backend::AnchorBackend;
use crate::core::{AnchorBatch, AnchorId, AnchorPayload};
use crate::tracking::{AnchorReconciler, IngestReport, PersistentAnchor};
use crate::utils::{AnchorManagerConfig, ConfigurationManager, ResolvedConfig};
use crate::validation::AnchorError;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Persistent anchor manager.
///
/// The host drives it explicitly: [`tick`](Self::tick) once per frame and
/// [`dispose`](Self::dispose) on teardown. Change callbacks run synchronously
/// inside `tick`, `ingest`, `destroy` and `dispose`.
pub struct PersistentAnchorManager<B: AnchorBackend> {
    backend: B,
    config: AnchorManagerConfig,
    resolved: ResolvedConfig,
    reconciler: AnchorReconciler,
    subscribers: SubscriberList,
    session_id: Option<String>,
    disposed: bool,
}

impl<B: AnchorBackend> PersistentAnchorManager<B> {
    /// Resolve the configuration and apply it to the backend
    pub fn new(mut backend: B, config: AnchorManagerConfig) -> ApiResult<Self> {
        let manager = ConfigurationManager::with_config(config)?;
        let resolved = manager.resolve();
        backend.configure(&resolved.backend)?;
        info!(
            continuous = resolved.backend.continuous_localization_enabled,
            fusion = resolved.settings.temporal_fusion_enabled,
            interpolation = resolved.settings.interpolation_enabled,
            "anchor manager started"
        );

        Ok(Self {
            backend,
            config: manager.config().clone(),
            reconciler: AnchorReconciler::new(resolved.settings),
            resolved,
            subscribers: SubscriberList::new(),
            session_id: None,
            disposed: false,
        })
    }

    /// Start localizing a payload and return its handle immediately.
    ///
    /// A payload that is already tracked returns the existing handle.
    pub fn try_localize(&mut self, payload: &AnchorPayload) -> ApiResult<AnchorId> {
        self.ensure_active()?;

        if let Some(id) = self.reconciler.tracked_id(payload) {
            let duplicate = AnchorError::DuplicateLocalization { id };
            debug!(%duplicate, "returning existing handle");
            return Ok(id);
        }

        let id = self.backend.start_tracking(payload)?;
        if let Err(error) = self.reconciler.register(id, payload) {
            warn!(%error, "backend issued a retired id");
            if let Err(stop_error) = self.backend.stop_tracking(id) {
                warn!(%stop_error, anchor = %id, "failed to stop tracking");
            }
            return Err(error.into());
        }

        if self.session_id.is_none() {
            let session = Uuid::new_v4().simple().to_string();
            info!(%session, "VPS session started");
            self.session_id = Some(session);
        }
        info!(anchor = %id, payload = %payload, "localization requested");
        Ok(id)
    }

    /// Stop tracking an anchor and emit its final `Removed` event.
    ///
    /// Returns `false` when the anchor is unknown or already gone.
    pub fn destroy(&mut self, id: AnchorId) -> bool {
        let Some(event) = self.reconciler.destroy(id) else {
            debug!(anchor = %id, "destroy of unknown anchor ignored");
            return false;
        };

        if let Err(error) = self.backend.stop_tracking(id) {
            warn!(%error, anchor = %id, "backend failed to stop tracking");
        }
        self.subscribers.dispatch(std::slice::from_ref(&event));
        self.end_session_if_idle();
        true
    }

    /// Register a change callback
    pub fn subscribe(&mut self, callback: ChangeCallback) -> SubscriptionHandle {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> ApiResult<()> {
        self.subscribers.unsubscribe(handle)
    }

    /// Poll the backend, reconcile and notify subscribers.
    ///
    /// When polling fails the tick still advances interpolation before the
    /// error is returned.
    pub fn tick(&mut self, delta_time_s: f64) -> ApiResult<IngestSummary> {
        self.ensure_active()?;

        match self.backend.poll_changes() {
            Ok(batch) => Ok(self.ingest(&batch, delta_time_s)),
            Err(error) => {
                warn!(%error, transient = error.is_transient(), "backend poll failed");
                self.ingest(&AnchorBatch::default(), delta_time_s);
                Err(error.into())
            }
        }
    }

    /// Reconcile a batch directly, bypassing the backend poll
    pub fn ingest(&mut self, batch: &AnchorBatch, delta_time_s: f64) -> IngestSummary {
        if self.disposed {
            warn!("ingest after dispose ignored");
            return IngestSummary::default();
        }

        let IngestReport { events, rejected } = self.reconciler.ingest(batch, delta_time_s);
        self.subscribers.dispatch(&events);
        self.end_session_if_idle();
        IngestSummary {
            dispatched: events.len(),
            rejected,
        }
    }

    /// Identifier of the current VPS session
    pub fn get_vps_session_id(&self) -> ApiResult<String> {
        self.ensure_active()?;
        self.session_id.clone().ok_or(ApiError::NoActiveSession)
    }

    /// Destroy every anchor and shut the backend down
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }

        for id in self.reconciler.ids() {
            self.destroy(id);
        }
        self.backend.shutdown();
        self.subscribers.clear();
        self.session_id = None;
        self.disposed = true;
        info!("anchor manager disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn anchor(&self, id: AnchorId) -> Option<&PersistentAnchor> {
        self.reconciler.anchor(id)
    }

    /// Live anchors in localization order
    pub fn anchors(&self) -> impl Iterator<Item = &PersistentAnchor> + '_ {
        self.reconciler.anchors()
    }

    pub fn anchor_count(&self) -> usize {
        self.reconciler.len()
    }

    /// Configuration as supplied by the caller
    pub fn config(&self) -> &AnchorManagerConfig {
        &self.config
    }

    /// Effective settings after conflict resolution
    pub fn resolved_config(&self) -> &ResolvedConfig {
        &self.resolved
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn ensure_active(&self) -> ApiResult<()> {
        if self.disposed {
            Err(ApiError::Disposed)
        } else {
            Ok(())
        }
    }

    fn end_session_if_idle(&mut self) {
        if self.reconciler.is_empty() {
            if let Some(session) = self.session_id.take() {
                info!(%session, "VPS session ended");
            }
        }
    }
}

impl<B: AnchorBackend> Drop for PersistentAnchorManager<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<B: AnchorBackend + std::fmt::Debug> std::fmt::Debug for PersistentAnchorManager<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentAnchorManager")
            .field("backend", &self.backend)
            .field("anchors", &self.reconciler.len())
            .field("subscribers", &self.subscribers)
            .field("session_id", &self.session_id)
            .field("disposed", &self.disposed)
            .finish()
    }
}
