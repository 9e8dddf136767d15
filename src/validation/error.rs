//! Error classification for the anchor tracking pipeline

use crate::core::AnchorId;
use thiserror::Error;

/// Failures raised while decoding payloads or reconciling backend batches
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnchorError {
    /// Payload bytes could not be decoded
    #[error("malformed anchor payload: {reason}")]
    MalformedPayload { reason: String },

    /// An update or removal referenced an anchor the registry does not hold
    #[error("update for unknown anchor {id}")]
    UnknownAnchorUpdate { id: AnchorId },

    /// The caller asked to track a payload that is already tracked
    #[error("payload already tracked by anchor {id}")]
    DuplicateLocalization { id: AnchorId },

    /// Feature flags contradict each other; the feature falls back to pass-through
    #[error("configuration conflict on {setting}: {reason}")]
    ConfigurationConflict { setting: String, reason: String },

    /// A backend record failed validation and was skipped
    #[error("malformed record for anchor {id}: {reason}")]
    MalformedRecord { id: AnchorId, reason: String },

    /// The backend tried to re-add an identifier that was already removed
    #[error("anchor id {id} was retired and cannot be reused")]
    RetiredAnchorId { id: AnchorId },
}

impl AnchorError {
    /// Recoverable errors are handled locally and never reach the caller
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AnchorError::MalformedPayload { .. })
    }

    /// Anchor the error refers to, when there is one
    pub fn anchor_id(&self) -> Option<AnchorId> {
        match self {
            AnchorError::UnknownAnchorUpdate { id }
            | AnchorError::DuplicateLocalization { id }
            | AnchorError::MalformedRecord { id, .. }
            | AnchorError::RetiredAnchorId { id } => Some(*id),
            AnchorError::MalformedPayload { .. } | AnchorError::ConfigurationConflict { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        let id = AnchorId::from_u128(3);
        assert!(AnchorError::UnknownAnchorUpdate { id }.is_recoverable());
        assert!(AnchorError::DuplicateLocalization { id }.is_recoverable());
        assert!(AnchorError::ConfigurationConflict {
            setting: "interpolation".to_string(),
            reason: "zero duration".to_string(),
        }
        .is_recoverable());
        assert!(!AnchorError::MalformedPayload { reason: "bad".to_string() }.is_recoverable());
    }

    #[test]
    fn test_anchor_id_extraction() {
        let id = AnchorId::from_u128(9);
        assert_eq!(AnchorError::RetiredAnchorId { id }.anchor_id(), Some(id));
        assert_eq!(AnchorError::MalformedPayload { reason: String::new() }.anchor_id(), None);
    }

    #[test]
    fn test_display_mentions_anchor() {
        let id = AnchorId::from_u128(1);
        let message = AnchorError::UnknownAnchorUpdate { id }.to_string();
        assert!(message.contains("00000000-0000-0000-0000-000000000001"));
    }
}
