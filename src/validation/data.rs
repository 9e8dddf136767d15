//! Batch validation for backend anchor records

use crate::core::{AnchorBatch, AnchorId, RawAnchorRecord, RawObservation};
use crate::validation::error::AnchorError;
use std::collections::{HashMap, HashSet};

/// Records that passed validation, in input order
#[derive(Debug, Default)]
pub struct BatchValidation<'a> {
    pub added: Vec<&'a RawAnchorRecord>,
    pub updated: Vec<&'a RawAnchorRecord>,
    pub rejected: Vec<AnchorError>,
}

/// Check a single observation against the last accepted timestamp for its anchor
pub fn validate_observation(
    id: AnchorId,
    observation: &RawObservation,
    last_timestamp_ms: Option<u64>,
) -> Result<(), AnchorError> {
    if observation.timestamp_ms < 0 {
        return Err(AnchorError::MalformedRecord {
            id,
            reason: format!("negative timestamp {}", observation.timestamp_ms),
        });
    }
    if !observation.pose.is_finite() {
        return Err(AnchorError::MalformedRecord {
            id,
            reason: "pose has non-finite components".to_string(),
        });
    }
    if !observation.confidence.is_finite() {
        return Err(AnchorError::MalformedRecord {
            id,
            reason: "confidence is not finite".to_string(),
        });
    }
    if let Some(last) = last_timestamp_ms {
        if (observation.timestamp_ms as u64) < last {
            return Err(AnchorError::MalformedRecord {
                id,
                reason: format!("timestamp {} precedes last sample {}", observation.timestamp_ms, last),
            });
        }
    }
    Ok(())
}

/// Split a batch into accepted records and rejected ones.
///
/// `last_timestamp` reports the newest accepted sample per anchor from earlier
/// ticks. Within the batch, records for the same anchor must also be in
/// timestamp order. Removals are not validated here.
pub fn validate_batch<'a, F>(batch: &'a AnchorBatch, last_timestamp: F) -> BatchValidation<'a>
where
    F: Fn(AnchorId) -> Option<u64>,
{
    let mut result = BatchValidation::default();
    let mut latest: HashMap<AnchorId, u64> = HashMap::new();
    let mut added_ids: HashSet<AnchorId> = HashSet::new();

    let check = |record: &RawAnchorRecord, latest: &mut HashMap<AnchorId, u64>| -> Result<(), AnchorError> {
        let previous = latest.get(&record.id).copied().or_else(|| last_timestamp(record.id));
        validate_observation(record.id, &record.observation, previous)?;
        latest.insert(record.id, record.observation.timestamp_ms as u64);
        Ok(())
    };

    for record in &batch.added {
        if !added_ids.insert(record.id) {
            result.rejected.push(AnchorError::MalformedRecord {
                id: record.id,
                reason: "anchor listed twice in added".to_string(),
            });
            continue;
        }
        match check(record, &mut latest) {
            Ok(()) => result.added.push(record),
            Err(e) => result.rejected.push(e),
        }
    }

    for record in &batch.updated {
        if added_ids.contains(&record.id) {
            result.rejected.push(AnchorError::MalformedRecord {
                id: record.id,
                reason: "anchor listed in both added and updated".to_string(),
            });
            continue;
        }
        match check(record, &mut latest) {
            Ok(()) => result.updated.push(record),
            Err(e) => result.rejected.push(e),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AnchorPayload, Pose};

    fn record(id: u128, ts: i64) -> RawAnchorRecord {
        RawAnchorRecord::new(
            AnchorId::from_u128(id),
            AnchorPayload::from_bytes(vec![id as u8]),
            RawObservation::tracking(Pose::from_position(id as f64, 0.0, 0.0), ts),
        )
    }

    #[test]
    fn test_clean_batch_passes() {
        let batch = AnchorBatch::new()
            .with_added(record(1, 10))
            .with_updated(record(2, 10))
            .with_updated(record(2, 12));
        let result = validate_batch(&batch, |_| Some(5));
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.updated.len(), 2);
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn test_added_and_updated_collision_drops_update() {
        let batch = AnchorBatch::new().with_added(record(1, 10)).with_updated(record(1, 11));
        let result = validate_batch(&batch, |_| None);
        assert_eq!(result.added.len(), 1);
        assert!(result.updated.is_empty());
        assert!(matches!(result.rejected[0], AnchorError::MalformedRecord { .. }));
    }

    #[test]
    fn test_duplicate_added_keeps_first() {
        let batch = AnchorBatch::new().with_added(record(1, 10)).with_added(record(1, 20));
        let result = validate_batch(&batch, |_| None);
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.added[0].observation.timestamp_ms, 10);
        assert_eq!(result.rejected.len(), 1);
    }

    #[test]
    fn test_negative_timestamp_rejected_without_affecting_siblings() {
        let batch = AnchorBatch::new()
            .with_updated(record(1, -4))
            .with_updated(record(2, 7));
        let result = validate_batch(&batch, |_| None);
        assert_eq!(result.updated.len(), 1);
        assert_eq!(result.updated[0].id, AnchorId::from_u128(2));
        assert_eq!(result.rejected.len(), 1);
    }

    #[test]
    fn test_out_of_order_timestamp_rejected() {
        let batch = AnchorBatch::new().with_updated(record(1, 40));
        let result = validate_batch(&batch, |_| Some(50));
        assert!(result.updated.is_empty());

        let batch = AnchorBatch::new().with_updated(record(1, 60)).with_updated(record(1, 55));
        let result = validate_batch(&batch, |_| Some(50));
        assert_eq!(result.updated.len(), 1);
        assert_eq!(result.rejected.len(), 1);
    }

    #[test]
    fn test_non_finite_pose_rejected() {
        let mut bad = record(3, 1);
        bad.observation.pose = Pose::from_position(f64::NAN, 0.0, 0.0);
        assert!(validate_observation(bad.id, &bad.observation, None).is_err());
    }
}
