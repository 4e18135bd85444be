//! Per-marker update rate limiting.
//!
//! The tracker emits observations at camera frame rate; the host's entity
//! mutation path cannot keep up with that, so each marker gets at most one
//! processed observation per throttle interval. Rejected observations are
//! silently dropped — they do not advance `last_seen_at_ms` in the cache.

use std::collections::HashMap;

/// Rate limiter deciding whether an observation is processed or dropped.
///
/// Time is supplied by the caller in epoch milliseconds, which keeps
/// admission decisions deterministic under test.
#[derive(Debug)]
pub struct UpdateGovernor {
    interval_ms: u64,
    last_admitted: HashMap<u32, u64>,
}

impl UpdateGovernor {
    /// Create a governor with the given minimum interval per marker.
    #[must_use]
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_admitted: HashMap::new(),
        }
    }

    /// Admit or reject an observation for `marker_id` at `now_ms`.
    ///
    /// Admits when at least the configured interval has elapsed since the
    /// last admitted observation for the same marker (first observations
    /// always pass). Admission records the timestamp; rejection records
    /// nothing.
    pub fn admit(&mut self, marker_id: u32, now_ms: u64) -> bool {
        match self.last_admitted.get(&marker_id) {
            Some(last) if now_ms.saturating_sub(*last) < self.interval_ms => false,
            _ => {
                let _ = self.last_admitted.insert(marker_id, now_ms);
                true
            }
        }
    }

    /// Number of markers with an admission record.
    #[must_use]
    pub fn tracked_markers(&self) -> usize {
        self.last_admitted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_admitted() {
        let mut governor = UpdateGovernor::new(100);
        assert!(governor.admit(12, 1_000));
    }

    #[test]
    fn observation_inside_interval_is_rejected() {
        let mut governor = UpdateGovernor::new(100);
        assert!(governor.admit(12, 1_000));
        assert!(!governor.admit(12, 1_099));
    }

    #[test]
    fn observation_at_exact_interval_is_admitted() {
        let mut governor = UpdateGovernor::new(100);
        assert!(governor.admit(12, 1_000));
        assert!(governor.admit(12, 1_100));
    }

    #[test]
    fn markers_are_throttled_independently() {
        let mut governor = UpdateGovernor::new(100);
        assert!(governor.admit(12, 1_000));
        assert!(governor.admit(13, 1_010));
        assert!(!governor.admit(12, 1_050));
        assert!(!governor.admit(13, 1_050));
    }

    #[test]
    fn rejection_does_not_extend_the_window() {
        let mut governor = UpdateGovernor::new(100);
        assert!(governor.admit(12, 1_000));
        assert!(!governor.admit(12, 1_090));
        // Window is measured from the admission at 1_000, not the rejection.
        assert!(governor.admit(12, 1_100));
    }

    #[test]
    fn zero_interval_admits_everything() {
        let mut governor = UpdateGovernor::new(0);
        assert!(governor.admit(12, 1_000));
        assert!(governor.admit(12, 1_000));
    }

    #[test]
    fn clock_going_backwards_rejects_within_interval() {
        let mut governor = UpdateGovernor::new(100);
        assert!(governor.admit(12, 1_000));
        assert!(!governor.admit(12, 950));
    }

    #[test]
    fn tracked_marker_count() {
        let mut governor = UpdateGovernor::new(100);
        let _ = governor.admit(1, 0);
        let _ = governor.admit(2, 0);
        assert_eq!(governor.tracked_markers(), 2);
    }
}
