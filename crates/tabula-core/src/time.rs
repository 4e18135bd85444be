//! Wall-clock helper.

/// Current time as milliseconds since the Unix epoch.
///
/// The bridge timestamps bindings and handshakes with wall-clock
/// milliseconds to match the tracker's wire format.
#[must_use]
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
    }

    #[test]
    fn now_ms_is_after_2023() {
        // 2023-01-01T00:00:00Z
        assert!(now_ms() > 1_672_531_200_000);
    }
}
