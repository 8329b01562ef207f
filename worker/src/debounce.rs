use std::time::{Duration, Instant};

use tracing::debug;

/// Last emitted payload and when it was emitted.
#[derive(Debug, Clone)]
struct DebounceState {
    last_payload: String,
    last_emit_time: Instant,
}

/// Suppresses repeats of the same payload within a cooldown window.
///
/// A camera re-reads one physical barcode over many consecutive frames; the
/// consumer wants one event per scan, not one per frame. Two states:
/// idle (`None`, nothing emitted yet) and recently-emitted (`Some`). The
/// state is never reset; it lives as long as the process.
pub struct DebounceFilter {
    state: Option<DebounceState>,
    window: Duration,
}

impl DebounceFilter {
    pub fn new(window: Duration) -> Self {
        Self {
            state: None,
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns `true` if `payload` should be emitted at `now`, recording it
    /// as the last emission. A rejection leaves the state untouched.
    pub fn accept(&mut self, now: Instant, payload: &str) -> bool {
        if let Some(state) = &self.state {
            let elapsed = now.saturating_duration_since(state.last_emit_time);
            if state.last_payload == payload && elapsed < self.window {
                debug!(
                    payload,
                    elapsed_ms = elapsed.as_millis() as u64,
                    window_ms = self.window.as_millis() as u64,
                    "duplicate within debounce window, suppressing"
                );
                return false;
            }
        }

        // last_emit_time never moves backwards.
        let last_emit_time = match &self.state {
            Some(state) => state.last_emit_time.max(now),
            None => now,
        };
        self.state = Some(DebounceState {
            last_payload: payload.to_string(),
            last_emit_time,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(1500);

    #[test]
    fn first_call_accepts() {
        let mut filter = DebounceFilter::new(WINDOW);
        assert!(filter.accept(Instant::now(), "123"));
    }

    #[test]
    fn same_payload_within_window_rejected() {
        let mut filter = DebounceFilter::new(WINDOW);
        let t0 = Instant::now();
        assert!(filter.accept(t0, "123"));
        assert!(!filter.accept(t0, "123"));
        assert!(!filter.accept(t0 + Duration::from_millis(1499), "123"));
    }

    #[test]
    fn same_payload_at_window_accepted_again() {
        let mut filter = DebounceFilter::new(WINDOW);
        let t0 = Instant::now();
        assert!(filter.accept(t0, "123"));
        assert!(filter.accept(t0 + WINDOW, "123"));
        // Window restarts from the second emission.
        assert!(!filter.accept(t0 + WINDOW + Duration::from_millis(100), "123"));
        assert!(filter.accept(t0 + WINDOW * 2, "123"));
    }

    #[test]
    fn rejection_does_not_extend_window() {
        let mut filter = DebounceFilter::new(WINDOW);
        let t0 = Instant::now();
        assert!(filter.accept(t0, "123"));
        // Continuous re-reads every 100ms still re-emit once per window.
        for ms in (100..1500).step_by(100) {
            assert!(!filter.accept(t0 + Duration::from_millis(ms), "123"));
        }
        assert!(filter.accept(t0 + Duration::from_millis(1500), "123"));
    }

    #[test]
    fn distinct_payloads_always_accepted() {
        let mut filter = DebounceFilter::new(WINDOW);
        let t0 = Instant::now();
        assert!(filter.accept(t0, "A"));
        assert!(filter.accept(t0, "B"));
        assert!(filter.accept(t0, "A"));
    }

    #[test]
    fn emit_time_is_monotonic() {
        let mut filter = DebounceFilter::new(WINDOW);
        let t0 = Instant::now() + Duration::from_secs(10);
        assert!(filter.accept(t0, "A"));
        // An earlier timestamp for a different payload does not rewind the clock.
        assert!(filter.accept(t0 - Duration::from_secs(5), "B"));
        assert!(!filter.accept(t0 + Duration::from_millis(1000), "B"));
    }
}
