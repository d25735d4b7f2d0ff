//! Rolling-window call budget for chatty remote APIs.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Tracks calls inside a rolling time window and computes the cooperative
/// delay once the window's budget is exhausted.
///
/// The window is explicit state owned by the client issuing the calls, not a
/// process-wide counter. [`RateWindow::register`] is the pure core: it takes
/// the caller's notion of "now" and returns the delay to apply, which lets
/// tests drive it with synthetic instants instead of a real clock.
pub struct RateWindow {
    budget: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

struct WindowState {
    calls: u32,
    started: Instant,
}

impl RateWindow {
    /// Creates a window allowing `budget` calls per `window`. A zero budget is
    /// clamped to one so the limiter can never deadlock its owner.
    pub fn new(budget: u32, window: Duration) -> Self {
        Self {
            budget: budget.max(1),
            window,
            state: Mutex::new(WindowState {
                calls: 0,
                started: Instant::now(),
            }),
        }
    }

    /// Records a call happening at `now` and returns the delay the caller must
    /// apply before issuing it, if the budget is spent.
    ///
    /// When a delay is returned the window is reset to start after the delay,
    /// with this call counted against the fresh budget.
    pub fn register(&self, now: Instant) -> Option<Duration> {
        let mut state = self.state.lock();
        if now.duration_since(state.started) >= self.window {
            state.started = now;
            state.calls = 0;
        }
        if state.calls < self.budget {
            state.calls += 1;
            return None;
        }
        let wait = self.window - now.duration_since(state.started);
        state.started = now + wait;
        state.calls = 1;
        Some(wait)
    }

    /// Registers a call at the real current time, sleeping out any required
    /// delay before returning.
    pub async fn acquire(&self) {
        if let Some(wait) = self.register(Instant::now()) {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate window exhausted, pausing");
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calls_within_budget_need_no_delay() {
        let window = RateWindow::new(3, Duration::from_secs(60));
        let base = Instant::now();
        for i in 0..3u64 {
            assert_eq!(window.register(base + Duration::from_secs(i)), None);
        }
    }

    #[test]
    fn call_over_budget_waits_out_the_window() {
        let window = RateWindow::new(2, Duration::from_secs(60));
        let base = Instant::now();
        assert_eq!(window.register(base), None);
        assert_eq!(window.register(base + Duration::from_secs(10)), None);
        let wait = window.register(base + Duration::from_secs(45));
        assert_eq!(wait, Some(Duration::from_secs(15)));
    }

    #[test]
    fn window_resets_after_elapsing() {
        let window = RateWindow::new(1, Duration::from_secs(60));
        let base = Instant::now();
        assert_eq!(window.register(base), None);
        // Next call lands after the window has fully elapsed: fresh budget.
        assert_eq!(window.register(base + Duration::from_secs(61)), None);
    }

    #[test]
    fn delayed_call_counts_against_the_next_window() {
        let window = RateWindow::new(1, Duration::from_secs(60));
        let base = Instant::now();
        assert_eq!(window.register(base), None);
        let wait = window.register(base + Duration::from_secs(30)).unwrap();
        assert_eq!(wait, Duration::from_secs(30));
        // The delayed call consumed the new window's budget, so a call right
        // after the delay must wait again.
        let resumed = base + Duration::from_secs(60);
        assert!(window.register(resumed).is_some());
    }

    #[test]
    fn zero_budget_is_clamped() {
        let window = RateWindow::new(0, Duration::from_secs(60));
        assert_eq!(window.register(Instant::now()), None);
    }
}
