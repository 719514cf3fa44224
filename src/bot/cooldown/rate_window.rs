use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::bot::{commands::commands::BotResult, state::def::{BotError, RateWindowConfig}};

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

/// Per-caller command frequency limit across all commands. Separate from the
/// outbound throttle: this one protects the bot from a single spammer.
pub struct RateWindow {
    limit: u32,
    window: Duration,
    callers: DashMap<String, WindowState>,
}

impl RateWindow {
    pub fn new(limit: u32, window: Duration) -> Self {
        RateWindow { limit, window, callers: DashMap::new() }
    }

    pub fn from_config(config: &RateWindowConfig) -> Self {
        Self::new(config.limit, config.window)
    }

    pub fn try_acquire(&self, caller_id: &str, now: Instant) -> BotResult<()> {
        let mut state = self.callers.entry(caller_id.to_string()).or_insert(WindowState { count: 0, window_start: now });

        if now.saturating_duration_since(state.window_start) > self.window {
            state.count = 0;
            state.window_start = now;
        }

        if state.count >= self.limit {
            let retry_in = self.window.saturating_sub(now.saturating_duration_since(state.window_start));
            return Err(BotError::RateLimited(retry_in));
        }

        state.count += 1;
        Ok(())
    }

    /// Forgets callers whose window closed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.callers.len();
        self.callers.retain(|_, s| now.saturating_duration_since(s.window_start) <= self.window);
        before.saturating_sub(self.callers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_calls_inside_one_window() {
        let limiter = RateWindow::new(2, Duration::from_secs(10));
        let t0 = Instant::now();

        assert!(limiter.try_acquire("bob", t0).is_ok());
        assert!(limiter.try_acquire("bob", t0 + Duration::from_secs(1)).is_ok());
        match limiter.try_acquire("bob", t0 + Duration::from_secs(4)) {
            Err(BotError::RateLimited(retry)) => assert_eq!(retry, Duration::from_secs(6)),
            other => panic!("expected rate limit, got {other:?}"),
        }

        // Other callers are unaffected
        assert!(limiter.try_acquire("alice", t0 + Duration::from_secs(4)).is_ok());
    }

    #[test]
    fn window_resets_only_after_it_is_exceeded() {
        let limiter = RateWindow::new(1, Duration::from_secs(10));
        let t0 = Instant::now();
        limiter.try_acquire("bob", t0).unwrap();

        assert!(limiter.try_acquire("bob", t0 + Duration::from_secs(10)).is_err());
        assert!(limiter.try_acquire("bob", t0 + Duration::from_millis(10_001)).is_ok());
    }

    #[test]
    fn sweep_drops_closed_windows() {
        let limiter = RateWindow::new(1, Duration::from_secs(10));
        let t0 = Instant::now();
        limiter.try_acquire("bob", t0).unwrap();
        limiter.try_acquire("alice", t0 + Duration::from_secs(8)).unwrap();

        assert_eq!(limiter.sweep(t0 + Duration::from_secs(11)), 1);
    }
}
