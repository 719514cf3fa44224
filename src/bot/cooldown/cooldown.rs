use std::time::Duration;

use dashmap::{mapref::entry::Entry, DashMap};
use tokio::time::Instant;

use crate::bot::{commands::commands::BotResult, state::def::BotError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CooldownKey {
    pub command: String,
    pub caller_id: String,
}

#[derive(Debug, Clone, Copy)]
pub struct CooldownEntry {
    pub last_invoked_at: Instant,
    // Cooldown in force when the entry was written; lets the sweep drop it safely
    pub cooldown: Duration,
}

impl CooldownEntry {
    fn remaining(&self, now: Instant) -> Duration {
        self.cooldown.saturating_sub(now.saturating_duration_since(self.last_invoked_at))
    }
}

/// Minimum spacing between invocations of one command by one caller.
///
/// A missing entry means "never invoked". The check and the write happen under
/// the same map shard lock, so two invocations for one key can never both pass.
#[derive(Default)]
pub struct CooldownTracker {
    entries: DashMap<CooldownKey, CooldownEntry>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_consume(&self, command: &str, caller_id: &str, cooldown: Duration, now: Instant) -> BotResult<()> {
        if cooldown.is_zero() {
            return Ok(());
        }

        let key = CooldownKey { command: command.to_string(), caller_id: caller_id.to_string() };
        match self.entries.entry(key) {
            Entry::Occupied(mut slot) => {
                let elapsed = now.saturating_duration_since(slot.get().last_invoked_at);
                if elapsed >= cooldown {
                    slot.insert(CooldownEntry { last_invoked_at: now, cooldown });
                    Ok(())
                } else {
                    Err(BotError::CooldownActive(cooldown - elapsed))
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(CooldownEntry { last_invoked_at: now, cooldown });
                Ok(())
            }
        }
    }

    /// Drops entries whose own cooldown has fully elapsed. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.remaining(now).is_zero());
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: Duration = Duration::from_millis(3000);

    #[test]
    fn first_call_is_allowed_and_recorded() {
        let tracker = CooldownTracker::new();
        let t0 = Instant::now();

        assert!(tracker.try_consume("rate", "bob", RATE, t0).is_ok());
        assert_eq!(tracker.len(), 1);
        assert!(matches!(tracker.try_consume("rate", "bob", RATE, t0), Err(BotError::CooldownActive(left)) if left == RATE));
    }

    #[test]
    fn second_call_inside_window_reports_remaining_time() {
        let tracker = CooldownTracker::new();
        let t0 = Instant::now();
        tracker.try_consume("rate", "bob", RATE, t0).unwrap();

        let err = tracker.try_consume("rate", "bob", RATE, t0 + Duration::from_millis(500)).unwrap_err();
        match err {
            BotError::CooldownActive(remaining) => assert_eq!(remaining, Duration::from_millis(2500)),
            other => panic!("unexpected error {other:?}"),
        }

        // A denied attempt does not push the window forward
        assert!(tracker.try_consume("rate", "bob", RATE, t0 + Duration::from_millis(3100)).is_ok());
    }

    #[test]
    fn elapsed_exactly_equal_to_cooldown_is_allowed() {
        let tracker = CooldownTracker::new();
        let t0 = Instant::now();
        tracker.try_consume("rate", "bob", RATE, t0).unwrap();
        assert!(tracker.try_consume("rate", "bob", RATE, t0 + RATE).is_ok());
    }

    #[test]
    fn keys_are_independent() {
        let tracker = CooldownTracker::new();
        let t0 = Instant::now();
        tracker.try_consume("rate", "bob", RATE, t0).unwrap();

        assert!(tracker.try_consume("rate", "alice", RATE, t0).is_ok());
        assert!(tracker.try_consume("roll", "bob", RATE, t0).is_ok());
    }

    #[test]
    fn zero_cooldown_never_records() {
        let tracker = CooldownTracker::new();
        let t0 = Instant::now();
        for _ in 0..3 {
            assert!(tracker.try_consume("ping", "bob", Duration::ZERO, t0).is_ok());
        }
        assert!(tracker.is_empty());
    }

    #[test]
    fn sweep_only_drops_expired_entries() {
        let tracker = CooldownTracker::new();
        let t0 = Instant::now();
        tracker.try_consume("rate", "bob", RATE, t0).unwrap();
        tracker.try_consume("lurk", "bob", Duration::from_secs(60), t0).unwrap();

        assert_eq!(tracker.sweep(t0 + Duration::from_secs(5)), 1);
        assert_eq!(tracker.len(), 1);

        // The surviving entry still blocks
        let err = tracker.try_consume("lurk", "bob", Duration::from_secs(60), t0 + Duration::from_secs(5));
        assert!(matches!(err, Err(BotError::CooldownActive(_))));
    }
}
