use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Reconnecting { attempt: u32, delay: Duration },
    Disconnected,
}

#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy { base: Duration::from_secs(2), cap: Duration::from_secs(64), max_attempts: 25 }
    }
}

impl ReconnectPolicy {
    /// Exponential delay before `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
        self.base.saturating_mul(factor).min(self.cap)
    }
}

/// Tracks how many consecutive reconnects have failed since the last successful login.
#[derive(Debug)]
pub struct Connection {
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempt: u32,
}

impl Connection {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Connection { policy, state: ConnectionState::Disconnected, attempt: 0 }
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn on_connected(&mut self) {
        self.attempt = 0;
        self.state = ConnectionState::Connected;
    }

    /// Moves to `Reconnecting` with a jittered delay, or to `Disconnected`
    /// once the attempt budget is spent.
    pub fn on_disconnect<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ConnectionState {
        self.attempt += 1;
        self.state = if self.attempt > self.policy.max_attempts {
            ConnectionState::Disconnected
        } else {
            let jitter: f64 = rng.random_range(0.8..=1.0);
            let delay = self.policy.backoff(self.attempt).mul_f64(jitter);
            ConnectionState::Reconnecting { attempt: self.attempt, delay }
        };
        self.state
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(6), Duration::from_secs(64));
        assert_eq!(policy.backoff(20), Duration::from_secs(64));
    }

    #[test]
    fn delays_are_jittered_below_the_backoff() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut conn = Connection::new(ReconnectPolicy::default());

        for attempt in 1..=8 {
            match conn.on_disconnect(&mut rng) {
                ConnectionState::Reconnecting { attempt: a, delay } => {
                    let ceiling = ReconnectPolicy::default().backoff(attempt);
                    assert_eq!(a, attempt);
                    assert!(delay <= ceiling);
                    assert!(delay >= ceiling.mul_f64(0.8));
                }
                other => panic!("unexpected state {other:?}"),
            }
        }
    }

    #[test]
    fn gives_up_after_the_attempt_budget() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut conn = Connection::new(ReconnectPolicy { max_attempts: 2, ..Default::default() });

        assert!(matches!(conn.on_disconnect(&mut rng), ConnectionState::Reconnecting { .. }));
        assert!(matches!(conn.on_disconnect(&mut rng), ConnectionState::Reconnecting { .. }));
        assert_eq!(conn.on_disconnect(&mut rng), ConnectionState::Disconnected);
    }

    #[test]
    fn successful_login_resets_the_counter() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut conn = Connection::new(ReconnectPolicy::default());
        conn.on_disconnect(&mut rng);
        conn.on_disconnect(&mut rng);
        conn.on_connected();

        assert_eq!(conn.state(), ConnectionState::Connected);
        assert!(matches!(conn.on_disconnect(&mut rng), ConnectionState::Reconnecting { attempt: 1, .. }));
    }
}
