use std::{collections::VecDeque, panic::AssertUnwindSafe, sync::{atomic::{AtomicBool, Ordering}, Arc}, time::Duration};

use dashmap::DashMap;
use futures::FutureExt;
use tokio::{task::JoinHandle, time::{sleep, Instant}};
use tracing::{debug, warn};

use crate::bot::{chat_event::chat_event::ChannelId, commands::commands::BotResult, handler::handler::ChatClient, outbound::chunk::split_message, privileges::privileges::PrivilegeTracker, state::def::{BotError, ShutdownPolicy}};

#[derive(Debug, Clone)]
pub struct QueuedReply {
    pub target: ChannelId,
    pub payload: String,
    pub enqueued_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    Idle,
    Draining,
}

#[derive(Default)]
struct Lane {
    queue: VecDeque<QueuedReply>,
    draining: bool,
    task: Option<JoinHandle<()>>,
}

struct ThrottleInner {
    client: Arc<dyn ChatClient>,
    privileges: PrivilegeTracker,
    min_spacing: Duration,
    max_message_len: usize,
    lanes: DashMap<ChannelId, Lane>,
    closed: AtomicBool,
}

/// Serializes outbound chat per channel.
///
/// Every channel gets its own FIFO lane so a slow, unprivileged channel never
/// holds up replies elsewhere. A lane is drained by at most one task at a time,
/// which keeps sends for one channel ordered and never concurrent. Unless the
/// bot may bypass the rate cap in that channel, each send is followed by
/// `min_spacing` of silence before the next item is popped.
#[derive(Clone)]
pub struct OutboundThrottle {
    inner: Arc<ThrottleInner>,
}

impl OutboundThrottle {
    pub fn new(client: Arc<dyn ChatClient>, privileges: PrivilegeTracker, min_spacing: Duration, max_message_len: usize) -> Self {
        OutboundThrottle {
            inner: Arc::new(ThrottleInner {
                client,
                privileges,
                min_spacing,
                max_message_len,
                lanes: DashMap::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Appends `payload` to the lane of `target`, splitting it if it is too long
    /// for one chat message, and starts draining if the lane was idle.
    pub fn enqueue(&self, target: ChannelId, payload: impl Into<String>) -> BotResult<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(BotError::QueueClosed);
        }

        let chunks = split_message(&payload.into(), self.inner.max_message_len);
        if chunks.is_empty() {
            debug!("Dropping empty reply for {}", target);
            return Ok(());
        }

        let now = Instant::now();
        let mut lane = self.inner.lanes.entry(target.clone()).or_default();
        lane.queue.extend(chunks.into_iter().map(|payload| QueuedReply { target: target.clone(), payload, enqueued_at: now }));

        if !lane.draining {
            lane.draining = true;
            lane.task = Some(tokio::spawn(drain_lane(self.inner.clone(), target)));
        }

        Ok(())
    }

    pub fn lane_state(&self, target: &ChannelId) -> LaneState {
        match self.inner.lanes.get(target) {
            Some(lane) if lane.draining => LaneState::Draining,
            _ => LaneState::Idle,
        }
    }

    /// Items still waiting on `target`'s lane, not counting one currently being sent.
    pub fn pending(&self, target: &ChannelId) -> usize {
        self.inner.lanes.get(target).map(|lane| lane.queue.len()).unwrap_or(0)
    }

    pub fn min_spacing(&self) -> Duration {
        self.inner.min_spacing
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Waits until every lane is idle.
    pub async fn flush(&self) {
        loop {
            let tasks: Vec<JoinHandle<()>> = self.inner.lanes.iter_mut().filter_map(|mut lane| lane.task.take()).collect();
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                if let Err(e) = task.await {
                    warn!("Outbound lane task ended abnormally: {}", e);
                }
            }
        }
    }

    /// Stops accepting new replies, then either lets the lanes drain or drops
    /// whatever has not been sent yet. A send already in flight always completes.
    pub async fn shutdown(&self, policy: ShutdownPolicy) {
        self.inner.closed.store(true, Ordering::Release);

        if policy == ShutdownPolicy::Discard {
            let mut dropped = 0;
            for mut lane in self.inner.lanes.iter_mut() {
                dropped += lane.queue.len();
                lane.queue.clear();
            }
            if dropped > 0 {
                warn!("Discarded {} queued replies on shutdown", dropped);
            }
        }

        self.flush().await;
    }
}

async fn drain_lane(inner: Arc<ThrottleInner>, target: ChannelId) {
    loop {
        let next = {
            let Some(mut lane) = inner.lanes.get_mut(&target) else {
                return;
            };
            match lane.queue.pop_front() {
                Some(reply) => reply,
                None => {
                    lane.draining = false;
                    lane.task = None;
                    return;
                }
            }
        };

        let bypass = inner.privileges.can_bypass(&target);
        debug!("Sending to {} after {:?} in queue", target, next.enqueued_at.elapsed());

        let sent = AssertUnwindSafe(inner.client.send_message(&next.target, &next.payload)).catch_unwind().await;
        let failure = match sent {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(BotError::DeliveryFailure(e.to_string())),
            Err(_) => Some(BotError::DeliveryFailure("transport panicked".into())),
        };
        if let Some(e) = failure {
            warn!("{} ({}): {}", e, target, next.payload);
        }

        if !bypass {
            sleep(inner.min_spacing).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{chat_event::badges::BadgeSet, test_support::RecordingClient};

    const SPACING: Duration = Duration::from_millis(1000);

    fn throttle(client: Arc<RecordingClient>, privileges: PrivilegeTracker) -> OutboundThrottle {
        OutboundThrottle::new(client, privileges, SPACING, 500)
    }

    #[tokio::test(start_paused = true)]
    async fn unprivileged_lane_spaces_sends() {
        let client = Arc::new(RecordingClient::default());
        let outbound = throttle(client.clone(), PrivilegeTracker::new("bot"));
        let x = ChannelId::new("x");

        for text in ["one", "two", "three"] {
            outbound.enqueue(x.clone(), text).unwrap();
        }
        assert_eq!(outbound.lane_state(&x), LaneState::Draining);
        outbound.flush().await;

        let sent = client.sent();
        assert_eq!(sent.iter().map(|s| s.text.as_str()).collect::<Vec<_>>(), vec!["one", "two", "three"]);
        for pair in sent.windows(2) {
            assert!(pair[1].at >= pair[0].at + SPACING);
        }
        assert_eq!(outbound.lane_state(&x), LaneState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn bypassing_lane_sends_back_to_back() {
        let client = Arc::new(RecordingClient::default());
        let privileges = PrivilegeTracker::new("bot");
        let x = ChannelId::new("x");
        privileges.update(&x, &BadgeSet::from_names(["moderator"]));
        let outbound = throttle(client.clone(), privileges);

        let start = Instant::now();
        for text in ["one", "two", "three"] {
            outbound.enqueue(x.clone(), text).unwrap();
        }
        outbound.flush().await;

        let sent = client.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|s| s.at == start));
    }

    #[tokio::test(start_paused = true)]
    async fn lanes_do_not_block_each_other() {
        let client = Arc::new(RecordingClient::default());
        let outbound = throttle(client.clone(), PrivilegeTracker::new("bot"));
        let start = Instant::now();

        outbound.enqueue(ChannelId::new("x"), "x1").unwrap();
        outbound.enqueue(ChannelId::new("x"), "x2").unwrap();
        outbound.enqueue(ChannelId::new("y"), "y1").unwrap();
        outbound.flush().await;

        let sent = client.sent();
        let y1 = sent.iter().find(|s| s.text == "y1").unwrap();
        assert_eq!(y1.at, start);
        let x2 = sent.iter().find(|s| s.text == "x2").unwrap();
        assert!(x2.at >= start + SPACING);
    }

    #[tokio::test(start_paused = true)]
    async fn spacing_holds_across_separate_bursts() {
        let client = Arc::new(RecordingClient::default());
        let outbound = throttle(client.clone(), PrivilegeTracker::new("bot"));
        let x = ChannelId::new("x");

        outbound.enqueue(x.clone(), "first").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        outbound.enqueue(x.clone(), "second").unwrap();
        outbound.flush().await;

        let sent = client.sent();
        assert!(sent[1].at >= sent[0].at + SPACING);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_does_not_stop_the_lane() {
        let client = Arc::new(RecordingClient::failing_on("boom"));
        let outbound = throttle(client.clone(), PrivilegeTracker::new("bot"));
        let x = ChannelId::new("x");

        for text in ["before", "boom", "after"] {
            outbound.enqueue(x.clone(), text).unwrap();
        }
        outbound.flush().await;

        let texts: Vec<_> = client.sent().into_iter().map(|s| s.text).collect();
        assert_eq!(texts, vec!["before", "after"]);
        assert_eq!(client.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_transport_does_not_stall_the_lane() {
        let client = Arc::new(RecordingClient::panicking_on("boom"));
        let outbound = throttle(client.clone(), PrivilegeTracker::new("bot"));
        let x = ChannelId::new("x");

        for text in ["before", "boom", "after"] {
            outbound.enqueue(x.clone(), text).unwrap();
        }
        outbound.flush().await;
        assert_eq!(outbound.lane_state(&x), LaneState::Idle);

        outbound.enqueue(x.clone(), "later").unwrap();
        outbound.flush().await;

        let texts: Vec<_> = client.sent().into_iter().map(|s| s.text).collect();
        assert_eq!(texts, vec!["before", "after", "later"]);
        assert_eq!(outbound.pending(&x), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn long_payloads_are_chunked_in_order() {
        let client = Arc::new(RecordingClient::default());
        let outbound = OutboundThrottle::new(client.clone(), PrivilegeTracker::new("bot"), SPACING, 10);
        let x = ChannelId::new("x");

        outbound.enqueue(x.clone(), "alpha beta gamma delta").unwrap();
        assert_eq!(outbound.pending(&x), 3);
        outbound.flush().await;

        let texts: Vec<_> = client.sent().into_iter().map(|s| s.text).collect();
        assert_eq!(texts, vec!["alpha beta", "gamma", "delta"]);
    }

    #[tokio::test(start_paused = true)]
    async fn discard_shutdown_drops_pending_and_rejects_new_replies() {
        let client = Arc::new(RecordingClient::default());
        let outbound = throttle(client.clone(), PrivilegeTracker::new("bot"));
        let x = ChannelId::new("x");

        for text in ["one", "two", "three"] {
            outbound.enqueue(x.clone(), text).unwrap();
        }
        // Let the first send go out
        tokio::task::yield_now().await;
        outbound.shutdown(ShutdownPolicy::Discard).await;

        assert_eq!(client.sent().len(), 1);
        assert!(matches!(outbound.enqueue(x, "late"), Err(BotError::QueueClosed)));
        assert!(outbound.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_shutdown_delivers_everything() {
        let client = Arc::new(RecordingClient::default());
        let outbound = throttle(client.clone(), PrivilegeTracker::new("bot"));
        let x = ChannelId::new("x");

        for text in ["one", "two", "three"] {
            outbound.enqueue(x.clone(), text).unwrap();
        }
        outbound.shutdown(ShutdownPolicy::Drain).await;

        assert_eq!(client.sent().len(), 3);
    }
}
