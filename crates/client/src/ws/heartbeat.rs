//! Application-level liveness detection.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

use super::scheduler::ScheduledTask;

/// Outcome of a heartbeat check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Traffic seen recently; send the next ping.
    Alive,
    /// Nothing heard for longer than twice the ping interval.
    Stale { silent_for: Duration },
}

/// Resolution of the liveness deadline past the stale threshold.
const DEADLINE_SLACK: Duration = Duration::from_millis(1);

/// Pings on a fixed interval and tracks the last inbound traffic.
///
/// Sockets can report open while being half-dead, so liveness is judged from
/// traffic alone, not from transport callbacks. Staleness is caught by a
/// deadline timer rather than by the ping ticks, so a silent link is flagged
/// right after twice the interval.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    last_traffic_at: Option<Instant>,
    ticker: Option<ScheduledTask>,
    deadline: Option<ScheduledTask>,
}

impl HeartbeatMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_traffic_at: None,
            ticker: None,
            deadline: None,
        }
    }

    /// Begin ticking. The connection counts as fresh traffic.
    pub fn start<E, F>(&mut self, events: UnboundedSender<E>, make_tick: F)
    where
        E: Send + 'static,
        F: Fn() -> E + Send + 'static,
    {
        self.last_traffic_at = Some(Instant::now());
        self.ticker = Some(ScheduledTask::every(self.interval, events, make_tick));
    }

    pub fn stop(&mut self) {
        self.ticker = None;
        self.deadline = None;
        self.last_traffic_at = None;
    }

    /// Deliver `event` at [`Self::stale_at`], replacing any earlier deadline.
    /// Call [`Self::check`] when it arrives and re-arm if still alive.
    pub fn arm_deadline<E>(&mut self, events: UnboundedSender<E>, event: E)
    where
        E: Send + 'static,
    {
        self.deadline = self
            .stale_at()
            .map(|at| ScheduledTask::at(at, events, event));
    }

    pub fn record_traffic(&mut self) {
        self.record_traffic_at(Instant::now());
    }

    pub fn record_traffic_at(&mut self, at: Instant) {
        self.last_traffic_at = Some(at);
    }

    pub fn last_traffic_at(&self) -> Option<Instant> {
        self.last_traffic_at
    }

    pub fn stale_after(&self) -> Duration {
        self.interval * 2
    }

    /// The earliest instant at which [`Self::check`] reports stale, given the
    /// traffic seen so far.
    pub fn stale_at(&self) -> Option<Instant> {
        self.last_traffic_at
            .map(|last| last + self.stale_after() + DEADLINE_SLACK)
    }

    pub fn check(&self, now: Instant) -> Liveness {
        let Some(last) = self.last_traffic_at else {
            return Liveness::Alive;
        };
        let silent_for = now.saturating_duration_since(last);
        if silent_for > self.stale_after() {
            Liveness::Stale { silent_for }
        } else {
            Liveness::Alive
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn stale_only_after_twice_the_interval() {
        let mut monitor = HeartbeatMonitor::new(Duration::from_secs(30));
        let start = Instant::now();
        monitor.record_traffic_at(start);

        assert_eq!(monitor.check(start + Duration::from_secs(30)), Liveness::Alive);
        assert_eq!(monitor.check(start + Duration::from_secs(60)), Liveness::Alive);
        assert_eq!(
            monitor.check(start + Duration::from_secs(61)),
            Liveness::Stale {
                silent_for: Duration::from_secs(61)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn traffic_pushes_staleness_out() {
        let mut monitor = HeartbeatMonitor::new(Duration::from_secs(30));
        let start = Instant::now();
        monitor.record_traffic_at(start);
        monitor.record_traffic_at(start + Duration::from_secs(50));
        assert_eq!(monitor.check(start + Duration::from_secs(100)), Liveness::Alive);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_until_stopped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut monitor = HeartbeatMonitor::new(Duration::from_secs(30));
        monitor.start(tx, || "tick");
        assert_eq!(rx.recv().await, Some("tick"));

        monitor.stop();
        assert!(monitor.last_traffic_at().is_none());
        // the ticker task is aborted, so the channel closes
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_just_past_twice_the_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut monitor = HeartbeatMonitor::new(Duration::from_secs(30));
        let start = Instant::now();
        monitor.record_traffic_at(start);
        monitor.arm_deadline(tx.clone(), "due");

        assert_eq!(rx.recv().await, Some("due"));
        let fired_at = Instant::now();
        assert!(fired_at - start > Duration::from_secs(60));
        assert!(fired_at - start < Duration::from_secs(61));
        assert!(matches!(monitor.check(fired_at), Liveness::Stale { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_follows_latest_traffic() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut monitor = HeartbeatMonitor::new(Duration::from_secs(30));
        let start = Instant::now();
        monitor.record_traffic_at(start);
        monitor.arm_deadline(tx.clone(), "first");
        monitor.record_traffic_at(start + Duration::from_secs(40));
        monitor.arm_deadline(tx.clone(), "second");

        // the replaced deadline never fires
        assert_eq!(rx.recv().await, Some("second"));
        assert!(start.elapsed() > Duration::from_secs(100));
        assert!(rx.try_recv().is_err());
    }
}
