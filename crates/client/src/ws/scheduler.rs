//! Cancellable timers that report back over a channel.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// A spawned timer. Dropping it cancels the timer.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Deliver `event` once after `delay`.
    pub fn once<E>(delay: Duration, events: UnboundedSender<E>, event: E) -> Self
    where
        E: Send + 'static,
    {
        Self::at(Instant::now() + delay, events, event)
    }

    /// Deliver `event` once at `deadline`.
    pub fn at<E>(deadline: Instant, events: UnboundedSender<E>, event: E) -> Self
    where
        E: Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = events.send(event);
        });
        Self { handle }
    }

    /// Deliver `make_event()` every `period`, first tick one period from now.
    pub fn every<E, F>(period: Duration, events: UnboundedSender<E>, make_event: F) -> Self
    where
        E: Send + 'static,
        F: Fn() -> E + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(make_event()).is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn once_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();
        let _task = ScheduledTask::once(Duration::from_secs(5), tx, "due");
        assert_eq!(rx.recv().await, Some("due"));
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_task_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = ScheduledTask::once(Duration::from_secs(5), tx, "due");
        drop(task);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn every_ticks_on_the_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();
        let _task = ScheduledTask::every(Duration::from_secs(30), tx, || ());
        rx.recv().await;
        assert_eq!(start.elapsed().as_secs(), 30);
        rx.recv().await;
        assert_eq!(start.elapsed().as_secs(), 60);
    }
}
