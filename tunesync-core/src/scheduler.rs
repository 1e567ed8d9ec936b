//! Tick scheduling strategies for the sync engine.
//!
//! The engine only asks "what is the next tick?"; whether ticks come from
//! wall-clock intervals or are pushed by a host (or a test) is up to the
//! injected [`Scheduler`].

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};

/// Which cadence fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Coarse cadence: fetch a snapshot from the playback source
    Info,
    /// Fine cadence: re-resolve progress and lyrics from the last snapshot
    Progress,
}

/// Source of engine ticks.
#[async_trait]
pub trait Scheduler: Send {
    /// Wait for the next tick. Must be cancel-safe.
    async fn next(&mut self) -> Tick;

    /// Restart all cadences; the next info tick fires without delay.
    fn reset(&mut self);
}

/// Two independent wall-clock cadences backed by tokio intervals.
///
/// Missed ticks are skipped rather than bursted, so a slow snapshot fetch
/// never causes a backlog of polls.
pub struct IntervalScheduler {
    info: Interval,
    progress: Interval,
}

impl IntervalScheduler {
    #[must_use]
    pub fn new(info_period: Duration, progress_period: Duration) -> Self {
        let mut info = time::interval(info_period);
        info.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut progress = time::interval(progress_period);
        progress.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { info, progress }
    }
}

#[async_trait]
impl Scheduler for IntervalScheduler {
    async fn next(&mut self) -> Tick {
        // Info wins when both are due so progress always sees the fresh snapshot
        tokio::select! {
            biased;
            _ = self.info.tick() => Tick::Info,
            _ = self.progress.tick() => Tick::Progress,
        }
    }

    fn reset(&mut self) {
        self.info.reset_immediately();
        self.progress.reset();
    }
}

/// Scheduler driven by explicit [`ManualTicker::tick`] calls.
///
/// Used by hosts that already own an event loop, and by tests.
pub struct ManualScheduler {
    rx: mpsc::UnboundedReceiver<Tick>,
}

/// Sending half of a [`ManualScheduler`].
#[derive(Debug, Clone)]
pub struct ManualTicker {
    tx: mpsc::UnboundedSender<Tick>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> (Self, ManualTicker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, ManualTicker { tx })
    }
}

impl ManualTicker {
    /// Queue a tick. Returns `false` if the scheduler is gone.
    pub fn tick(&self, tick: Tick) -> bool {
        self.tx.send(tick).is_ok()
    }
}

#[async_trait]
impl Scheduler for ManualScheduler {
    async fn next(&mut self) -> Tick {
        match self.rx.recv().await {
            Some(tick) => tick,
            // All tickers dropped: no more ticks, ever
            None => std::future::pending().await,
        }
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_interval_scheduler_cadences() {
        let mut scheduler =
            IntervalScheduler::new(Duration::from_millis(1000), Duration::from_millis(100));

        // Both fire immediately; info first
        assert_eq!(scheduler.next().await, Tick::Info);
        assert_eq!(scheduler.next().await, Tick::Progress);

        let mut progress = 0;
        let mut info = 0;
        let start = time::Instant::now();
        while start.elapsed() < Duration::from_millis(1000) {
            match scheduler.next().await {
                Tick::Info => info += 1,
                Tick::Progress => progress += 1,
            }
        }
        assert_eq!(info, 1);
        assert_eq!(progress, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_scheduler_reset_fires_info() {
        let mut scheduler =
            IntervalScheduler::new(Duration::from_millis(1000), Duration::from_millis(100));
        scheduler.next().await;
        scheduler.next().await;

        time::advance(Duration::from_millis(350)).await;
        scheduler.reset();
        assert_eq!(scheduler.next().await, Tick::Info);
    }

    #[tokio::test]
    async fn test_manual_scheduler_delivers_in_order() {
        let (mut scheduler, ticker) = ManualScheduler::new();
        assert!(ticker.tick(Tick::Progress));
        assert!(ticker.tick(Tick::Info));
        assert_eq!(scheduler.next().await, Tick::Progress);
        assert_eq!(scheduler.next().await, Tick::Info);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_scheduler_pends_after_ticker_dropped() {
        let (mut scheduler, ticker) = ManualScheduler::new();
        drop(ticker);
        let result = time::timeout(Duration::from_secs(1), scheduler.next()).await;
        assert!(result.is_err());
    }
}
