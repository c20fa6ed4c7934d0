use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    /// One-shot tick shortly after startup that primes the display.
    Initial,
    /// Fixed-period poll tick.
    Periodic,
}

/// Recurring poll schedule with a one-shot initial tick and cancellation.
///
/// The caller runs each tick to completion before asking for the next one,
/// so ticks never overlap; a slow tick only delays the following one.
pub struct PollTimer {
    initial: Option<Pin<Box<Sleep>>>,
    interval: Interval,
    token: CancellationToken,
}

impl PollTimer {
    pub fn new(period: Duration, initial_delay: Duration, token: CancellationToken) -> Self {
        let start = Instant::now();
        let mut interval = tokio::time::interval_at(start + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            initial: Some(Box::pin(tokio::time::sleep_until(start + initial_delay))),
            interval,
            token,
        }
    }

    /// Waits for the next tick. Returns `None` once cancelled.
    pub async fn next(&mut self) -> Option<TickKind> {
        if self.token.is_cancelled() {
            return None;
        }

        let kind = tokio::select! {
            biased;
            _ = self.token.cancelled() => return None,
            _ = wait_initial(&mut self.initial) => TickKind::Initial,
            _ = self.interval.tick() => TickKind::Periodic,
        };

        if kind == TickKind::Initial {
            self.initial = None;
        }
        Some(kind)
    }
}

async fn wait_initial(initial: &mut Option<Pin<Box<Sleep>>>) {
    match initial {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_initial_then_periodic() {
        let start = Instant::now();
        let mut timer = PollTimer::new(
            Duration::from_secs(5),
            Duration::from_secs(1),
            CancellationToken::new(),
        );

        assert_eq!(timer.next().await, Some(TickKind::Initial));
        assert_eq!(start.elapsed(), Duration::from_secs(1));

        assert_eq!(timer.next().await, Some(TickKind::Periodic));
        assert_eq!(start.elapsed(), Duration::from_secs(5));

        assert_eq!(timer.next().await, Some(TickKind::Periodic));
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_tick_delays_without_burst() {
        let start = Instant::now();
        let mut timer = PollTimer::new(
            Duration::from_secs(5),
            Duration::from_secs(1),
            CancellationToken::new(),
        );
        assert_eq!(timer.next().await, Some(TickKind::Initial));
        assert_eq!(timer.next().await, Some(TickKind::Periodic));

        // a tick that takes 12s
        tokio::time::sleep(Duration::from_secs(12)).await;

        assert_eq!(timer.next().await, Some(TickKind::Periodic));
        assert_eq!(start.elapsed(), Duration::from_secs(17));
        assert_eq!(timer.next().await, Some(TickKind::Periodic));
        assert_eq!(start.elapsed(), Duration::from_secs(22));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let token = CancellationToken::new();
        let mut timer =
            PollTimer::new(Duration::from_secs(5), Duration::from_secs(1), token.clone());

        assert_eq!(timer.next().await, Some(TickKind::Initial));
        token.cancel();
        assert_eq!(timer.next().await, None);
        assert_eq!(timer.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_waiting() {
        let token = CancellationToken::new();
        let mut timer =
            PollTimer::new(Duration::from_secs(5), Duration::from_secs(1), token.clone());

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            canceller.cancel();
        });

        assert_eq!(timer.next().await, None);
    }
}
