use std::time::Duration;

use chargewatch_protocol::{BatteryAnalytics, BatteryReading, Thresholds};
use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::analytics::build_analytics;
use super::normalizer::Normalizer;
use super::notifications::NotificationEngine;
use super::session::{AnalyticsSnapshot, SessionTracker};
use super::settings::SettingsStore;
use super::sinks::{DisplaySink, NotifierSink};
use super::source::{BatterySource, HardwareInventory};

/// How long an in-flight tick may keep running after cancellation.
pub const TICK_GRACE: Duration = Duration::from_secs(1);

/// Owns all monitor state and runs one poll cycle per `tick`.
pub struct Scheduler<S> {
    source: S,
    normalizer: Normalizer,
    tracker: SessionTracker,
    engine: NotificationEngine,
    settings: Box<dyn SettingsStore>,
    display: Option<Box<dyn DisplaySink>>,
    notifier: Option<Box<dyn NotifierSink>>,
    token: CancellationToken,
    tick_count: u64,
    torn_down: bool,
}

impl<S: BatterySource> Scheduler<S> {
    pub fn new(
        source: S,
        settings: Box<dyn SettingsStore>,
        display: Box<dyn DisplaySink>,
        notifier: Box<dyn NotifierSink>,
        token: CancellationToken,
    ) -> Self {
        Self {
            source,
            normalizer: Normalizer::new(),
            tracker: SessionTracker::new(),
            engine: NotificationEngine::new(),
            settings,
            display: Some(display),
            notifier: Some(notifier),
            token,
            tick_count: 0,
            torn_down: false,
        }
    }

    #[cfg(test)]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Token shared with the poll timer; cancelled by `teardown`.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Queries the source and normalizes, without touching session or cooldown state.
    pub async fn current_reading(&mut self) -> BatteryReading {
        let sample = self.source.query().await;
        self.normalizer.reading(sample)
    }

    /// Initial tick: pushes a reading to the display only.
    pub async fn prime(&mut self) -> BatteryReading {
        let reading = self.current_reading().await;
        self.show(&reading);
        reading
    }

    /// One poll cycle: query, normalize, track, decide, then push to the sinks.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> BatteryReading {
        let reading = self.current_reading().await;
        self.tick_count += 1;

        let events = if reading.no_battery {
            Vec::new()
        } else {
            self.tracker.observe(&reading, now);
            self.engine
                .decide(&reading, self.settings.thresholds(), now)
        };

        self.show(&reading);
        if let Some(notifier) = self.notifier.as_mut() {
            for event in &events {
                if let Err(e) = notifier.notify(event) {
                    warn!(error = %e, title = %event.title, "Notifier sink failed");
                }
            }
        }

        reading
    }

    /// Runs `tick`, allowing it `TICK_GRACE` to finish if cancellation arrives mid-flight.
    ///
    /// Returns `None` when the tick was abandoned.
    pub async fn tick_with_grace(&mut self, now: DateTime<Utc>) -> Option<BatteryReading> {
        let token = self.token.clone();
        let tick = self.tick(now);
        tokio::pin!(tick);

        tokio::select! {
            biased;
            reading = &mut tick => Some(reading),
            _ = token.cancelled() => match tokio::time::timeout(TICK_GRACE, tick).await {
                Ok(reading) => Some(reading),
                Err(_) => {
                    warn!("Tick still running after shutdown grace period, abandoning");
                    None
                }
            },
        }
    }

    fn show(&mut self, reading: &BatteryReading) {
        if let Some(display) = self.display.as_mut() {
            if let Err(e) = display.show(reading) {
                warn!(error = %e, "Display sink failed");
            }
        }
    }
}

impl<S> Scheduler<S> {
    pub fn thresholds(&self) -> Thresholds {
        self.settings.thresholds()
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<()> {
        self.settings.set_thresholds(thresholds)?;
        info!(low = thresholds.low, high = thresholds.high, "Thresholds updated");
        Ok(())
    }

    pub fn analytics_snapshot(&self, now: DateTime<Utc>) -> AnalyticsSnapshot {
        self.tracker.snapshot(now)
    }

    /// Cancels the timer and releases the sinks.
    ///
    /// Returns `true` only for the call that did the work.
    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;
        self.token.cancel();
        self.display = None;
        self.notifier = None;
        debug!(ticks = self.tick_count, "Scheduler torn down");
        true
    }
}

impl<S: HardwareInventory> Scheduler<S> {
    pub fn analytics(&mut self, now: DateTime<Utc>) -> BatteryAnalytics {
        let snapshot = self.analytics_snapshot(now);
        build_analytics(&snapshot, self.source.inventory())
    }
}

impl<S> Drop for Scheduler<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
