use chargewatch_protocol::BatteryReading;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Timers for the current charge cycle.
///
/// `full_since` is only set while `charging_started_at` is set and the last
/// observed level was 100.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChargingSession {
    pub charging_started_at: Option<DateTime<Utc>>,
    pub full_since: Option<DateTime<Utc>>,
    /// Minutes spent at 100% while charging in this cycle. Reset when charging stops.
    pub accumulated_overcharge_minutes: u64,
}

/// Time-derived analytics for the current charge cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyticsSnapshot {
    pub time_at_100_minutes: u64,
    pub total_charge_minutes: u64,
    pub total_overcharge_minutes: u64,
    pub last_full_charge: Option<DateTime<Utc>>,
}

/// Derives charge-cycle analytics from the stream of per-tick readings.
pub struct SessionTracker {
    session: ChargingSession,
    was_charging: bool,
    last_full_charge: Option<DateTime<Utc>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            session: ChargingSession::default(),
            was_charging: false,
            last_full_charge: None,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &ChargingSession {
        &self.session
    }

    /// Advances the session with one reading. No-battery readings are ignored.
    pub fn observe(&mut self, reading: &BatteryReading, now: DateTime<Utc>) {
        if reading.no_battery {
            return;
        }

        let is_charging = reading.is_charging;

        if is_charging && !self.was_charging {
            self.session.charging_started_at = Some(now);
            info!(level = reading.level, "Charging started");
        }

        if !is_charging && self.was_charging {
            self.session = ChargingSession::default();
            info!(level = reading.level, "Charging stopped, session reset");
        }

        if reading.is_full() && is_charging {
            if self.session.full_since.is_none() {
                self.session.full_since = Some(now);
                self.last_full_charge = Some(now);
                info!("Battery reached 100% while charging");
            }
        } else if let Some(full_since) = self.session.full_since.take() {
            let minutes = elapsed_minutes(full_since, now);
            self.session.accumulated_overcharge_minutes += minutes;
            debug!(
                minutes,
                total = self.session.accumulated_overcharge_minutes,
                "Left 100%, overcharge time accumulated"
            );
        }

        self.was_charging = is_charging;
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            time_at_100_minutes: self
                .session
                .full_since
                .map(|since| elapsed_minutes(since, now))
                .unwrap_or(0),
            total_charge_minutes: self
                .session
                .charging_started_at
                .map(|since| elapsed_minutes(since, now))
                .unwrap_or(0),
            total_overcharge_minutes: self.session.accumulated_overcharge_minutes,
            last_full_charge: self.last_full_charge,
        }
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole minutes between two instants. Backwards clock jumps count as zero.
fn elapsed_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_minutes().max(0) as u64
}
