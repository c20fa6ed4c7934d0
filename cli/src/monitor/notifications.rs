use chargewatch_protocol::{BatteryReading, NotificationEvent, Thresholds};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

pub const LOW_BATTERY_COOLDOWN_MS: i64 = 120_000;
pub const HIGH_BATTERY_COOLDOWN_MS: i64 = 300_000;
pub const FULL_BATTERY_COOLDOWN_MS: i64 = 600_000;

/// Cooldown bookkeeping for one notification class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownState {
    pub last_fired_at: Option<DateTime<Utc>>,
    cooldown: TimeDelta,
}

impl CooldownState {
    pub fn new(cooldown_ms: i64) -> Self {
        Self {
            last_fired_at: None,
            cooldown: TimeDelta::milliseconds(cooldown_ms),
        }
    }

    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        match self.last_fired_at {
            None => true,
            Some(last) => now - last >= self.cooldown,
        }
    }

    pub fn mark(&mut self, now: DateTime<Utc>) {
        self.last_fired_at = Some(now);
    }
}

/// Decides which low/high/full notifications a reading should raise.
///
/// Each class has its own cooldown. When charging starts, the low-battery
/// clock is restarted so plugging in never triggers a low-battery alert.
pub struct NotificationEngine {
    low: CooldownState,
    high: CooldownState,
    full: CooldownState,
    was_charging: bool,
}

impl NotificationEngine {
    pub fn new() -> Self {
        Self {
            low: CooldownState::new(LOW_BATTERY_COOLDOWN_MS),
            high: CooldownState::new(HIGH_BATTERY_COOLDOWN_MS),
            full: CooldownState::new(FULL_BATTERY_COOLDOWN_MS),
            was_charging: false,
        }
    }

    pub fn decide(
        &mut self,
        reading: &BatteryReading,
        thresholds: Thresholds,
        now: DateTime<Utc>,
    ) -> Vec<NotificationEvent> {
        let mut events = Vec::new();
        if reading.no_battery {
            return events;
        }

        let level = reading.level;
        let is_charging = reading.is_charging;

        if is_charging != self.was_charging {
            debug!(from = self.was_charging, to = is_charging, "Charging state changed");
            self.was_charging = is_charging;
            if is_charging {
                self.low.mark(now);
                debug!("Started charging, low battery notifications paused");
            }
        }

        if level <= thresholds.low && !is_charging && self.low.is_ready(now) {
            events.push(NotificationEvent::low_battery(level));
            self.low.mark(now);
            info!(level, "Low battery notification");
        }

        if reading.is_full() && is_charging {
            if self.full.is_ready(now) {
                events.push(NotificationEvent::full_battery());
                self.full.mark(now);
                info!(level, "Full battery notification");
            }
        } else if level >= thresholds.high && level < 100 && is_charging && self.high.is_ready(now)
        {
            events.push(NotificationEvent::high_battery(level));
            self.high.mark(now);
            info!(level, "High battery notification");
        }

        events
    }
}

#[cfg(test)]
impl NotificationEngine {
    pub fn low(&self) -> &CooldownState {
        &self.low
    }

    pub fn high(&self) -> &CooldownState {
        &self.high
    }

    pub fn full(&self) -> &CooldownState {
        &self.full
    }
}

impl Default for NotificationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chargewatch_protocol::{NotificationKind, RawState, Urgency};

    fn t(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + TimeDelta::milliseconds(ms)
    }

    fn charging(level: u8) -> BatteryReading {
        BatteryReading::new(level, RawState::Charging)
    }

    fn discharging(level: u8) -> BatteryReading {
        BatteryReading::new(level, RawState::Discharging)
    }

    fn kinds(events: &[NotificationEvent]) -> Vec<NotificationKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_low_battery_urgency_progression() {
        let mut engine = NotificationEngine::new();
        let thresholds = Thresholds { low: 20, high: 80 };

        let mut titles = Vec::new();
        for (i, level) in [25, 20, 15, 8].into_iter().enumerate() {
            let now = t(i as i64 * LOW_BATTERY_COOLDOWN_MS);
            let events = engine.decide(&discharging(level), thresholds, now);
            titles.push(events.first().map(|e| e.title.clone()));
        }

        assert_eq!(
            titles,
            vec![
                None,
                Some("Battery LOW".to_string()),
                Some("Battery VERY LOW".to_string()),
                Some("Battery CRITICAL".to_string()),
            ]
        );
    }

    #[test]
    fn test_low_battery_cooldown() {
        let mut engine = NotificationEngine::new();
        let thresholds = Thresholds::default();
        let mut fired_at = Vec::new();

        for tick in 0..100 {
            let now = t(tick * 5_000);
            if !engine.decide(&discharging(12), thresholds, now).is_empty() {
                fired_at.push(tick * 5_000);
            }
        }

        assert_eq!(fired_at, vec![0, 120_000, 240_000, 360_000, 480_000]);
    }

    #[test]
    fn test_charging_start_resets_low_cooldown() {
        let mut engine = NotificationEngine::new();
        let thresholds = Thresholds::default();

        assert_eq!(engine.decide(&discharging(10), thresholds, t(0)).len(), 1);

        // plugged in at 200s, then unplugged right away
        assert!(engine.decide(&charging(10), thresholds, t(200_000)).is_empty());
        assert_eq!(engine.low().last_fired_at, Some(t(200_000)));

        assert!(engine
            .decide(&discharging(10), thresholds, t(205_000))
            .is_empty());
        assert!(engine
            .decide(&discharging(10), thresholds, t(315_000))
            .is_empty());
        assert_eq!(
            kinds(&engine.decide(&discharging(10), thresholds, t(320_000))),
            vec![NotificationKind::LowBattery(Urgency::Critical)]
        );
    }

    #[test]
    fn test_first_charging_tick_counts_as_transition() {
        let mut engine = NotificationEngine::new();
        engine.decide(&charging(50), Thresholds::default(), t(0));
        assert_eq!(engine.low().last_fired_at, Some(t(0)));
    }

    #[test]
    fn test_full_battery_fires_once_per_cooldown() {
        let mut engine = NotificationEngine::new();
        let thresholds = Thresholds::default();
        let mut fired_at = Vec::new();

        // 20 minutes of 5s ticks at 100%
        for tick in 0..240 {
            let now = t(tick * 5_000);
            let events = engine.decide(&charging(100), thresholds, now);
            if events.iter().any(|e| e.kind == NotificationKind::FullBattery) {
                fired_at.push(tick * 5_000);
            }
            assert!(!events.iter().any(|e| e.kind == NotificationKind::HighBattery));
        }

        assert_eq!(fired_at, vec![0, FULL_BATTERY_COOLDOWN_MS]);
    }

    #[test]
    fn test_high_battery_cooldown() {
        let mut engine = NotificationEngine::new();
        let thresholds = Thresholds::default();
        let mut fired_at = Vec::new();

        for tick in 0..130 {
            let now = t(tick * 5_000);
            if !engine.decide(&charging(85), thresholds, now).is_empty() {
                fired_at.push(tick * 5_000);
            }
        }

        assert_eq!(fired_at, vec![0, 300_000, 600_000]);
    }

    #[test]
    fn test_high_suppressed_while_full_fires_and_during_full_cooldown() {
        let mut engine = NotificationEngine::new();
        let thresholds = Thresholds::default();

        let events = engine.decide(&charging(100), thresholds, t(0));
        assert_eq!(kinds(&events), vec![NotificationKind::FullBattery]);
        assert_eq!(engine.high().last_fired_at, None);

        // still at 100% inside the full cooldown: neither class fires
        assert!(engine.decide(&charging(100), thresholds, t(5_000)).is_empty());

        let events = engine.decide(&charging(99), thresholds, t(10_000));
        assert_eq!(kinds(&events), vec![NotificationKind::HighBattery]);
    }

    #[test]
    fn test_high_requires_charging() {
        let mut engine = NotificationEngine::new();
        assert!(engine
            .decide(&discharging(90), Thresholds::default(), t(0))
            .is_empty());
    }

    #[test]
    fn test_inverted_thresholds_are_not_validated() {
        let mut engine = NotificationEngine::new();
        let thresholds = Thresholds { low: 90, high: 30 };

        let events = engine.decide(&discharging(50), thresholds, t(0));
        assert_eq!(kinds(&events), vec![NotificationKind::LowBattery(Urgency::Low)]);

        let events = engine.decide(&charging(50), thresholds, t(1_000));
        assert_eq!(kinds(&events), vec![NotificationKind::HighBattery]);
    }

    #[test]
    fn test_no_battery_emits_nothing_and_keeps_state() {
        let mut engine = NotificationEngine::new();
        for tick in 0..10 {
            let events =
                engine.decide(&BatteryReading::no_battery(), Thresholds::default(), t(tick));
            assert!(events.is_empty());
        }
        assert_eq!(engine.low().last_fired_at, None);
        assert_eq!(engine.full().last_fired_at, None);
    }

    #[test]
    fn test_cooldown_state() {
        let mut state = CooldownState::new(1_000);
        assert!(state.is_ready(t(0)));
        state.mark(t(0));
        assert!(!state.is_ready(t(999)));
        assert!(state.is_ready(t(1_000)));
    }
}
