use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::version::{MIN_SUPPORTED_VERSION, PROTOCOL_VERSION};

pub const MAX_SUBSCRIBERS: usize = 10;

/// Battery state tag as reported by the source, after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RawState {
    Charging,
    Charged,
    FinishingCharge,
    Discharging,
    NoBattery,
    #[default]
    Undetermined,
}

impl RawState {
    /// Parses a source state tag. Unrecognized tags are `Undetermined`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "charging" => RawState::Charging,
            "charged" => RawState::Charged,
            "finishing charge" => RawState::FinishingCharge,
            "discharging" => RawState::Discharging,
            "no battery" => RawState::NoBattery,
            _ => RawState::Undetermined,
        }
    }

    /// Charging covers every state in which the charger is topping up the cell.
    pub fn is_charging(&self) -> bool {
        matches!(
            self,
            RawState::Charging | RawState::Charged | RawState::FinishingCharge
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            RawState::Charging => "Charging",
            RawState::Charged => "Charged",
            RawState::FinishingCharge => "Finishing Charge",
            RawState::Discharging => "On Battery",
            RawState::NoBattery => "No Battery",
            RawState::Undetermined => "Undetermined",
        }
    }
}

impl fmt::Display for RawState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One normalized battery observation.
///
/// When `no_battery` is set, `level` is 0 and `is_charging` is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BatteryReading {
    pub level: u8,
    pub is_charging: bool,
    pub no_battery: bool,
    pub raw_state: RawState,
}

impl BatteryReading {
    pub fn new(level: u8, raw_state: RawState) -> Self {
        Self {
            level: level.min(100),
            is_charging: raw_state.is_charging(),
            no_battery: false,
            raw_state,
        }
    }

    pub fn no_battery() -> Self {
        Self {
            level: 0,
            is_charging: false,
            no_battery: true,
            raw_state: RawState::NoBattery,
        }
    }

    pub fn is_full(&self) -> bool {
        self.level >= 100
    }
}

/// User-configured notification thresholds, in percent.
///
/// `low < high` is expected but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub low: u8,
    pub high: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { low: 20, high: 80 }
    }
}

/// Escalation level of a low-battery notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    VeryLow,
    Critical,
}

impl Urgency {
    pub fn for_level(level: u8) -> Self {
        if level <= 10 {
            Urgency::Critical
        } else if level <= 15 {
            Urgency::VeryLow
        } else {
            Urgency::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Urgency::Low => "LOW",
            Urgency::VeryLow => "VERY LOW",
            Urgency::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LowBattery(Urgency),
    HighBattery,
    FullBattery,
}

/// A notification the monitor decided to raise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

impl NotificationEvent {
    pub fn low_battery(level: u8) -> Self {
        let urgency = Urgency::for_level(level);
        Self {
            kind: NotificationKind::LowBattery(urgency),
            title: format!("Battery {}", urgency),
            body: format!(
                "Battery is at {}%. Please plug in your charger immediately!",
                level
            ),
        }
    }

    pub fn high_battery(level: u8) -> Self {
        Self {
            kind: NotificationKind::HighBattery,
            title: "Battery Almost Full".to_string(),
            body: format!("Battery is at {}%. You can unplug your charger.", level),
        }
    }

    pub fn full_battery() -> Self {
        Self {
            kind: NotificationKind::FullBattery,
            title: "Battery Full 🔋".to_string(),
            body: "Battery is fully charged! Unplug your charger to preserve battery health."
                .to_string(),
        }
    }
}

/// Result of the on-demand analytics query.
///
/// Hardware fields come from the system inventory; the minute counters and
/// `last_full_charge` come from the charging session tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryAnalytics {
    pub health: String,
    pub cycle_count: u32,
    pub design_capacity_wh: f32,
    pub current_capacity_wh: f32,
    pub time_at_100_minutes: u64,
    pub total_charge_minutes: u64,
    pub total_overcharge_minutes: u64,
    /// Unix timestamp of the last time the battery reached 100% while charging.
    #[serde(default)]
    pub last_full_charge: Option<i64>,
}

impl BatteryAnalytics {
    pub fn last_full_charge_label(&self) -> String {
        self.last_full_charge
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|dt| {
                dt.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|| "-".to_string())
    }
}

impl Default for BatteryAnalytics {
    fn default() -> Self {
        Self {
            health: "Unknown".to_string(),
            cycle_count: 0,
            design_capacity_wh: 0.0,
            current_capacity_wh: 0.0,
            time_at_100_minutes: 0,
            total_charge_minutes: 0,
            total_overcharge_minutes: 0,
            last_full_charge: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub tick_count: u64,
    pub version: String,
    pub subscriber_count: usize,
    pub notifications_enabled: bool,
    #[serde(default)]
    pub thresholds: Thresholds,
    pub protocol_version: u32,
    pub min_supported_version: u32,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        Self {
            running: false,
            uptime_secs: 0,
            tick_count: 0,
            version: String::new(),
            subscriber_count: 0,
            notifications_enabled: true,
            thresholds: Thresholds::default(),
            protocol_version: PROTOCOL_VERSION,
            min_supported_version: MIN_SUPPORTED_VERSION,
        }
    }
}
