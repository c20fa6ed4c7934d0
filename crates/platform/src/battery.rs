//! Battery provider trait and snapshot types.

use color_eyre::eyre::Result;

use crate::types::{ChargeState, RawSample};

/// Health percentage at or above which the battery condition is "Normal".
const NORMAL_CONDITION_PERCENT: f32 = 80.0;

/// Battery information snapshot.
///
/// All values represent the state at the time of the last refresh.
#[derive(Debug, Clone, Default)]
pub struct BatteryInfo {
    /// Whether a battery was found at all.
    pub present: bool,

    /// Current charge level as a percentage (0-100).
    pub charge_percent: f32,

    /// Current charging state.
    pub state: ChargeState,

    /// Maximum capacity in watt-hours (current full charge capacity).
    pub max_capacity_wh: f32,

    /// Design capacity in watt-hours (original factory capacity).
    pub design_capacity_wh: f32,

    /// Battery health as a percentage (0-100).
    pub health_percent: f32,

    /// Number of charge cycles, if available.
    pub cycle_count: Option<u32>,

    /// Whether external power is connected.
    pub external_connected: bool,
}

impl BatteryInfo {
    /// The `{percent, state}` pair the monitor consumes each tick.
    pub fn raw_sample(&self) -> RawSample {
        if !self.present {
            return RawSample::no_battery();
        }
        RawSample::new(self.charge_percent, self.state.tag())
    }

    /// Inventory fields for the analytics query.
    pub fn hardware_health(&self) -> HardwareHealth {
        if !self.present {
            return HardwareHealth::unknown();
        }
        HardwareHealth {
            condition: condition_label(self.health_percent).to_string(),
            cycle_count: self.cycle_count.unwrap_or(0),
            design_capacity_wh: self.design_capacity_wh,
            current_capacity_wh: self.max_capacity_wh,
        }
    }
}

/// Hardware-health fields reported alongside charging analytics.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareHealth {
    /// Battery condition ("Normal", "Service Recommended", "Unknown").
    pub condition: String,
    pub cycle_count: u32,
    pub design_capacity_wh: f32,
    pub current_capacity_wh: f32,
}

impl HardwareHealth {
    pub fn unknown() -> Self {
        Self {
            condition: "Unknown".to_string(),
            cycle_count: 0,
            design_capacity_wh: 0.0,
            current_capacity_wh: 0.0,
        }
    }
}

fn condition_label(health_percent: f32) -> &'static str {
    if health_percent <= 0.0 {
        "Unknown"
    } else if health_percent >= NORMAL_CONDITION_PERCENT {
        "Normal"
    } else {
        "Service Recommended"
    }
}

/// Trait for platform-specific battery providers.
pub trait BatteryProvider {
    /// Create a new battery provider instance.
    fn new() -> Result<Self>
    where
        Self: Sized;

    /// Refresh battery information from the system.
    fn refresh(&mut self) -> Result<()>;

    /// Get the current battery information.
    fn info(&self) -> &BatteryInfo;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NO_BATTERY_PERCENT;

    fn laptop_info() -> BatteryInfo {
        BatteryInfo {
            present: true,
            charge_percent: 87.4,
            state: ChargeState::Charging,
            max_capacity_wh: 52.6,
            design_capacity_wh: 58.0,
            health_percent: 90.7,
            cycle_count: Some(245),
            external_connected: true,
        }
    }

    #[test]
    fn test_raw_sample_from_info() {
        let sample = laptop_info().raw_sample();
        assert_eq!(sample.percent, 87.4);
        assert_eq!(sample.state, "charging");
    }

    #[test]
    fn test_raw_sample_without_battery() {
        let sample = BatteryInfo::default().raw_sample();
        assert_eq!(sample.percent, NO_BATTERY_PERCENT);
        assert_eq!(sample.state, "no battery");
    }

    #[test]
    fn test_hardware_health() {
        let health = laptop_info().hardware_health();
        assert_eq!(health.condition, "Normal");
        assert_eq!(health.cycle_count, 245);
        assert_eq!(health.design_capacity_wh, 58.0);
        assert_eq!(health.current_capacity_wh, 52.6);

        assert_eq!(BatteryInfo::default().hardware_health(), HardwareHealth::unknown());
    }

    #[test]
    fn test_condition_label() {
        assert_eq!(condition_label(0.0), "Unknown");
        assert_eq!(condition_label(79.9), "Service Recommended");
        assert_eq!(condition_label(80.0), "Normal");
        assert_eq!(condition_label(100.0), "Normal");
    }
}
