use chargewatch_platform::HardwareHealth;
use chargewatch_protocol::BatteryAnalytics;
use color_eyre::eyre::Result;
use tracing::warn;

use super::session::AnalyticsSnapshot;

/// Joins the session timers with the hardware inventory.
///
/// An inventory failure degrades to "Unknown" health with zeroed fields.
pub fn build_analytics(
    snapshot: &AnalyticsSnapshot,
    inventory: Result<HardwareHealth>,
) -> BatteryAnalytics {
    let hardware = inventory.unwrap_or_else(|e| {
        warn!(error = %e, "Battery inventory unavailable");
        HardwareHealth::unknown()
    });

    BatteryAnalytics {
        health: hardware.condition,
        cycle_count: hardware.cycle_count,
        design_capacity_wh: hardware.design_capacity_wh,
        current_capacity_wh: hardware.current_capacity_wh,
        time_at_100_minutes: snapshot.time_at_100_minutes,
        total_charge_minutes: snapshot.total_charge_minutes,
        total_overcharge_minutes: snapshot.total_overcharge_minutes,
        last_full_charge: snapshot.last_full_charge.map(|at| at.timestamp()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use color_eyre::eyre::eyre;

    #[test]
    fn test_inventory_failure_reports_unknown() {
        let snapshot = AnalyticsSnapshot {
            time_at_100_minutes: 3,
            total_charge_minutes: 40,
            total_overcharge_minutes: 7,
            last_full_charge: None,
        };

        let analytics = build_analytics(&snapshot, Err(eyre!("no ioreg")));
        assert_eq!(analytics.health, "Unknown");
        assert_eq!(analytics.cycle_count, 0);
        assert_eq!(analytics.design_capacity_wh, 0.0);
        assert_eq!(analytics.time_at_100_minutes, 3);
        assert_eq!(analytics.total_charge_minutes, 40);
        assert_eq!(analytics.total_overcharge_minutes, 7);
    }

    #[test]
    fn test_inventory_fields_copied() {
        let full_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let snapshot = AnalyticsSnapshot {
            last_full_charge: Some(full_at),
            ..Default::default()
        };
        let hardware = HardwareHealth {
            condition: "Normal".to_string(),
            cycle_count: 312,
            design_capacity_wh: 58.0,
            current_capacity_wh: 51.2,
        };

        let analytics = build_analytics(&snapshot, Ok(hardware));
        assert_eq!(analytics.health, "Normal");
        assert_eq!(analytics.cycle_count, 312);
        assert_eq!(analytics.current_capacity_wh, 51.2);
        assert_eq!(analytics.last_full_charge, Some(1_700_000_000));
    }
}
