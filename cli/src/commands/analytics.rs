use chargewatch_protocol::BatteryAnalytics;
use color_eyre::eyre::{eyre, Result};

use crate::daemon::{is_monitor_running, MonitorClient};

pub fn run(json: bool) -> Result<()> {
    if !is_monitor_running() {
        println!("Monitor is not running. Start it with:");
        println!("  chargewatch start");
        return Ok(());
    }

    let mut client = MonitorClient::connect_with_version_check().map_err(|e| eyre!("{}", e))?;
    let analytics = client.get_analytics().map_err(|e| eyre!("{}", e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analytics)?);
    } else {
        print!("{}", format_analytics(&analytics));
    }

    Ok(())
}

fn format_analytics(analytics: &BatteryAnalytics) -> String {
    let mut out = String::new();
    out.push_str("Battery Analytics\n");
    out.push_str(&format!("{}\n", "-".repeat(40)));
    out.push_str(&format!("Health:           {}\n", analytics.health));
    out.push_str(&format!("Cycle count:      {}\n", analytics.cycle_count));
    out.push_str(&format!(
        "Capacity:         {:.1} / {:.1} Wh\n",
        analytics.current_capacity_wh, analytics.design_capacity_wh
    ));
    out.push_str(&format!(
        "Charging for:     {} min\n",
        analytics.total_charge_minutes
    ));
    out.push_str(&format!(
        "At 100% for:      {} min\n",
        analytics.time_at_100_minutes
    ));
    out.push_str(&format!(
        "Overcharge:       {} min\n",
        analytics.total_overcharge_minutes
    ));
    out.push_str(&format!(
        "Last full charge: {}\n",
        analytics.last_full_charge_label()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_analytics_defaults() {
        let text = format_analytics(&BatteryAnalytics::default());
        assert!(text.contains("Health:           Unknown"));
        assert!(text.contains("Capacity:         0.0 / 0.0 Wh"));
        assert!(text.contains("Last full charge: -"));
    }
}
