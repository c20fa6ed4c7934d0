use chargewatch_protocol::{BatteryReading, MonitorStatus};
use color_eyre::eyre::{eyre, Result};

use crate::daemon::{is_monitor_running, MonitorClient};
use crate::monitor::normalizer::Normalizer;
use crate::monitor::source::{BatterySource, PlatformSource};

pub fn run(json: bool) -> Result<()> {
    let (reading, status) = if is_monitor_running() {
        let mut client = MonitorClient::connect_with_version_check().map_err(|e| eyre!("{}", e))?;
        let status = client.get_status().map_err(|e| eyre!("{}", e))?;
        let reading = client.get_reading().map_err(|e| eyre!("{}", e))?;
        (reading, Some(status))
    } else {
        (local_reading()?, None)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&reading)?);
        return Ok(());
    }

    println!("{}", format_reading(&reading));
    match status {
        Some(status) => print_status(&status),
        None => println!("Monitor:   not running"),
    }

    Ok(())
}

/// One-shot read straight from the OS when no monitor is running.
fn local_reading() -> Result<BatteryReading> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let mut source = PlatformSource::new();
    let sample = runtime.block_on(source.query());
    Ok(Normalizer::new().reading(sample))
}

fn print_status(status: &MonitorStatus) {
    println!(
        "Monitor:   running (v{}, up {}s, {} ticks)",
        status.version, status.uptime_secs, status.tick_count
    );
    println!(
        "Alerts:    low <= {}%, high >= {}%{}",
        status.thresholds.low,
        status.thresholds.high,
        if status.notifications_enabled {
            ""
        } else {
            " (logged only)"
        }
    );
}

pub fn format_reading(reading: &BatteryReading) -> String {
    if reading.no_battery {
        return "Battery:   none detected".to_string();
    }
    format!("Battery:   {}% ({})", reading.level, reading.raw_state)
}
