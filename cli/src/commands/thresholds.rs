use chargewatch_protocol::Thresholds;
use color_eyre::eyre::{eyre, Result};

use crate::config::UserConfig;
use crate::daemon::{is_monitor_running, MonitorClient};

pub fn run(low: Option<u8>, high: Option<u8>) -> Result<()> {
    let mut client = if is_monitor_running() {
        Some(MonitorClient::connect_with_version_check().map_err(|e| eyre!("{}", e))?)
    } else {
        None
    };

    let current = match client.as_mut() {
        Some(client) => client.get_thresholds().map_err(|e| eyre!("{}", e))?,
        None => UserConfig::load().thresholds,
    };

    let Some(updated) = apply(current, low, high) else {
        print_thresholds(&current);
        return Ok(());
    };

    if updated.low >= updated.high {
        eprintln!(
            "Warning: low threshold ({}%) is not below high threshold ({}%)",
            updated.low, updated.high
        );
    }

    let saved = match client.as_mut() {
        Some(client) => client.set_thresholds(updated).map_err(|e| eyre!("{}", e))?,
        None => {
            let mut config = UserConfig::load();
            config.thresholds = updated;
            config.save()?;
            updated
        }
    };

    println!("Thresholds updated.");
    print_thresholds(&saved);
    Ok(())
}

/// Merges the requested changes. `None` when nothing was requested.
fn apply(current: Thresholds, low: Option<u8>, high: Option<u8>) -> Option<Thresholds> {
    if low.is_none() && high.is_none() {
        return None;
    }
    Some(Thresholds {
        low: low.unwrap_or(current.low),
        high: high.unwrap_or(current.high),
    })
}

fn print_thresholds(thresholds: &Thresholds) {
    println!("Low battery:  {}%", thresholds.low);
    println!("High battery: {}%", thresholds.high);
}
