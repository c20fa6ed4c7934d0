use chrono::Local;
use color_eyre::eyre::{eyre, Result};

use crate::commands::status::format_reading;
use crate::daemon::{is_monitor_running, MonitorClient};

pub fn run(count: Option<usize>) -> Result<()> {
    if !is_monitor_running() {
        println!("Monitor is not running. Start it with:");
        println!("  chargewatch start");
        return Ok(());
    }

    let mut client = MonitorClient::connect_with_version_check().map_err(|e| eyre!("{}", e))?;
    client.subscribe().map_err(|e| eyre!("{}", e))?;

    let mut received = 0;
    while count.map_or(true, |limit| received < limit) {
        let reading = client.next_update().map_err(|e| eyre!("{}", e))?;
        println!("[{}] {}", Local::now().format("%H:%M:%S"), format_reading(&reading));
        received += 1;
    }

    client.unsubscribe().map_err(|e| eyre!("{}", e))?;
    Ok(())
}
