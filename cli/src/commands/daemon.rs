use std::time::Duration;

use color_eyre::eyre::{eyre, Result};

use crate::config::{LogLevel, UserConfig};
use crate::daemon::{is_monitor_running, run_daemon, socket_path, MonitorClient, MonitorOptions};
use crate::logging::{self, LogMode};

/// Runs the monitor attached to the terminal.
pub fn run(
    config: UserConfig,
    no_notify: bool,
    log_level_override: Option<LogLevel>,
) -> Result<()> {
    if is_monitor_running() {
        println!("Monitor is already running.");
        return Ok(());
    }

    let _guard = logging::init(config.log_level, LogMode::Both, log_level_override);
    println!("Monitoring battery. Press Ctrl+C to stop.");

    let options = MonitorOptions {
        foreground: true,
        notify: !no_notify,
        log_level_override,
    };
    run_daemon(options, config).map_err(|e| eyre!("{}", e))
}

pub fn start(
    config: UserConfig,
    foreground: bool,
    no_notify: bool,
    log_level_override: Option<LogLevel>,
) -> Result<()> {
    if foreground {
        return run(config, no_notify, log_level_override);
    }

    if is_monitor_running() {
        println!("Monitor is already running.");
        return Ok(());
    }

    println!("Starting monitor...");
    let options = MonitorOptions {
        foreground: false,
        notify: !no_notify,
        log_level_override,
    };
    run_daemon(options, config).map_err(|e| eyre!("{}", e))?;
    std::thread::sleep(Duration::from_millis(500));

    let mut started = false;
    for _ in 0..3 {
        if is_monitor_running() {
            started = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(200));
    }

    if started {
        println!("Monitor started.");
        println!("Socket: {:?}", socket_path());
    } else {
        println!("Monitor may have failed to start. Check logs:");
        println!("  chargewatch logs");
    }

    Ok(())
}

pub fn stop() -> Result<()> {
    if !is_monitor_running() {
        println!("Monitor is not running.");
        return Ok(());
    }

    let mut client = MonitorClient::connect().map_err(|e| eyre!("{}", e))?;
    client.shutdown().map_err(|e| eyre!("{}", e))?;
    println!("Monitor stopped.");
    Ok(())
}
