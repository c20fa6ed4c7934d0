mod client;
mod server;
mod shutdown;

pub use client::{ClientError, MonitorClient};
pub use server::{run_daemon, DaemonError, MonitorOptions};

use std::path::PathBuf;

use crate::config::runtime_dir;

const SOCKET_NAME: &str = "chargewatch.sock";

pub fn socket_path() -> PathBuf {
    runtime_dir().join(SOCKET_NAME)
}

pub fn is_monitor_running() -> bool {
    MonitorClient::connect().is_ok()
}
