pub mod analytics;
pub mod config;
pub mod daemon;
pub mod logs;
pub mod status;
pub mod thresholds;
pub mod watch;
