mod cli;
mod commands;
mod config;
mod daemon;
mod logging;
mod monitor;

use clap::Parser;
use color_eyre::eyre::Result;

use cli::{Cli, Commands};
use config::{ensure_dirs, LogLevel, UserConfig};
use logging::LogMode;

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = ensure_dirs();

    let cli = Cli::parse();
    let config = UserConfig::load();
    let log_level_override = cli.log_level.as_deref().map(LogLevel::from_str);

    match cli.command {
        None => commands::daemon::run(config, false, log_level_override),
        Some(Commands::Run { no_notify }) => {
            commands::daemon::run(config, no_notify, log_level_override)
        }
        Some(Commands::Start {
            foreground,
            no_notify,
        }) => commands::daemon::start(config, foreground, no_notify, log_level_override),
        Some(Commands::Stop) => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            commands::daemon::stop()
        }
        Some(Commands::Status { json }) => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            commands::status::run(json)
        }
        Some(Commands::Analytics { json }) => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            commands::analytics::run(json)
        }
        Some(Commands::Watch { count }) => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            commands::watch::run(count)
        }
        Some(Commands::Thresholds { low, high }) => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            commands::thresholds::run(low, high)
        }
        Some(Commands::Config { path, reset, edit }) => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            commands::config::run(path, reset, edit)
        }
        Some(Commands::Logs { lines, follow }) => commands::logs::run(lines, follow),
    }
}
