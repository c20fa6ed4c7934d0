use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the monitor in the foreground (default)
    Run {
        /// Log notifications instead of showing them
        #[arg(long)]
        no_notify: bool,
    },

    /// Start the monitor in the background
    Start {
        #[arg(short, long)]
        foreground: bool,

        /// Log notifications instead of showing them
        #[arg(long)]
        no_notify: bool,
    },

    /// Stop the background monitor
    Stop,

    /// Show the current battery reading
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Show charging analytics from the running monitor
    Analytics {
        #[arg(long)]
        json: bool,
    },

    /// Print every reading the monitor pushes
    Watch {
        /// Stop after this many updates
        #[arg(short = 'c', long)]
        count: Option<usize>,
    },

    /// Show or change the notification thresholds
    Thresholds {
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
        low: Option<u8>,

        #[arg(short = 'H', long, value_parser = clap::value_parser!(u8).range(0..=100))]
        high: Option<u8>,
    },

    Config {
        #[arg(long)]
        path: bool,

        #[arg(long)]
        reset: bool,

        #[arg(short, long)]
        edit: bool,
    },

    Logs {
        #[arg(short = 'n', long, default_value_t = 50)]
        lines: usize,

        #[arg(short, long)]
        follow: bool,
    },
}

#[derive(Debug, Parser)]
#[command(name = "chargewatch", version, about = "Battery charge monitor and notifier")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(long, global = true)]
    pub log_level: Option<String>,
}
