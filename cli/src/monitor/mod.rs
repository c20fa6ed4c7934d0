//! Battery monitor core: sampling, charge-cycle tracking and notifications.

pub mod analytics;
pub mod normalizer;
pub mod notifications;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod sinks;
pub mod source;
pub mod timer;

pub use scheduler::Scheduler;
pub use settings::ConfigSettings;
pub use timer::{PollTimer, TickKind};
