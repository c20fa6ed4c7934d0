mod request;
mod response;
mod types;
mod version;

pub use request::MonitorRequest;
pub use response::MonitorResponse;
pub use types::{
    BatteryAnalytics, BatteryReading, MonitorStatus, NotificationEvent, NotificationKind,
    RawState, Thresholds, Urgency, MAX_SUBSCRIBERS,
};
pub use version::{MIN_SUPPORTED_VERSION, PROTOCOL_VERSION};
