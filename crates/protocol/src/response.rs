use serde::{Deserialize, Serialize};

use crate::types::{BatteryAnalytics, BatteryReading, MonitorStatus, Thresholds};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitorResponse {
    Status(MonitorStatus),
    Reading(BatteryReading),
    Analytics(BatteryAnalytics),
    Thresholds(Thresholds),
    Ok,
    Error(String),
    Subscribed,
    Unsubscribed,
    SubscriptionRejected { reason: String },
    BatteryUpdate(BatteryReading),
}

impl MonitorResponse {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
