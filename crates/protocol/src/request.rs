use serde::{Deserialize, Serialize};

use crate::types::Thresholds;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitorRequest {
    GetStatus,
    GetReading,
    GetAnalytics,
    GetThresholds,
    SetThresholds(Thresholds),
    Subscribe,
    Unsubscribe,
    Shutdown,
}

impl MonitorRequest {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
