use chargewatch_protocol::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn sample_reading() -> BatteryReading {
    BatteryReading::new(87, RawState::Charging)
}

fn sample_analytics() -> BatteryAnalytics {
    BatteryAnalytics {
        health: "Normal".to_string(),
        cycle_count: 245,
        design_capacity_wh: 58.0,
        current_capacity_wh: 52.5,
        time_at_100_minutes: 12,
        total_charge_minutes: 95,
        total_overcharge_minutes: 30,
        last_full_charge: Some(1704067200),
    }
}

fn sample_status() -> MonitorStatus {
    MonitorStatus {
        running: true,
        uptime_secs: 3600,
        tick_count: 720,
        version: "0.3.0".to_string(),
        subscriber_count: 1,
        notifications_enabled: true,
        thresholds: Thresholds { low: 15, high: 90 },
        protocol_version: PROTOCOL_VERSION,
        min_supported_version: MIN_SUPPORTED_VERSION,
    }
}

fn to_value(response: &MonitorResponse) -> Value {
    serde_json::from_str(&response.to_json().unwrap()).unwrap()
}

#[test]
fn reading_wire_shape() {
    let value = to_value(&MonitorResponse::Reading(sample_reading()));
    assert_eq!(
        value,
        json!({
            "Reading": {
                "level": 87,
                "is_charging": true,
                "no_battery": false,
                "raw_state": "charging"
            }
        })
    );
}

#[test]
fn set_thresholds_request_wire_shape() {
    let request = MonitorRequest::SetThresholds(Thresholds { low: 10, high: 95 });
    let json = request.to_json().unwrap();
    assert_eq!(json, r#"{"SetThresholds":{"low":10,"high":95}}"#);
    assert_eq!(MonitorRequest::from_json(&json).unwrap(), request);
}

#[test]
fn unit_requests_are_bare_strings() {
    assert_eq!(MonitorRequest::Shutdown.to_json().unwrap(), r#""Shutdown""#);
    assert_eq!(
        MonitorRequest::from_json(r#""GetAnalytics""#).unwrap(),
        MonitorRequest::GetAnalytics
    );
}

#[test]
fn analytics_survive_the_wire() {
    let response = MonitorResponse::Analytics(sample_analytics());
    let parsed = MonitorResponse::from_json(&response.to_json().unwrap()).unwrap();
    assert_eq!(parsed, response);
}

#[test]
fn analytics_without_last_full_charge_defaults_to_none() {
    let sparse = r#"{"Analytics":{"health":"Normal","cycle_count":3,"design_capacity_wh":50.0,
        "current_capacity_wh":49.0,"time_at_100_minutes":0,"total_charge_minutes":4,
        "total_overcharge_minutes":0}}"#;
    match MonitorResponse::from_json(sparse).unwrap() {
        MonitorResponse::Analytics(analytics) => {
            assert_eq!(analytics.last_full_charge, None);
            assert_eq!(analytics.total_charge_minutes, 4);
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[test]
fn status_without_thresholds_uses_defaults() {
    let sparse = r#"{"Status":{"running":true,"uptime_secs":5,"tick_count":1,"version":"0.2.0",
        "subscriber_count":0,"notifications_enabled":false,"protocol_version":1,
        "min_supported_version":1}}"#;
    match MonitorResponse::from_json(sparse).unwrap() {
        MonitorResponse::Status(status) => {
            assert_eq!(status.thresholds, Thresholds::default());
            assert_eq!(status.protocol_version, 1);
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[test]
fn first_protocol_version_supports_only_itself() {
    assert_eq!(PROTOCOL_VERSION, 1);
    assert_eq!(MIN_SUPPORTED_VERSION, PROTOCOL_VERSION);
}

#[test]
fn status_round_trip() {
    let response = MonitorResponse::Status(sample_status());
    let parsed = MonitorResponse::from_json(&response.to_json().unwrap()).unwrap();
    assert_eq!(parsed, response);
}

#[test]
fn notification_event_wire_shape() {
    let value = serde_json::to_value(NotificationEvent::low_battery(15)).unwrap();
    assert_eq!(
        value,
        json!({
            "kind": { "low_battery": "very_low" },
            "title": "Battery VERY LOW",
            "body": "Battery is at 15%. Please plug in your charger immediately!"
        })
    );
}

#[test]
fn partial_thresholds_fill_defaults() {
    let thresholds: Thresholds = serde_json::from_str(r#"{"low":5}"#).unwrap();
    assert_eq!(thresholds, Thresholds { low: 5, high: 80 });
}
