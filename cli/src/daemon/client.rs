use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use chargewatch_protocol::{
    BatteryAnalytics, BatteryReading, MonitorRequest, MonitorResponse, MonitorStatus, Thresholds,
    MIN_SUPPORTED_VERSION, PROTOCOL_VERSION,
};

use crate::daemon::socket_path;

#[derive(Debug, Clone)]
pub struct VersionMismatchError {
    pub client_protocol_version: u32,
    pub client_min_supported: u32,
    pub monitor_protocol_version: u32,
    pub monitor_min_supported: u32,
    pub monitor_binary_version: String,
    pub kind: VersionMismatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionMismatchKind {
    ClientTooOld,
    MonitorTooOld,
}

impl std::fmt::Display for VersionMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            VersionMismatchKind::ClientTooOld => {
                write!(
                    f,
                    "Protocol version mismatch: this client uses protocol v{}, but the monitor (v{}) requires v{}+.\n\n\
                    Please update chargewatch:\n  \
                    cargo install chargewatch",
                    self.client_protocol_version,
                    self.monitor_binary_version,
                    self.monitor_min_supported
                )
            }
            VersionMismatchKind::MonitorTooOld => {
                write!(
                    f,
                    "Protocol version mismatch: monitor (v{}) uses protocol v{}, but this client requires v{}+.\n\n\
                    Please restart the monitor:\n  \
                    chargewatch stop && chargewatch start",
                    self.monitor_binary_version,
                    self.monitor_protocol_version,
                    self.client_min_supported
                )
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Monitor error: {0}")]
    Monitor(String),

    #[error("Subscription rejected: {0}")]
    SubscriptionRejected(String),

    #[error("{0}")]
    VersionMismatch(VersionMismatchError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Checks that this client and the running monitor speak compatible protocols.
pub fn check_version_compatibility(status: &MonitorStatus) -> Result<()> {
    // can the monitor understand our requests?
    if PROTOCOL_VERSION < status.min_supported_version {
        return Err(ClientError::VersionMismatch(VersionMismatchError {
            client_protocol_version: PROTOCOL_VERSION,
            client_min_supported: MIN_SUPPORTED_VERSION,
            monitor_protocol_version: status.protocol_version,
            monitor_min_supported: status.min_supported_version,
            monitor_binary_version: status.version.clone(),
            kind: VersionMismatchKind::ClientTooOld,
        }));
    }

    // can we understand its responses?
    if status.protocol_version < MIN_SUPPORTED_VERSION {
        return Err(ClientError::VersionMismatch(VersionMismatchError {
            client_protocol_version: PROTOCOL_VERSION,
            client_min_supported: MIN_SUPPORTED_VERSION,
            monitor_protocol_version: status.protocol_version,
            monitor_min_supported: status.min_supported_version,
            monitor_binary_version: status.version.clone(),
            kind: VersionMismatchKind::MonitorTooOld,
        }));
    }

    Ok(())
}

/// Blocking IPC client for the running monitor.
pub struct MonitorClient {
    stream: UnixStream,
    read_buffer: Vec<u8>,
}

impl MonitorClient {
    pub fn connect() -> Result<Self> {
        let path = socket_path();
        let stream = UnixStream::connect(&path)?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        stream.set_write_timeout(Some(Duration::from_secs(5)))?;
        Ok(Self {
            stream,
            read_buffer: Vec::with_capacity(4 * 1024),
        })
    }

    /// Connects and validates protocol compatibility.
    pub fn connect_with_version_check() -> Result<Self> {
        let mut client = Self::connect()?;
        let status = client.get_status()?;
        check_version_compatibility(&status)?;
        Ok(client)
    }

    fn read_line(&mut self) -> Result<String> {
        let mut temp_buf = [0u8; 4096];
        loop {
            if let Some(pos) = self.read_buffer.iter().position(|&b| b == b'\n') {
                let line_bytes: Vec<u8> = self.read_buffer.drain(..=pos).collect();
                return Ok(String::from_utf8_lossy(&line_bytes).to_string());
            }
            let n = self.stream.read(&mut temp_buf)?;
            if n == 0 {
                return Err(ClientError::Protocol("Connection closed".into()));
            }
            self.read_buffer.extend_from_slice(&temp_buf[..n]);
        }
    }

    fn read_response(&mut self) -> Result<MonitorResponse> {
        let line = self.read_line()?;
        MonitorResponse::from_json(line.trim()).map_err(|e| ClientError::Protocol(e.to_string()))
    }

    fn send_request(&mut self, request: MonitorRequest) -> Result<MonitorResponse> {
        let json = request
            .to_json()
            .map_err(|e| ClientError::Protocol(e.to_string()))?;

        writeln!(self.stream, "{}", json)?;
        self.stream.flush()?;

        // updates already in flight for a subscriber are not replies
        loop {
            match self.read_response()? {
                MonitorResponse::BatteryUpdate(_) => continue,
                response => return Ok(response),
            }
        }
    }

    pub fn get_status(&mut self) -> Result<MonitorStatus> {
        match self.send_request(MonitorRequest::GetStatus)? {
            MonitorResponse::Status(status) => Ok(status),
            MonitorResponse::Error(e) => Err(ClientError::Monitor(e)),
            _ => Err(ClientError::Protocol("Unexpected response".into())),
        }
    }

    pub fn get_reading(&mut self) -> Result<BatteryReading> {
        match self.send_request(MonitorRequest::GetReading)? {
            MonitorResponse::Reading(reading) => Ok(reading),
            MonitorResponse::Error(e) => Err(ClientError::Monitor(e)),
            _ => Err(ClientError::Protocol("Unexpected response".into())),
        }
    }

    pub fn get_analytics(&mut self) -> Result<BatteryAnalytics> {
        match self.send_request(MonitorRequest::GetAnalytics)? {
            MonitorResponse::Analytics(analytics) => Ok(analytics),
            MonitorResponse::Error(e) => Err(ClientError::Monitor(e)),
            _ => Err(ClientError::Protocol("Unexpected response".into())),
        }
    }

    pub fn get_thresholds(&mut self) -> Result<Thresholds> {
        match self.send_request(MonitorRequest::GetThresholds)? {
            MonitorResponse::Thresholds(thresholds) => Ok(thresholds),
            MonitorResponse::Error(e) => Err(ClientError::Monitor(e)),
            _ => Err(ClientError::Protocol("Unexpected response".into())),
        }
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<Thresholds> {
        match self.send_request(MonitorRequest::SetThresholds(thresholds))? {
            MonitorResponse::Thresholds(thresholds) => Ok(thresholds),
            MonitorResponse::Error(e) => Err(ClientError::Monitor(e)),
            _ => Err(ClientError::Protocol("Unexpected response".into())),
        }
    }

    pub fn shutdown(&mut self) -> Result<()> {
        match self.send_request(MonitorRequest::Shutdown)? {
            MonitorResponse::Ok => Ok(()),
            MonitorResponse::Error(e) => Err(ClientError::Monitor(e)),
            _ => Err(ClientError::Protocol("Unexpected response".into())),
        }
    }

    pub fn subscribe(&mut self) -> Result<()> {
        match self.send_request(MonitorRequest::Subscribe)? {
            MonitorResponse::Subscribed => Ok(()),
            MonitorResponse::SubscriptionRejected { reason } => {
                Err(ClientError::SubscriptionRejected(reason))
            }
            MonitorResponse::Error(e) => Err(ClientError::Monitor(e)),
            _ => Err(ClientError::Protocol("Unexpected response".into())),
        }
    }

    pub fn unsubscribe(&mut self) -> Result<()> {
        match self.send_request(MonitorRequest::Unsubscribe)? {
            MonitorResponse::Unsubscribed => Ok(()),
            MonitorResponse::Error(e) => Err(ClientError::Monitor(e)),
            _ => Err(ClientError::Protocol("Unexpected response".into())),
        }
    }

    /// Blocks until the monitor pushes the next reading to this subscriber.
    pub fn next_update(&mut self) -> Result<BatteryReading> {
        self.stream.set_read_timeout(None)?;
        loop {
            match self.read_response()? {
                MonitorResponse::BatteryUpdate(reading) => return Ok(reading),
                MonitorResponse::Error(e) => return Err(ClientError::Monitor(e)),
                other => tracing::debug!(response = ?other, "Ignoring non-update message"),
            }
        }
    }
}
