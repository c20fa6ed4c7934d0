use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chargewatch_protocol::{
    BatteryReading, MonitorRequest, MonitorResponse, MonitorStatus, MAX_SUBSCRIBERS,
    MIN_SUPPORTED_VERSION, PROTOCOL_VERSION,
};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{runtime_dir, LogLevel, UserConfig};
use crate::daemon::shutdown::ShutdownGuard;
use crate::daemon::{is_monitor_running, socket_path};
use crate::logging::{self, LogMode};
use crate::monitor::sinks::{
    BroadcastDisplay, DesktopNotifier, DisplaySink, FanoutDisplay, LogDisplay, LogNotifier,
    NotifierSink,
};
use crate::monitor::source::{BatterySource, HardwareInventory, PlatformSource};
use crate::monitor::{ConfigSettings, PollTimer, Scheduler, TickKind};

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Monitor already running")]
    AlreadyRunning,

    #[error("Failed to daemonize: {0}")]
    Daemonize(String),
}

pub type Result<T> = std::result::Result<T, DaemonError>;

const UPDATE_CHANNEL_CAPACITY: usize = 16;
const CLIENT_FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

type ClientId = u64;

enum ClientMessage {
    Request { request: MonitorRequest },
    Disconnect,
}

struct ClientHandle {
    response_tx: mpsc::Sender<MonitorResponse>,
    writer: JoinHandle<()>,
    forwarder: Option<JoinHandle<()>>,
}

impl ClientHandle {
    fn is_subscriber(&self) -> bool {
        self.forwarder.is_some()
    }

    fn stop_forwarding(&mut self) -> bool {
        match self.forwarder.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

/// How the monitor process is started.
#[derive(Debug, Clone, Copy)]
pub struct MonitorOptions {
    /// Stay attached to the terminal instead of daemonizing.
    pub foreground: bool,
    /// Show desktop notifications (otherwise they are only logged).
    pub notify: bool,
    pub log_level_override: Option<LogLevel>,
}

/// Removes the socket file when dropped.
struct SocketFile(PathBuf);

impl Drop for SocketFile {
    fn drop(&mut self) {
        if fs::remove_file(&self.0).is_ok() {
            debug!(socket = ?self.0, "Removed socket");
        }
    }
}

/// Request-facing state of a running monitor.
struct MonitorState<S> {
    scheduler: Scheduler<S>,
    start_time: Instant,
    notifications_enabled: bool,
}

impl<S: BatterySource + HardwareInventory> MonitorState<S> {
    fn new(scheduler: Scheduler<S>, notifications_enabled: bool) -> Self {
        Self {
            scheduler,
            start_time: Instant::now(),
            notifications_enabled,
        }
    }

    fn status(&self, subscriber_count: usize) -> MonitorStatus {
        MonitorStatus {
            running: true,
            uptime_secs: self.start_time.elapsed().as_secs(),
            tick_count: self.scheduler.tick_count(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            subscriber_count,
            notifications_enabled: self.notifications_enabled,
            thresholds: self.scheduler.thresholds(),
            protocol_version: PROTOCOL_VERSION,
            min_supported_version: MIN_SUPPORTED_VERSION,
        }
    }

    /// Answers every request that does not touch connection state.
    async fn handle_request(
        &mut self,
        request: &MonitorRequest,
        subscriber_count: usize,
    ) -> MonitorResponse {
        match request {
            MonitorRequest::GetStatus => MonitorResponse::Status(self.status(subscriber_count)),
            MonitorRequest::GetReading => {
                MonitorResponse::Reading(self.scheduler.current_reading().await)
            }
            MonitorRequest::GetAnalytics => {
                MonitorResponse::Analytics(self.scheduler.analytics(Utc::now()))
            }
            MonitorRequest::GetThresholds => {
                MonitorResponse::Thresholds(self.scheduler.thresholds())
            }
            MonitorRequest::SetThresholds(thresholds) => {
                match self.scheduler.set_thresholds(*thresholds) {
                    Ok(()) => MonitorResponse::Thresholds(self.scheduler.thresholds()),
                    Err(e) => {
                        error!(error = %e, "Failed to save thresholds");
                        MonitorResponse::Error(e.to_string())
                    }
                }
            }
            MonitorRequest::Shutdown => MonitorResponse::Ok,
            MonitorRequest::Subscribe | MonitorRequest::Unsubscribe => {
                MonitorResponse::Error("Handled separately".to_string())
            }
        }
    }
}

async fn client_reader_task(
    mut reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    msg_tx: mpsc::Sender<(ClientId, ClientMessage)>,
    client_id: ClientId,
) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                let _ = msg_tx.send((client_id, ClientMessage::Disconnect)).await;
                break;
            }
            Ok(_) => match MonitorRequest::from_json(line.trim()) {
                Ok(request) => {
                    if msg_tx
                        .send((client_id, ClientMessage::Request { request }))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    warn!(client_id, error = %e, "Invalid request from client");
                }
            },
            Err(e) => {
                debug!(client_id, error = %e, "Client read error");
                let _ = msg_tx.send((client_id, ClientMessage::Disconnect)).await;
                break;
            }
        }
    }
}

async fn client_writer_task(
    mut writer: tokio::net::unix::OwnedWriteHalf,
    mut response_rx: mpsc::Receiver<MonitorResponse>,
) {
    while let Some(response) = response_rx.recv().await {
        let json = match response.to_json() {
            Ok(j) => j,
            Err(_) => continue,
        };
        if writer
            .write_all(format!("{}\n", json).as_bytes())
            .await
            .is_err()
        {
            break;
        }
    }
}

/// Relays display updates to one subscriber until either side goes away.
async fn subscriber_forward_task(
    client_id: ClientId,
    mut updates: broadcast::Receiver<BatteryReading>,
    response_tx: mpsc::Sender<MonitorResponse>,
) {
    loop {
        match updates.recv().await {
            Ok(reading) => {
                if response_tx
                    .send(MonitorResponse::BatteryUpdate(reading))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(client_id, skipped, "Subscriber lagging, skipped updates");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

pub fn run_daemon(options: MonitorOptions, config: UserConfig) -> Result<()> {
    let socket = socket_path();

    if socket.exists() {
        if is_monitor_running() {
            return Err(DaemonError::AlreadyRunning);
        }
        fs::remove_file(&socket)?;
    }

    fs::create_dir_all(runtime_dir())?;

    if !options.foreground {
        daemonize::Daemonize::new()
            .working_directory(runtime_dir())
            .start()
            .map_err(|e| DaemonError::Daemonize(e.to_string()))?;
        let guard = logging::init(config.log_level, LogMode::File, options.log_level_override);
        std::mem::forget(guard);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Monitor starting");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run_daemon_async(socket, options, config))
}

async fn run_daemon_async(
    socket: PathBuf,
    options: MonitorOptions,
    config: UserConfig,
) -> Result<()> {
    let shutdown = ShutdownGuard::new();
    shutdown.spawn_signal_listener();
    let token = shutdown.token();

    let (update_tx, _) = broadcast::channel::<BatteryReading>(UPDATE_CHANNEL_CAPACITY);
    let displays: Vec<Box<dyn DisplaySink>> = vec![
        Box::new(LogDisplay),
        Box::new(BroadcastDisplay::new(update_tx.clone())),
    ];
    let display: Box<dyn DisplaySink> = Box::new(FanoutDisplay::new(displays));
    let notifications_enabled = options.notify && config.notifications_enabled;
    let notifier: Box<dyn NotifierSink> = if notifications_enabled {
        Box::new(DesktopNotifier::new())
    } else {
        Box::new(LogNotifier)
    };

    let scheduler = Scheduler::new(
        PlatformSource::new(),
        Box::new(ConfigSettings::new(&config)),
        display,
        notifier,
        token.clone(),
    );
    let state = MonitorState::new(scheduler, notifications_enabled);

    let timer = PollTimer::new(
        Duration::from_millis(config.poll_interval_ms.max(1)),
        Duration::from_millis(config.initial_delay_ms),
        token,
    );

    let listener = UnixListener::bind(&socket)?;
    let _socket_file = SocketFile(socket.clone());
    info!(
        socket = ?socket,
        poll_interval_ms = config.poll_interval_ms,
        notifications = notifications_enabled,
        "Listening for connections"
    );

    serve(listener, state, timer, update_tx).await;
    Ok(())
}

/// Runs the event loop until the token is cancelled, then tears the
/// scheduler down and flushes pending replies.
async fn serve<S: BatterySource + HardwareInventory>(
    listener: UnixListener,
    mut state: MonitorState<S>,
    mut timer: PollTimer,
    update_tx: broadcast::Sender<BatteryReading>,
) -> MonitorState<S> {
    let token = state.scheduler.token();
    let (msg_tx, mut msg_rx) = mpsc::channel::<(ClientId, ClientMessage)>(64);
    let mut clients: HashMap<ClientId, ClientHandle> = HashMap::new();
    let mut next_client_id: ClientId = 1;

    loop {
        tokio::select! {
            tick = timer.next() => {
                match tick {
                    None => break,
                    Some(TickKind::Initial) => {
                        state.scheduler.prime().await;
                    }
                    Some(TickKind::Periodic) => {
                        if state.scheduler.tick_with_grace(Utc::now()).await.is_none() {
                            break;
                        }
                    }
                }
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        let client_id = next_client_id;
                        next_client_id += 1;
                        debug!(client_id, "Client connected");

                        let (reader, writer) = stream.into_split();
                        let (response_tx, response_rx) = mpsc::channel::<MonitorResponse>(32);

                        let writer = tokio::task::spawn_local(client_writer_task(writer, response_rx));
                        tokio::task::spawn_local(client_reader_task(
                            BufReader::new(reader),
                            msg_tx.clone(),
                            client_id,
                        ));

                        clients.insert(client_id, ClientHandle {
                            response_tx,
                            writer,
                            forwarder: None,
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Socket accept error");
                    }
                }
            }
            Some((client_id, msg)) = msg_rx.recv() => {
                match msg {
                    ClientMessage::Disconnect => {
                        if let Some(mut client) = clients.remove(&client_id) {
                            client.stop_forwarding();
                            debug!(client_id, count = clients.len(), "Client disconnected");
                        }
                    }
                    ClientMessage::Request { request } => {
                        debug!(client_id, request = ?request, "Handling request");
                        let subscriber_count = clients.values().filter(|c| c.is_subscriber()).count();

                        let response = match &request {
                            MonitorRequest::Subscribe => {
                                subscribe(&mut clients, client_id, subscriber_count, &update_tx)
                            }
                            MonitorRequest::Unsubscribe => {
                                if let Some(client) = clients.get_mut(&client_id) {
                                    if client.stop_forwarding() {
                                        info!(client_id, count = subscriber_count - 1, "Subscriber removed");
                                    }
                                }
                                MonitorResponse::Unsubscribed
                            }
                            MonitorRequest::Shutdown => {
                                info!("Shutdown requested by client");
                                token.cancel();
                                MonitorResponse::Ok
                            }
                            _ => state.handle_request(&request, subscriber_count).await,
                        };

                        if let Some(client) = clients.get(&client_id) {
                            let _ = client.response_tx.send(response).await;
                        }
                    }
                }
            }
        }
    }

    info!(ticks = state.scheduler.tick_count(), "Monitor shutting down");
    state.scheduler.teardown();
    flush_clients(clients).await;

    state
}

fn subscribe(
    clients: &mut HashMap<ClientId, ClientHandle>,
    client_id: ClientId,
    subscriber_count: usize,
    update_tx: &broadcast::Sender<BatteryReading>,
) -> MonitorResponse {
    let Some(client) = clients.get_mut(&client_id) else {
        return MonitorResponse::Error("Client not found".to_string());
    };

    if client.is_subscriber() {
        return MonitorResponse::Subscribed;
    }

    if subscriber_count >= MAX_SUBSCRIBERS {
        return MonitorResponse::SubscriptionRejected {
            reason: format!("Maximum subscribers ({}) reached", MAX_SUBSCRIBERS),
        };
    }

    client.forwarder = Some(tokio::task::spawn_local(subscriber_forward_task(
        client_id,
        update_tx.subscribe(),
        client.response_tx.clone(),
    )));
    info!(client_id, count = subscriber_count + 1, "Subscriber added");
    MonitorResponse::Subscribed
}

/// Lets queued responses (such as the reply to `Shutdown`) reach their clients.
async fn flush_clients(clients: HashMap<ClientId, ClientHandle>) {
    let writers: Vec<JoinHandle<()>> = clients
        .into_values()
        .map(|mut client| {
            client.stop_forwarding();
            client.writer
        })
        .collect();

    if tokio::time::timeout(CLIENT_FLUSH_TIMEOUT, futures::future::join_all(writers))
        .await
        .is_err()
    {
        debug!("Timed out flushing client responses");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::normalizer::Normalizer;
    use crate::monitor::settings::MemorySettings;
    use async_trait::async_trait;
    use chargewatch_platform::{HardwareHealth, RawSample};
    use chargewatch_protocol::{RawState, Thresholds};
    use color_eyre::eyre::Result;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio_util::sync::CancellationToken;

    struct FixedSource(RawSample);

    #[async_trait(?Send)]
    impl BatterySource for FixedSource {
        async fn query(&mut self) -> Result<RawSample> {
            Ok(self.0.clone())
        }
    }

    impl HardwareInventory for FixedSource {
        fn inventory(&mut self) -> Result<HardwareHealth> {
            Ok(HardwareHealth {
                condition: "Normal".to_string(),
                cycle_count: 87,
                design_capacity_wh: 52.6,
                current_capacity_wh: 49.9,
            })
        }
    }

    fn state(sample: RawSample) -> MonitorState<FixedSource> {
        let scheduler = Scheduler::new(
            FixedSource(sample),
            Box::new(MemorySettings::default()),
            Box::new(LogDisplay),
            Box::new(LogNotifier),
            CancellationToken::new(),
        )
        .with_normalizer(Normalizer::with_rng(StdRng::seed_from_u64(1)));
        MonitorState::new(scheduler, false)
    }

    #[tokio::test]
    async fn test_status_reports_versions_and_thresholds() {
        let mut state = state(RawSample::new(50.0, "discharging"));
        state.scheduler.tick(Utc::now()).await;

        match state.handle_request(&MonitorRequest::GetStatus, 3).await {
            MonitorResponse::Status(status) => {
                assert!(status.running);
                assert_eq!(status.tick_count, 1);
                assert_eq!(status.subscriber_count, 3);
                assert_eq!(status.protocol_version, PROTOCOL_VERSION);
                assert_eq!(status.min_supported_version, MIN_SUPPORTED_VERSION);
                assert_eq!(status.thresholds, Thresholds::default());
                assert!(!status.notifications_enabled);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_reading_does_not_tick() {
        let mut state = state(RawSample::new(77.6, "charging"));

        let response = state.handle_request(&MonitorRequest::GetReading, 0).await;

        assert_eq!(
            response,
            MonitorResponse::Reading(BatteryReading::new(78, RawState::Charging))
        );
        assert_eq!(state.scheduler.tick_count(), 0);
    }

    #[tokio::test]
    async fn test_set_then_get_thresholds() {
        let mut state = state(RawSample::new(50.0, "discharging"));
        let updated = Thresholds { low: 25, high: 90 };

        assert_eq!(
            state
                .handle_request(&MonitorRequest::SetThresholds(updated), 0)
                .await,
            MonitorResponse::Thresholds(updated)
        );
        assert_eq!(
            state.handle_request(&MonitorRequest::GetThresholds, 0).await,
            MonitorResponse::Thresholds(updated)
        );
    }

    #[tokio::test]
    async fn test_analytics_includes_inventory() {
        let mut state = state(RawSample::new(100.0, "charged"));
        state.scheduler.tick(Utc::now()).await;

        match state.handle_request(&MonitorRequest::GetAnalytics, 0).await {
            MonitorResponse::Analytics(analytics) => {
                assert_eq!(analytics.health, "Normal");
                assert_eq!(analytics.cycle_count, 87);
                assert!(analytics.last_full_charge.is_some());
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shutdown_request_replies_and_tears_down() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let path = std::env::temp_dir().join(format!(
                    "chargewatch-serve-{}.sock",
                    std::process::id()
                ));
                let _ = fs::remove_file(&path);
                let listener = UnixListener::bind(&path).unwrap();
                let _socket = SocketFile(path.clone());

                let state = state(RawSample::new(50.0, "discharging"));
                let token = state.scheduler.token();
                let timer = PollTimer::new(
                    Duration::from_secs(3600),
                    Duration::from_secs(3600),
                    token.clone(),
                );
                let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
                let server = tokio::task::spawn_local(serve(listener, state, timer, update_tx));

                let stream = tokio::net::UnixStream::connect(&path).await.unwrap();
                let (reader, mut writer) = stream.into_split();
                let request = MonitorRequest::Shutdown.to_json().unwrap();
                writer
                    .write_all(format!("{}\n", request).as_bytes())
                    .await
                    .unwrap();

                let mut line = String::new();
                BufReader::new(reader).read_line(&mut line).await.unwrap();
                assert_eq!(
                    MonitorResponse::from_json(line.trim()).unwrap(),
                    MonitorResponse::Ok
                );

                let mut state = server.await.unwrap();
                assert!(token.is_cancelled());
                // already torn down by the loop
                assert!(!state.scheduler.teardown());
                assert_eq!(state.scheduler.tick_count(), 0);
            })
            .await;
    }

    #[test]
    fn test_socket_file_removed_on_drop() {
        let path = std::env::temp_dir()
            .join(format!("chargewatch-test-{}.sock", std::process::id()));
        fs::write(&path, b"").unwrap();
        drop(SocketFile(path.clone()));
        assert!(!path.exists());
        // second removal is a no-op
        drop(SocketFile(path.clone()));
    }
}
