//! Display and notifier sinks fed by the scheduler.
//!
//! Sinks are fire-and-forget: the scheduler logs a failed push and moves on.

use chargewatch_protocol::{BatteryReading, NotificationEvent};
use color_eyre::eyre::{eyre, Result};
use futures::future::{FutureExt, LocalBoxFuture};
use tokio::sync::broadcast;
use tracing::{debug, info};

pub const APP_NAME: &str = "chargewatch";

/// Receives the reading produced by every tick.
pub trait DisplaySink {
    fn show(&mut self, reading: &BatteryReading) -> Result<()>;
}

/// Receives each notification the engine decides to raise.
pub trait NotifierSink {
    fn notify(&mut self, event: &NotificationEvent) -> Result<()>;
}

/// Writes readings to the log.
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn show(&mut self, reading: &BatteryReading) -> Result<()> {
        if reading.no_battery {
            debug!("No battery detected");
        } else {
            debug!(
                level = reading.level,
                charging = reading.is_charging,
                state = %reading.raw_state,
                "Battery update"
            );
        }
        Ok(())
    }
}

/// Pushes readings to IPC subscribers.
pub struct BroadcastDisplay {
    tx: broadcast::Sender<BatteryReading>,
}

impl BroadcastDisplay {
    pub fn new(tx: broadcast::Sender<BatteryReading>) -> Self {
        Self { tx }
    }
}

impl DisplaySink for BroadcastDisplay {
    fn show(&mut self, reading: &BatteryReading) -> Result<()> {
        // an error only means nobody is subscribed right now
        let _ = self.tx.send(*reading);
        Ok(())
    }
}

/// Forwards every reading to several displays.
pub struct FanoutDisplay {
    sinks: Vec<Box<dyn DisplaySink>>,
}

impl FanoutDisplay {
    pub fn new(sinks: Vec<Box<dyn DisplaySink>>) -> Self {
        Self { sinks }
    }
}

impl DisplaySink for FanoutDisplay {
    fn show(&mut self, reading: &BatteryReading) -> Result<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.show(reading) {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Hands a built notification to the notification service.
type Delivery = Box<dyn Fn(notify_rust::Notification) -> LocalBoxFuture<'static, Result<()>>>;

/// Shows notifications through the desktop notification service.
///
/// Delivery runs on a local task, so `notify` never waits on the service.
/// When no notification service is reachable the event is dropped.
/// Must be used inside a `LocalSet`.
pub struct DesktopNotifier {
    app_name: String,
    deliver: Delivery,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::with_delivery(Box::new(|notification| deliver(notification).boxed_local()))
    }

    fn with_delivery(deliver: Delivery) -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            deliver,
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifierSink for DesktopNotifier {
    fn notify(&mut self, event: &NotificationEvent) -> Result<()> {
        let mut notification = notify_rust::Notification::new();
        notification
            .appname(&self.app_name)
            .summary(&event.title)
            .body(&event.body);

        #[cfg(all(unix, not(target_os = "macos")))]
        notification.urgency(desktop_urgency(event));

        let delivery = (self.deliver)(notification);
        let title = event.title.clone();
        tokio::task::spawn_local(async move {
            if let Err(e) = delivery.await {
                debug!(error = %e, title = %title, "Notification service unavailable");
            }
        });
        Ok(())
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
async fn deliver(notification: notify_rust::Notification) -> Result<()> {
    notification
        .show_async()
        .await
        .map(|_| ())
        .map_err(|e| eyre!("{}", e))
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
async fn deliver(notification: notify_rust::Notification) -> Result<()> {
    tokio::task::spawn_blocking(move || notification.show().map(|_| ()).map_err(|e| e.to_string()))
        .await?
        .map_err(|e| eyre!(e))
}

#[cfg(all(unix, not(target_os = "macos")))]
fn desktop_urgency(event: &NotificationEvent) -> notify_rust::Urgency {
    use chargewatch_protocol::{NotificationKind, Urgency};

    match event.kind {
        NotificationKind::LowBattery(Urgency::Critical) => notify_rust::Urgency::Critical,
        NotificationKind::LowBattery(_) => notify_rust::Urgency::Normal,
        NotificationKind::HighBattery | NotificationKind::FullBattery => {
            notify_rust::Urgency::Low
        }
    }
}

/// Logs notifications instead of showing them (`--no-notify`).
pub struct LogNotifier;

impl NotifierSink for LogNotifier {
    fn notify(&mut self, event: &NotificationEvent) -> Result<()> {
        info!(title = %event.title, body = %event.body, "Notification");
        Ok(())
    }
}
