//! MQTT transport adapter.
//!
//! Implements [`TransportPort`] (command inbox, connect, keep-alive) and
//! [`EventSink`] (telemetry, status line, remote log) over one broker
//! session on top of the [`WifiAdapter`].
//!
//! The MQTT client delivers messages on its own task. Payloads are decoded
//! there and pushed into a bounded [`CommandInbox`]; the control loop drains
//! one per pass. A full inbox drops the new command with a warning.
//!
//! Every call here returns within a bounded time: connect waits at most
//! [`LINK_WAIT_MS`] for the access point and [`SESSION_WAIT_MS`] for the
//! broker, which together stay below the watchdog timeout.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::{info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};

use crate::app::commands::{CommandText, command_text};
use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, LinkStatus, TransportPort};
use crate::config::SystemConfig;
use crate::error::CommsError;
use crate::telemetry::format_log_line;

use super::log_sink::LogEventSink;
use super::time::wall_clock_hms;
use super::wifi::WifiAdapter;

/// Commands buffered between the client task and the control loop.
pub const INBOX_DEPTH: usize = 4;

/// Upper bound on waiting for the station link inside `connect`.
pub const LINK_WAIT_MS: u32 = 3_000;
/// Upper bound on waiting for the broker CONNACK inside `connect`.
pub const SESSION_WAIT_MS: u32 = 3_000;

const POLL_SLICE_MS: u32 = 50;

pub type CommandInbox = Channel<CriticalSectionRawMutex, CommandText, INBOX_DEPTH>;

/// Inbox fed by the broker callback.
pub static COMMAND_INBOX: CommandInbox = Channel::new();

/// Decode `payload` and queue it. Returns `false` when the inbox was full.
pub fn deliver_command(inbox: &CommandInbox, payload: &[u8]) -> bool {
    match inbox.try_send(command_text(payload)) {
        Ok(()) => true,
        Err(TrySendError::Full(dropped)) => {
            warn!("MQTT: command inbox full, dropping '{}'", dropped);
            false
        }
    }
}

#[derive(Clone, Copy)]
enum Outbound {
    Telemetry,
    Status,
    Log,
}

/// Topic names resolved once from the configuration.
struct Topics {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    command: heapless::String<32>,
    telemetry: heapless::String<32>,
    status: heapless::String<32>,
    log: heapless::String<32>,
}

pub struct MqttTransport {
    wifi: WifiAdapter,
    inbox: &'static CommandInbox,
    topics: Topics,
    broker_url: heapless::String<64>,
    client_id: heapless::String<32>,
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    keepalive_secs: u16,
    console: LogEventSink,
    published: u32,
    /// Broker session state, written by the client task.
    session_up: Arc<AtomicBool>,
    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim_broker_reachable: bool,
}

impl MqttTransport {
    pub fn new(config: &SystemConfig, wifi: WifiAdapter) -> Self {
        Self::with_inbox(config, wifi, &COMMAND_INBOX)
    }

    pub fn with_inbox(config: &SystemConfig, wifi: WifiAdapter, inbox: &'static CommandInbox) -> Self {
        Self {
            wifi,
            inbox,
            topics: Topics {
                command: config.topic_command.clone(),
                telemetry: config.topic_telemetry.clone(),
                status: config.topic_status.clone(),
                log: config.topic_log.clone(),
            },
            broker_url: config.broker_url.clone(),
            client_id: config.client_id.clone(),
            keepalive_secs: config.mqtt_keepalive_secs,
            console: LogEventSink::new(),
            published: 0,
            session_up: Arc::new(AtomicBool::new(false)),
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(not(target_os = "espidf"))]
            sim_broker_reachable: true,
        }
    }

    pub fn wifi(&self) -> &WifiAdapter {
        &self.wifi
    }

    pub fn wifi_mut(&mut self) -> &mut WifiAdapter {
        &mut self.wifi
    }

    /// Messages handed to the client since boot.
    pub fn published(&self) -> u32 {
        self.published
    }

    fn ensure_link(&mut self) -> Result<(), CommsError> {
        if self.wifi.is_connected() {
            return Ok(());
        }
        self.wifi.begin_connect().map_err(|e| {
            warn!("MQTT: {}", e);
            CommsError::WifiConnectFailed
        })?;
        let mut waited = 0;
        while !self.wifi.is_connected() {
            if waited >= LINK_WAIT_MS {
                return Err(CommsError::WifiDisconnected);
            }
            delay_ms(POLL_SLICE_MS);
            waited += POLL_SLICE_MS;
        }
        Ok(())
    }

    fn publish(&mut self, to: Outbound, payload: &[u8]) {
        if !self.is_connected() {
            return;
        }
        let topic = match to {
            Outbound::Telemetry => self.topics.telemetry.clone(),
            Outbound::Status => self.topics.status.clone(),
            Outbound::Log => self.topics.log.clone(),
        };
        match self.platform_publish(&topic, payload) {
            Ok(()) => self.published = self.published.wrapping_add(1),
            Err(e) => warn!("MQTT: publish to {} failed: {}", topic, e),
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn open_session(&mut self) -> Result<(), CommsError> {
        // Drop any stale session before the new one registers its callback.
        self.client = None;
        self.session_up.store(false, Ordering::Release);

        let conf = MqttClientConfiguration {
            client_id: Some(self.client_id.as_str()),
            keep_alive_interval: Some(core::time::Duration::from_secs(u64::from(self.keepalive_secs))),
            ..Default::default()
        };
        let inbox = self.inbox;
        let session_up = Arc::clone(&self.session_up);
        let mut client = EspMqttClient::new_cb(self.broker_url.as_str(), &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => session_up.store(true, Ordering::Release),
            EventPayload::Disconnected => session_up.store(false, Ordering::Release),
            EventPayload::Received { data, .. } => {
                deliver_command(inbox, data);
            }
            EventPayload::Error(e) => warn!("MQTT: client error: {:?}", e),
            _ => {}
        })
        .map_err(|e| {
            warn!("MQTT: client init failed: {}", e);
            CommsError::MqttConnectFailed
        })?;

        let mut waited = 0;
        while !self.session_up.load(Ordering::Acquire) {
            if waited >= SESSION_WAIT_MS {
                return Err(CommsError::MqttConnectFailed);
            }
            delay_ms(POLL_SLICE_MS);
            waited += POLL_SLICE_MS;
        }

        client
            .subscribe(self.topics.command.as_str(), QoS::AtMostOnce)
            .map_err(|_| CommsError::MqttSubscribeFailed)?;
        self.client = Some(client);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn open_session(&mut self) -> Result<(), CommsError> {
        if !self.sim_broker_reachable {
            self.session_up.store(false, Ordering::Release);
            return Err(CommsError::MqttConnectFailed);
        }
        self.session_up.store(true, Ordering::Release);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::NotConnected)?;
        client
            .enqueue(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|_| CommsError::MqttPublishFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        log::debug!("MQTT(sim): {} <- {} bytes", topic, payload.len());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn close_session(&mut self) {
        self.client = None;
        self.session_up.store(false, Ordering::Release);
    }

    #[cfg(not(target_os = "espidf"))]
    fn close_session(&mut self) {
        self.session_up.store(false, Ordering::Release);
    }

    /// Whether the next simulated broker connect can succeed.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_broker_reachable(&mut self, reachable: bool) {
        self.sim_broker_reachable = reachable;
        if !reachable {
            self.session_up.store(false, Ordering::Release);
        }
    }
}

impl TransportPort for MqttTransport {
    fn connect(&mut self) -> Result<(), CommsError> {
        self.ensure_link()?;
        self.open_session()?;
        info!("MQTT: connected to {} as '{}'", self.broker_url, self.client_id);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_connected() && self.session_up.load(Ordering::Acquire)
    }

    fn poll_command(&mut self) -> Result<Option<CommandText>, CommsError> {
        if let Ok(text) = self.inbox.try_receive() {
            return Ok(Some(text));
        }
        if !self.is_connected() {
            return Err(CommsError::NotConnected);
        }
        Ok(None)
    }

    /// The client library sends PINGREQ on its own; this only checks the
    /// session is still up.
    fn ping(&mut self) -> Result<(), CommsError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(CommsError::NotConnected)
        }
    }

    fn shutdown(&mut self) {
        self.close_session();
        self.wifi.shutdown();
    }

    fn link_status(&self) -> LinkStatus {
        LinkStatus {
            connected: self.wifi.is_connected(),
            ip: self.wifi.ip(),
        }
    }
}

impl EventSink for MqttTransport {
    fn emit(&mut self, event: &AppEvent) {
        self.console.emit(event);
        match event {
            AppEvent::Telemetry(t) => {
                match t.to_json() {
                    Ok(json) => self.publish(Outbound::Telemetry, &json),
                    Err(e) => warn!("MQTT: telemetry encode failed: {}", e),
                }
                let line = t.status_line();
                self.publish(Outbound::Status, line.as_bytes());
            }
            AppEvent::Log(message) => {
                let line = format_log_line(wall_clock_hms(), message);
                self.publish(Outbound::Log, line.as_bytes());
            }
            AppEvent::CommandHandled { .. } => {}
        }
    }
}

#[cfg(target_os = "espidf")]
fn delay_ms(ms: u32) {
    esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
}

#[cfg(not(target_os = "espidf"))]
fn delay_ms(ms: u32) {
    std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
}
