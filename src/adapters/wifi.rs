//! WiFi station-mode adapter.
//!
//! Owns the station interface the MQTT transport rides on. Connecting is
//! non-blocking: [`WifiAdapter::begin_connect`] kicks the driver and the
//! caller polls [`WifiAdapter::is_connected`] while feeding the watchdog.
//! The driver's own auto-reconnect handles short drops.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: a simulated link that tests can raise and drop.

use core::fmt;
use log::{info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    Stopped,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::Stopped => write!(f, "radio stopped"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Idle,
    Connecting,
    /// Radio switched off on the way to a restart; never leaves this state.
    Stopped,
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    driver: Box<EspWifi<'static>>,
    /// Simulation: link comes up on the next `begin_connect`.
    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_reachable: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(driver: EspWifi<'static>) -> Self {
        Self {
            state: WifiState::Idle,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            driver: Box::new(driver),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Idle,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            sim_link_up: false,
            sim_reachable: true,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }

    /// Start association without waiting for it.
    pub fn begin_connect(&mut self) -> Result<(), ConnectivityError> {
        if self.state == WifiState::Stopped {
            return Err(ConnectivityError::Stopped);
        }
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        info!("WiFi: connecting to '{}'", self.ssid);
        self.platform_connect()?;
        self.state = WifiState::Connecting;
        Ok(())
    }

    /// Disconnect and power the radio down. Terminal.
    pub fn shutdown(&mut self) {
        self.platform_shutdown();
        self.state = WifiState::Stopped;
        info!("WiFi: radio off");
    }

    pub fn is_connected(&self) -> bool {
        self.state != WifiState::Stopped && self.platform_is_connected()
    }

    /// Station IPv4 address, `0.0.0.0` while down.
    pub fn ip(&self) -> heapless::String<16> {
        let mut out = heapless::String::new();
        if !self.is_connected() || self.platform_write_ip(&mut out).is_err() {
            out.clear();
            let _ = out.push_str("0.0.0.0");
        }
        out
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        if !self.driver.is_started().unwrap_or(false) {
            let auth_method = if self.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            };
            let config = Configuration::Client(ClientConfiguration {
                ssid: self.ssid.as_str().try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
                password: self
                    .password
                    .as_str()
                    .try_into()
                    .map_err(|_| ConnectivityError::InvalidPassword)?,
                auth_method,
                ..Default::default()
            });
            self.driver.set_configuration(&config).map_err(|e| {
                warn!("WiFi: set_configuration failed: {}", e);
                ConnectivityError::ConnectionFailed
            })?;
            self.driver.start().map_err(|e| {
                warn!("WiFi: start failed: {}", e);
                ConnectivityError::ConnectionFailed
            })?;
        }
        self.driver.connect().map_err(|e| {
            warn!("WiFi: connect failed: {}", e);
            ConnectivityError::ConnectionFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        if !self.sim_reachable {
            warn!("WiFi(sim): access point unreachable");
            return Err(ConnectivityError::ConnectionFailed);
        }
        self.sim_link_up = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_shutdown(&mut self) {
        if let Err(e) = self.driver.disconnect() {
            warn!("WiFi: disconnect failed: {}", e);
        }
        if let Err(e) = self.driver.stop() {
            warn!("WiFi: stop failed: {}", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_shutdown(&mut self) {
        self.sim_link_up = false;
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.driver.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_link_up
    }

    #[cfg(target_os = "espidf")]
    fn platform_write_ip(&self, out: &mut heapless::String<16>) -> fmt::Result {
        use core::fmt::Write;
        let info = self.driver.sta_netif().get_ip_info().map_err(|_| fmt::Error)?;
        write!(out, "{}", info.ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_write_ip(&self, out: &mut heapless::String<16>) -> fmt::Result {
        out.push_str("192.168.4.2").map_err(|_| fmt::Error)
    }

    // ── Simulation controls ───────────────────────────────────

    /// Drop the simulated link, as if the access point went away.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        self.sim_link_up = false;
    }

    /// Whether the next simulated connect can succeed.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_reachable(&mut self, reachable: bool) {
        self.sim_reachable = reachable;
        if !reachable {
            self.sim_link_up = false;
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
