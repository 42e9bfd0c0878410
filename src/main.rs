//! Circulation pump controller: main entry point.
//!
//! Hexagonal architecture around a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter     MqttTransport       TaskWatchdog          │
//! │  (Sensor+Actuator)   (Transport+Events)  (WatchdogPort)        │
//! │  Esp32TimeAdapter    WifiAdapter         LogEventSink          │
//! │  (ClockPort)                                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Ramp · Boost · Commands · Feedback decoder            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Runtime: Scheduler · WatchdogSupervisor · bounded reconnect   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;

use circpump::adapters::hardware::HardwareAdapter;
use circpump::adapters::mqtt::MqttTransport;
use circpump::adapters::time::Esp32TimeAdapter;
use circpump::adapters::wifi::WifiAdapter;
use circpump::app::runtime::Runtime;
use circpump::config::{FIRMWARE_VERSION, SystemConfig};
use circpump::diagnostics;
use circpump::drivers::hw_init::{self, GpioOutput, LEDC_CH_PUMP, LedcPwm};
use circpump::drivers::pump::PumpDriver;
use circpump::drivers::status_led::StatusLed;
use circpump::drivers::watchdog::TaskWatchdog;
use circpump::error::Error;
use circpump::pins;
use circpump::sensors::SensorHub;
use circpump::sensors::feedback::FEEDBACK;

/// Sleep between loop passes. Short enough that a command is picked up
/// well inside one ramp tick.
const LOOP_IDLE_MS: u32 = 20;
/// Sleep while waiting for the first WiFi association.
const LINK_IDLE_MS: u32 = 100;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    diagnostics::install_panic_handler();

    info!("╔══════════════════════════════════════╗");
    info!("║  circpump {:<27}║", FIRMWARE_VERSION);
    info!("╚══════════════════════════════════════╝");

    let config = SystemConfig::default();
    config.validate().map_err(Error::from)?;

    // ── 2. Peripherals, output first ──────────────────────────
    hw_init::init_peripherals(config.pwm_frequency_hz).map_err(Error::from)?;
    FEEDBACK.set_min_pulse_us(config.feedback_min_pulse_us);
    if let Err(e) = hw_init::init_isr_service() {
        // Feedback then reads as TIMEOUT; speed control still works.
        warn!("ISR service init failed: {}, continuing without feedback", e);
    }

    let hw = HardwareAdapter::new(
        SensorHub::new(),
        PumpDriver::new(LedcPwm::new(LEDC_CH_PUMP)),
        StatusLed::new(GpioOutput::new(pins::STATUS_LED_GPIO)),
    );
    let watchdog = TaskWatchdog::new(config.watchdog_timeout_ms, config.watchdog_enabled);

    // ── 3. Network stack (not started yet) ────────────────────
    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut wifi = WifiAdapter::new(EspWifi::new(peripherals.modem, sysloop, Some(nvs))?);
    if let Err(e) = wifi.set_credentials(&config.wifi_ssid, &config.wifi_password) {
        warn!("WiFi credentials rejected: {}, staying offline", e);
    }
    let transport = MqttTransport::new(&config, wifi);

    // ── 4. Control loop ───────────────────────────────────────
    let mut runtime = Runtime::new(config, hw, transport, watchdog, Esp32TimeAdapter::new());
    runtime.power_on();

    if let Err(e) = runtime.transport_mut().wifi_mut().begin_connect() {
        warn!("WiFi: initial connect failed: {}", e);
    }
    runtime.start(|| FreeRtos::delay_ms(LINK_IDLE_MS));

    info!("System ready. Entering control loop.");
    runtime.run(|| FreeRtos::delay_ms(LOOP_IDLE_MS))
}
