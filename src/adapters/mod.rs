//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements      | Connects to                 |
//! |------------|-----------------|-----------------------------|
//! | `hardware` | SensorPort      | feedback ISR cell, ADC, GPIO|
//! |            | ActuatorPort    | LEDC PWM, status LED        |
//! | `log_sink` | EventSink       | Serial log output           |
//! | `mqtt`     | TransportPort   | MQTT broker over WiFi       |
//! |            | EventSink       | telemetry / log topics      |
//! | `time`     | ClockPort       | ESP32 system timer          |
//! | `wifi`     | (inherent)      | ESP-IDF WiFi STA            |

pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod wifi;
