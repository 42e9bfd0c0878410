//! ESP32 time adapter.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` (microsecond,
//!   monotonic) and the libc wall clock.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` for host-side
//!   simulation.

use crate::app::ports::ClockPort;

/// Time adapter for the ESP32-S3 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Seconds since boot (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.uptime_us() / 1_000_000
    }
}

impl ClockPort for Esp32TimeAdapter {
    #[cfg(target_os = "espidf")]
    fn uptime_us(&self) -> u64 {
        // SAFETY: monotonic counter read, no preconditions.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

/// Local time of day as `(hours, minutes, seconds)` for log prefixes.
///
/// The RTC is not synced; before any sync this is simply time since the
/// epoch the RTC started from, which is still useful for ordering lines.
#[cfg(target_os = "espidf")]
pub fn wall_clock_hms() -> (u8, u8, u8) {
    use esp_idf_svc::sys::{gettimeofday, localtime_r, time_t, timeval, tm};

    let mut tv = timeval { tv_sec: 0, tv_usec: 0 };
    // SAFETY: out-pointers to stack locals; a null timezone is allowed.
    if unsafe { gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
        return (0, 0, 0);
    }
    let secs = tv.tv_sec as time_t;
    // SAFETY: zeroed tm is a valid out-parameter.
    let mut out: tm = unsafe { core::mem::zeroed() };
    if unsafe { localtime_r(&secs, &mut out) }.is_null() {
        return (0, 0, 0);
    }
    (out.tm_hour as u8, out.tm_min as u8, out.tm_sec as u8)
}

/// Host builds derive the time of day from process uptime.
#[cfg(not(target_os = "espidf"))]
pub fn wall_clock_hms() -> (u8, u8, u8) {
    use std::sync::OnceLock;
    static START: OnceLock<std::time::Instant> = OnceLock::new();
    hms_from_secs(START.get_or_init(std::time::Instant::now).elapsed().as_secs())
}

/// Split seconds into a 24-hour `(h, m, s)`.
pub fn hms_from_secs(secs: u64) -> (u8, u8, u8) {
    let day = secs % 86_400;
    ((day / 3_600) as u8, ((day % 3_600) / 60) as u8, (day % 60) as u8)
}
