//! Runtime diagnostics.
//!
//! Heap metrics for the hourly housekeeping log and the `MEM` telemetry
//! field, the firmware description string published with every
//! telemetry frame, and a panic hook that leaves a trace in the log before
//! the chip resets.

use core::fmt::Write;

use crate::config::FIRMWARE_VERSION;

/// Heap snapshot collected on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeMetrics {
    pub uptime_secs: u64,
    pub heap_free: u32,
    pub heap_total: u32,
    pub heap_min_free: u32,
}

impl RuntimeMetrics {
    #[cfg(target_os = "espidf")]
    pub fn collect(uptime_secs: u64) -> Self {
        use esp_idf_svc::sys::*;
        // SAFETY: plain reads of allocator counters; no preconditions.
        let (heap_free, heap_min_free, heap_total) = unsafe {
            (
                esp_get_free_heap_size(),
                esp_get_minimum_free_heap_size(),
                heap_caps_get_total_size(MALLOC_CAP_DEFAULT) as u32,
            )
        };

        Self {
            uptime_secs,
            heap_free,
            heap_total,
            heap_min_free,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn collect(uptime_secs: u64) -> Self {
        // Synthetic values so simulation exercises the same paths as
        // hardware. Free heap decays slowly to model fragmentation.
        let heap_total: u32 = 327_680;
        let base_free: u32 = 307_200;
        let decay = (uptime_secs / 60) as u32 * 512;
        let heap_free = base_free.saturating_sub(decay);
        let heap_min_free = (heap_free as f32 * 0.85) as u32;

        Self {
            uptime_secs,
            heap_free,
            heap_total,
            heap_min_free,
        }
    }

    /// Share of the heap in use, 0..=100.
    pub fn used_percent(&self) -> u8 {
        if self.heap_total == 0 {
            return 0;
        }
        let used = self.heap_total.saturating_sub(self.heap_free);
        ((u64::from(used) * 100) / u64::from(self.heap_total)).min(100) as u8
    }
}

/// Heap usage for telemetry.
pub fn memory_percent() -> u8 {
    RuntimeMetrics::collect(0).used_percent()
}

/// `"<version> | ESP-IDF <idf> | esp32s3"` on hardware, a host marker
/// otherwise.
pub fn firmware_description() -> heapless::String<96> {
    let mut out = heapless::String::new();

    #[cfg(target_os = "espidf")]
    {
        // SAFETY: esp_get_idf_version returns a pointer to a static
        // NUL-terminated string.
        let idf = unsafe { core::ffi::CStr::from_ptr(esp_idf_svc::sys::esp_get_idf_version()) };
        let idf = idf.to_str().unwrap_or("unknown");
        if write!(out, "{} | ESP-IDF {} | esp32s3", FIRMWARE_VERSION, idf).is_err() {
            out.clear();
            let _ = out.push_str(FIRMWARE_VERSION);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    {
        if write!(out, "{} | host | simulation", FIRMWARE_VERSION).is_err() {
            out.clear();
            let _ = out.push_str(FIRMWARE_VERSION);
        }
    }

    out
}

/// Install a panic hook that logs the reason before the default abort.
///
/// Call once during init, after the logger is up.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };

        match info.location() {
            Some(loc) => log::error!("PANIC at {}:{}: {}", loc.file(), loc.line(), reason),
            None => log::error!("PANIC: {}", reason),
        }

        #[cfg(target_os = "espidf")]
        {
            // SAFETY: esp_timer_get_time is a counter read, safe in panic context.
            let uptime = (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000_000;
            log::error!("PANIC after {} s uptime", uptime);
        }
    }));
}
