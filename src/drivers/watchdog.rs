//! Task Watchdog Timer (TWDT) driver.
//!
//! Subscribes the main task to the ESP-IDF TWDT. If nobody calls `feed()`
//! within the timeout the chip panics and restarts; the remote `reset`
//! command relies on exactly that.
//!
//! With `enabled = false` (bench builds) every call is a no-op.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

use crate::app::ports::WatchdogPort;

pub struct TaskWatchdog {
    timeout_ms: u32,
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    subscribed: bool,
}

impl TaskWatchdog {
    /// Initialise and subscribe the current task to the TWDT.
    pub fn new(timeout_ms: u32, enabled: bool) -> Self {
        if !enabled {
            info!("Watchdog: disabled by configuration");
            return Self {
                timeout_ms,
                subscribed: false,
            };
        }

        #[cfg(target_os = "espidf")]
        {
            // SAFETY: TWDT configuration from the main task before the loop.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                if let Err(e) = esp!(esp_task_wdt_reconfigure(&cfg)) {
                    log::warn!("TWDT reconfigure returned {} (may already be configured)", e);
                }

                let subscribed = esp!(esp_task_wdt_add(core::ptr::null_mut())).is_ok();
                if subscribed {
                    info!("Watchdog: subscribed ({} ms timeout, panic on trigger)", timeout_ms);
                } else {
                    log::warn!("Watchdog: failed to subscribe");
                }

                Self { timeout_ms, subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {} ms, no-op", timeout_ms);
            Self {
                timeout_ms,
                subscribed: true,
            }
        }
    }
}

impl WatchdogPort for TaskWatchdog {
    fn feed(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: resets the TWDT entry of the calling (subscribed) task.
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }

    fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}
