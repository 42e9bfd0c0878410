//! Watchdog supervisor.
//!
//! Owns the feed discipline for the task watchdog. Every cooperative task
//! path feeds through [`WatchdogSupervisor::feed`]; the two fatal paths
//! (remote reset, exhausted reconnect) call [`starve`](WatchdogSupervisor::starve),
//! after which feeds are swallowed and the hardware timeout restarts the
//! chip.
//!
//! ## Starvation lifecycle
//!
//! 1. `Reset` command or reconnect exhaustion.
//! 2. The supervisor latches `starving`; it is never cleared.
//! 3. The control loop keeps idling without feeding.
//! 4. The watchdog fires after its timeout and resets the device.

use log::{error, info, warn};

use crate::app::ports::{TransportPort, WatchdogPort};

/// Result of the bounded reconnect procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// Connected on the given 1-based attempt.
    Connected { attempt: u8 },
    /// Every attempt failed; the watchdog is now starving.
    Exhausted,
}

pub struct WatchdogSupervisor<W: WatchdogPort> {
    watchdog: W,
    starving: bool,
    feeds: u64,
}

impl<W: WatchdogPort> WatchdogSupervisor<W> {
    pub fn new(watchdog: W) -> Self {
        info!("Supervisor: watchdog timeout {}ms", watchdog.timeout_ms());
        Self {
            watchdog,
            starving: false,
            feeds: 0,
        }
    }

    /// Signal liveness. No-op once starving.
    pub fn feed(&mut self) {
        if self.starving {
            return;
        }
        self.watchdog.feed();
        self.feeds += 1;
    }

    /// Stop feeding for good. The device restarts within the timeout.
    pub fn starve(&mut self) {
        if !self.starving {
            error!(
                "Supervisor: watchdog starved, restart in {}ms",
                self.watchdog.timeout_ms()
            );
        }
        self.starving = true;
    }

    pub fn is_starving(&self) -> bool {
        self.starving
    }

    /// Feeds delivered so far.
    pub fn feed_count(&self) -> u64 {
        self.feeds
    }

    pub fn timeout_ms(&self) -> u32 {
        self.watchdog.timeout_ms()
    }

    pub fn watchdog(&self) -> &W {
        &self.watchdog
    }

    /// Try `transport.connect()` up to `attempts` times, feeding between
    /// attempts. On exhaustion the watchdog is starved.
    pub fn reconnect(&mut self, transport: &mut impl TransportPort, attempts: u8) -> ReconnectOutcome {
        for attempt in 1..=attempts {
            match transport.connect() {
                Ok(()) => {
                    info!("Supervisor: transport up on attempt {}/{}", attempt, attempts);
                    return ReconnectOutcome::Connected { attempt };
                }
                Err(e) => {
                    warn!("Supervisor: connect attempt {}/{} failed: {}", attempt, attempts, e);
                    if attempt < attempts {
                        self.feed();
                    }
                }
            }
        }
        self.starve();
        ReconnectOutcome::Exhausted
    }
}
