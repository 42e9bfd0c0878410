//! Cooperative control loop.
//!
//! One [`Runtime::step`] is one pass of the main loop:
//!
//! 1. run every due scheduler task, in registration order, feeding the
//!    watchdog after each;
//! 2. poll at most one remote command and handle it;
//! 3. feed the watchdog;
//! 4. if the transport reported a failure, run the bounded reconnect.
//!
//! No step blocks beyond a single bounded transport call. Once a `Reset`
//! command arrives, or reconnect is exhausted, `step` stops doing anything,
//! and in particular stops feeding, so the task watchdog restarts the chip.

use log::{info, warn};

use crate::config::SystemConfig;
use crate::control::Millis;
use crate::diagnostics::RuntimeMetrics;
use crate::scheduler::{PeriodicTask, Scheduler};
use crate::supervisor::{ReconnectOutcome, WatchdogSupervisor};

use super::commands::Command;
use super::events::CommandOutcome;
use super::ports::{
    ActuatorPort, ClockPort, EventSink, SchedulerDelegate, SensorPort, TaskId, TransportPort, WatchdogPort,
};
use super::service::AppService;

/// What the loop should do after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Running,
    /// Terminal: waiting for the watchdog to restart the device.
    AwaitingReset,
}

pub struct Runtime<H, T, W, C>
where
    H: ActuatorPort + SensorPort,
    T: TransportPort + EventSink,
    W: WatchdogPort,
    C: ClockPort,
{
    app: AppService,
    hw: H,
    transport: T,
    supervisor: WatchdogSupervisor<W>,
    scheduler: Scheduler,
    clock: C,
    reconnect_needed: bool,
}

impl<H, T, W, C> Runtime<H, T, W, C>
where
    H: ActuatorPort + SensorPort,
    T: TransportPort + EventSink,
    W: WatchdogPort,
    C: ClockPort,
{
    pub fn new(config: SystemConfig, hw: H, transport: T, watchdog: W, clock: C) -> Self {
        Self {
            app: AppService::new(config),
            hw,
            transport,
            supervisor: WatchdogSupervisor::new(watchdog),
            scheduler: Scheduler::new(),
            clock,
            reconnect_needed: false,
        }
    }

    /// Fail-safe output. Call before anything touches the network.
    pub fn power_on(&mut self) {
        self.app.apply_initial_output(&mut self.hw);
        self.supervisor.feed();
    }

    /// Bring-up after [`power_on`](Self::power_on): wait for the link while
    /// feeding, open the broker session, announce, then register the
    /// periodic tasks.
    ///
    /// A failed broker connect is not fatal here; the first loop pass runs
    /// the bounded reconnect.
    pub fn start(&mut self, mut idle: impl FnMut()) {
        while !self.transport.link_status().connected {
            self.supervisor.feed();
            idle();
        }

        let connected = match self.transport.connect() {
            Ok(()) => true,
            Err(e) => {
                warn!("Runtime: initial connect failed: {}", e);
                self.reconnect_needed = true;
                false
            }
        };

        let now_us = self.clock.uptime_us();
        self.app.set_link(self.transport.link_status());
        if connected {
            self.app.log(&mut self.transport, format_args!("transport connected"));
        }
        self.app.announce(now_us, &mut self.hw, &mut self.transport);
        self.supervisor.feed();

        let config = self.app.config();
        let tasks = [
            PeriodicTask {
                id: TaskId::Ramp,
                period_ms: config.ramp_tick_ms,
            },
            PeriodicTask {
                id: TaskId::Boost,
                period_ms: config.boost_tick_ms,
            },
            PeriodicTask {
                id: TaskId::Telemetry,
                period_ms: config.telemetry_interval_ms,
            },
            PeriodicTask {
                id: TaskId::KeepAlive,
                period_ms: config.keepalive_interval_ms,
            },
            PeriodicTask {
                id: TaskId::Housekeeping,
                period_ms: config.housekeeping_interval_ms,
            },
        ];
        let now_ms = now_us / 1_000;
        for task in tasks {
            if self.scheduler.add(task, now_ms).is_none() {
                warn!("Runtime: task table full, {:?} not scheduled", task.id);
            }
        }
        info!("Runtime: {} periodic tasks registered", self.scheduler.active_count());
    }

    /// One pass of the control loop.
    pub fn step(&mut self) -> StepOutcome {
        if self.app.is_awaiting_reset() || self.supervisor.is_starving() {
            return StepOutcome::AwaitingReset;
        }

        let now_us = self.clock.uptime_us();
        let now_ms = now_us / 1_000;
        self.app.set_link(self.transport.link_status());

        // 1. Scheduled tasks.
        let mut tasks = TaskRunner {
            app: &mut self.app,
            hw: &mut self.hw,
            transport: &mut self.transport,
            supervisor: &mut self.supervisor,
            now_us,
            reconnect_needed: &mut self.reconnect_needed,
        };
        self.scheduler.tick(now_ms, &mut tasks);

        // 2. At most one remote command.
        match self.transport.poll_command() {
            Ok(Some(text)) => {
                let command = Command::parse(&text);
                let outcome = self.app.handle_command(command, now_us, &mut self.hw, &mut self.transport);
                if outcome == CommandOutcome::RestartRequested {
                    self.enter_reset();
                    return StepOutcome::AwaitingReset;
                }
            }
            Ok(None) => {}
            Err(e) => {
                self.app.log(&mut self.transport, format_args!("error: {}", e));
                self.reconnect_needed = true;
            }
        }

        // 3. Liveness.
        self.supervisor.feed();

        // 4. Bounded reconnect.
        if self.reconnect_needed {
            self.reconnect_needed = false;
            let attempts = self.app.config().reconnect_attempts;
            match self.supervisor.reconnect(&mut self.transport, attempts) {
                ReconnectOutcome::Connected { .. } => {
                    self.app.set_link(self.transport.link_status());
                    self.app.log(&mut self.transport, format_args!("transport connected"));
                }
                ReconnectOutcome::Exhausted => {
                    self.app.log(
                        &mut self.transport,
                        format_args!("FATAL: reconnect failed {} times -> reset", attempts),
                    );
                    self.scheduler.cancel_all();
                    return StepOutcome::AwaitingReset;
                }
            }
        }

        StepOutcome::Running
    }

    /// Loop forever. `idle` yields between passes (e.g. a short sleep).
    pub fn run(&mut self, mut idle: impl FnMut()) -> ! {
        loop {
            if self.step() == StepOutcome::AwaitingReset {
                // Nothing feeds from here on.
                idle();
                continue;
            }
            idle();
        }
    }

    /// Terminal path for a remote reset: no tasks, no radio, no feeds.
    fn enter_reset(&mut self) {
        self.scheduler.cancel_all();
        self.transport.shutdown();
        self.supervisor.starve();
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn app(&self) -> &AppService {
        &self.app
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn supervisor(&self) -> &WatchdogSupervisor<W> {
        &self.supervisor
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

// ───────────────────────────────────────────────────────────────
// Task bodies
// ───────────────────────────────────────────────────────────────

/// Borrowed view of the runtime handed to the scheduler for one pass.
struct TaskRunner<'a, H, T, W: WatchdogPort> {
    app: &'a mut AppService,
    hw: &'a mut H,
    transport: &'a mut T,
    supervisor: &'a mut WatchdogSupervisor<W>,
    now_us: u64,
    reconnect_needed: &'a mut bool,
}

impl<H, T, W> SchedulerDelegate for TaskRunner<'_, H, T, W>
where
    H: ActuatorPort + SensorPort,
    T: TransportPort + EventSink,
    W: WatchdogPort,
{
    fn on_task_due(&mut self, task: TaskId, now_ms: Millis) {
        match task {
            TaskId::Ramp => self.app.ramp_tick(now_ms, self.hw),
            TaskId::Boost => self.app.boost_tick(now_ms, self.hw, self.transport),
            TaskId::Telemetry => self.app.publish_telemetry(self.now_us, self.hw, self.transport),
            TaskId::KeepAlive => {
                if !self.transport.is_connected() {
                    warn!("Runtime: keep-alive found transport down");
                    *self.reconnect_needed = true;
                } else if let Err(e) = self.transport.ping() {
                    warn!("Runtime: keep-alive ping failed: {}", e);
                    *self.reconnect_needed = true;
                }
            }
            TaskId::Housekeeping => {
                let m = RuntimeMetrics::collect(now_ms / 1_000);
                self.app.log(
                    self.transport,
                    format_args!(
                        "heap free: {} of {} bytes (min {})",
                        m.heap_free, m.heap_total, m.heap_min_free
                    ),
                );
            }
        }
        self.supervisor.feed();
    }
}
