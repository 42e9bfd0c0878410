//! Cooperative periodic task scheduler.
//!
//! Replaces free-running hardware timer callbacks with an explicit task
//! table polled from the single control loop. The scheduler only tracks
//! periods; when a task is due it notifies a [`SchedulerDelegate`], and the
//! delegate runs the task body.
//!
//! ```text
//!  ┌─────────────────────────────────────────────────────────┐
//!  │  Scheduler (slot order = registration order)            │
//!  │   ramp 200ms · boost 1s · telemetry 5s · keepalive ·    │
//!  │   housekeeping                                          │
//!  └───────────────────────┬─────────────────────────────────┘
//!                          │ on_task_due(TaskId, now)
//!                          ▼
//!                 SchedulerDelegate (runtime)
//!                          │
//!                          ▼
//!                 AppService task entry points
//! ```

use crate::app::ports::{SchedulerDelegate, TaskId};
use crate::control::Millis;
use log::info;

// ═══════════════════════════════════════════════════════════════
//  Task types
// ═══════════════════════════════════════════════════════════════

/// A periodic task registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicTask {
    pub id: TaskId,
    pub period_ms: u32,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of concurrent tasks (stack-allocated).
const MAX_TASKS: usize = 8;

/// The scheduler engine.
///
/// Decoupled from the task bodies: firing invokes the delegate, which makes
/// the scheduler independently testable.
pub struct Scheduler {
    tasks: [Option<TaskEntry>; MAX_TASKS],
}

/// Internal bookkeeping for a live task.
#[derive(Debug, Clone, Copy)]
struct TaskEntry {
    task: PeriodicTask,
    next_due_ms: Millis,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: [None; MAX_TASKS],
        }
    }

    /// Register a task, first due one period after `now`. Returns the slot
    /// index, or `None` if the table is full.
    pub fn add(&mut self, task: PeriodicTask, now: Millis) -> Option<usize> {
        let (i, slot) = self.tasks.iter_mut().enumerate().find(|(_, s)| s.is_none())?;
        info!("Scheduler: added {:?} every {}ms at slot {}", task.id, task.period_ms, i);
        *slot = Some(TaskEntry {
            task,
            next_due_ms: now + u64::from(task.period_ms),
        });
        Some(i)
    }

    /// Drop every task. Nothing fires afterwards until tasks are re-added.
    pub fn cancel_all(&mut self) {
        let count = self.active_count();
        self.tasks = [None; MAX_TASKS];
        info!("Scheduler: cancelled {} task(s)", count);
    }

    /// Run every due task once, in registration order.
    ///
    /// A task that fell more than one period behind is not replayed; its
    /// next due time is re-anchored on `now`.
    pub fn tick(&mut self, now: Millis, delegate: &mut dyn SchedulerDelegate) {
        for entry in self.tasks.iter_mut().flatten() {
            if now < entry.next_due_ms {
                continue;
            }
            delegate.on_task_due(entry.task.id, now);

            let period = u64::from(entry.task.period_ms);
            entry.next_due_ms += period;
            if entry.next_due_ms <= now {
                entry.next_due_ms = now + period;
            }
        }
    }

    /// Number of registered tasks.
    pub fn active_count(&self) -> usize {
        self.tasks.iter().flatten().count()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
