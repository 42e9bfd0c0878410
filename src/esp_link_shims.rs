//! `critical-section` provider for the device build.
//!
//! The command inbox is an `embassy-sync` channel, which locks through
//! `critical-section`. ESP-IDF gives us threads, so one std mutex is enough.
//! The restore token records whether this call took the lock: nested
//! sections on the same thread get `0` and leave it alone on release.

#[cfg(target_os = "espidf")]
use core::cell::RefCell;
#[cfg(target_os = "espidf")]
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(target_os = "espidf")]
static SECTION: Mutex<()> = Mutex::new(());

#[cfg(target_os = "espidf")]
thread_local! {
    static HELD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    HELD.with(|held| {
        let mut held = held.borrow_mut();
        if held.is_some() {
            return 0;
        }
        // Nothing lives behind the lock, so poisoning is harmless.
        *held = Some(SECTION.lock().unwrap_or_else(PoisonError::into_inner));
        1
    })
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(token: u8) {
    if token == 1 {
        HELD.with(|held| *held.borrow_mut() = None);
    }
}
