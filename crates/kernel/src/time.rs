//! Tick accounting and delays
//!
//! The PIT IRQ advances a monotonic 32-bit tick counter at 1 kHz and
//! services the scheduler with the elapsed tick count. `sleep_ms` uses a
//! tick deadline once the timer runs and falls back to a calibrated busy
//! loop during early boot.

use crate::interrupts::CancelFlag;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Monotonic 1 ms ticks since timer start. Wraps after ~49 days.
static TICKS: AtomicU32 = AtomicU32::new(0);

/// Tick count at the last scheduler service.
static LAST_SERVICE: AtomicU32 = AtomicU32::new(0);

static TIMER_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Busy-loop iterations per millisecond for the early-boot fallback.
static SPINS_PER_MS: AtomicU32 = AtomicU32::new(50_000);

pub fn ticks() -> u32 {
    TICKS.load(Ordering::Relaxed)
}

pub fn uptime_ms() -> u32 {
    ticks()
}

pub fn timer_active() -> bool {
    TIMER_ACTIVE.load(Ordering::Relaxed)
}

/// Mark the PIT as running; flips `sleep_ms` onto the tick deadline path.
pub fn mark_timer_active() {
    TIMER_ACTIVE.store(true, Ordering::Relaxed);
}

/// Store the measured loop calibration for the early-boot delay path.
pub fn calibrate_spin(spins_per_ms: u32) {
    SPINS_PER_MS.store(spins_per_ms.max(1), Ordering::Relaxed);
}

/// Timer IRQ service: advance the counter, then drive the scheduler with
/// the ticks elapsed since the last service.
pub fn timer_tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
    let now = ticks();
    let last = LAST_SERVICE.swap(now, Ordering::Relaxed);
    let elapsed = now.wrapping_sub(last);
    crate::process::update_sleep_times(elapsed);
    crate::process::schedule();
}

/// Sleep approximately `ms` milliseconds. Returns early (false) when `cancel`
/// latches; polls at 1 ms granularity.
pub fn sleep_ms_cancelable(ms: u32, cancel: &CancelFlag) -> bool {
    if timer_active() {
        let deadline = ticks().wrapping_add(ms);
        while (deadline.wrapping_sub(ticks()) as i32) > 0 {
            if cancel.requested() {
                return false;
            }
            crate::arch::halt();
        }
    } else {
        for _ in 0..ms {
            if cancel.requested() {
                return false;
            }
            busy_wait_one_ms();
        }
    }
    true
}

pub fn sleep_ms(ms: u32) {
    static NEVER: CancelFlag = CancelFlag::new();
    sleep_ms_cancelable(ms, &NEVER);
}

fn busy_wait_one_ms() {
    let spins = SPINS_PER_MS.load(Ordering::Relaxed);
    for _ in 0..spins {
        core::hint::spin_loop();
    }
}
