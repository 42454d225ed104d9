//! PIT channel 0
//!
//! Rate generator (mode 2), binary counting, divisor 1193 for a 1000 Hz
//! tick. The IRQ0 handler acknowledges the PIC first, then advances the
//! tick counter and services the scheduler through `time::timer_tick`.

use super::pic::{self, Irq};
use super::port::Port;

/// Fundamental oscillator frequency of the 8253/8254.
pub const PIT_FREQUENCY: u32 = 1_193_182;

/// 1 kHz tick: one tick per millisecond.
pub const TICK_HZ: u32 = 1000;

pub const DIVISOR: u16 = (PIT_FREQUENCY / TICK_HZ) as u16;

const CHANNEL0: Port<u8> = Port::new(0x40);
const COMMAND: Port<u8> = Port::new(0x43);

/// Channel 0, lobyte/hibyte access, mode 2, binary.
const CMD_CHANNEL0_MODE2: u8 = 0x34;

/// Program channel 0 and unmask IRQ 0.
///
/// # Safety
///
/// Requires the IDT and remapped PIC; call once during bring-up with
/// interrupts disabled.
pub unsafe fn init() {
    COMMAND.write(CMD_CHANNEL0_MODE2);
    CHANNEL0.write((DIVISOR & 0xFF) as u8);
    CHANNEL0.write((DIVISOR >> 8) as u8);

    crate::time::mark_timer_active();
    pic::enable_irq(Irq::Timer);
    crate::info!("pit: channel 0 at {} Hz (divisor {})", TICK_HZ, DIVISOR);
}

/// IRQ 0 service: EOI, then tick accounting and the scheduler.
pub fn handle_irq() {
    pic::end_of_interrupt(Irq::Timer as u8);
    crate::time::timer_tick();
}
