//! PS/2 keyboard glue
//!
//! The IRQ1 path reads exactly one byte from the data port and hands it to
//! the decoder; it never polls the status register. The polling entry is
//! for bring-up before interrupts are enabled.

use super::pic::{self, Irq};
use super::port::Port;

const DATA: Port<u8> = Port::new(0x60);
const STATUS: Port<u8> = Port::new(0x64);

const STATUS_OUTPUT_FULL: u8 = 0x01;

/// Unmask IRQ 1.
pub fn init() {
    pic::enable_irq(Irq::Keyboard);
    crate::info!("ps2: keyboard irq enabled");
}

/// IRQ 1 service: EOI, then one byte into the decoder.
pub fn handle_irq() {
    pic::end_of_interrupt(Irq::Keyboard as u8);
    let byte = unsafe { DATA.read() };
    crate::keyboard::handle_scancode(byte);
}

/// Polling path: drain pending bytes through the decoder.
pub fn poll() {
    while unsafe { STATUS.read() } & STATUS_OUTPUT_FULL != 0 {
        let byte = unsafe { DATA.read() };
        crate::keyboard::handle_scancode(byte);
    }
}
