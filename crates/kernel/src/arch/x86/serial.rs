//! COM1 serial output
//!
//! 16550 UART at 0x3F8, 38400 8n1, FIFO on. Output only: this is the boot
//! console sink and the printk target before (and beside) the TTY surface.

use super::port::Port;
use crate::console::ConsoleSink;

const COM1: u16 = 0x3F8;

const DATA: Port<u8> = Port::new(COM1);
const INTERRUPT_ENABLE: Port<u8> = Port::new(COM1 + 1);
const FIFO_CONTROL: Port<u8> = Port::new(COM1 + 2);
const LINE_CONTROL: Port<u8> = Port::new(COM1 + 3);
const MODEM_CONTROL: Port<u8> = Port::new(COM1 + 4);
const LINE_STATUS: Port<u8> = Port::new(COM1 + 5);

const LSR_TX_EMPTY: u8 = 0x20;

pub fn init() {
    unsafe {
        INTERRUPT_ENABLE.write(0x00);
        LINE_CONTROL.write(0x80); // DLAB on
        DATA.write(0x03); // divisor low: 38400 baud
        INTERRUPT_ENABLE.write(0x00); // divisor high
        LINE_CONTROL.write(0x03); // 8n1, DLAB off
        FIFO_CONTROL.write(0xC7); // FIFO on, cleared, 14-byte threshold
        MODEM_CONTROL.write(0x0B); // DTR, RTS, OUT2
    }
}

fn wait_tx_ready() {
    let mut budget = 100_000u32;
    loop {
        let status = unsafe { LINE_STATUS.read() };
        if status & LSR_TX_EMPTY != 0 || budget == 0 {
            return;
        }
        budget -= 1;
        core::hint::spin_loop();
    }
}

pub fn write_byte(byte: u8) {
    if byte == b'\n' {
        raw_write(b'\r');
    }
    raw_write(byte);
}

fn raw_write(byte: u8) {
    wait_tx_ready();
    unsafe {
        DATA.write(byte);
    }
}

pub fn write_bytes(bytes: &[u8]) {
    for &b in bytes {
        write_byte(b);
    }
}

/// Console sink adapter; registered first during bring-up.
pub struct SerialSink;

pub static SERIAL_SINK: SerialSink = SerialSink;

impl ConsoleSink for SerialSink {
    fn write_byte(&self, byte: u8) {
        write_byte(byte);
    }
}
