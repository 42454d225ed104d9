//! Console byte-sink seam
//!
//! The VGA text renderer and terminal surface live outside the kernel core;
//! the core only requires that bytes written here become observable in
//! order. Sinks register once at bring-up (serial first, the TTY surface
//! later) and every logging path funnels through this module.

use crate::lib::fmt::ByteSink;
use spin::Mutex;

/// A character-cell sink with a flush contract.
pub trait ConsoleSink: Send + Sync {
    fn write_byte(&self, byte: u8);

    /// Make everything written so far observable.
    fn flush(&self) {}
}

const MAX_SINKS: usize = 4;

static SINKS: Mutex<[Option<&'static dyn ConsoleSink>; MAX_SINKS]> = Mutex::new([None; MAX_SINKS]);

/// Attach a sink. Fails with `Exhausted` once all slots are taken.
pub fn register_sink(sink: &'static dyn ConsoleSink) -> crate::Result<()> {
    let mut sinks = SINKS.lock();
    for slot in sinks.iter_mut() {
        if slot.is_none() {
            *slot = Some(sink);
            return Ok(());
        }
    }
    Err(crate::KernelError::Exhausted)
}

pub fn write_bytes(bytes: &[u8]) {
    let sinks = SINKS.lock();
    for sink in sinks.iter().flatten() {
        for &b in bytes {
            sink.write_byte(b);
        }
    }
}

pub fn write_str(s: &str) {
    write_bytes(s.as_bytes());
}

pub fn flush() {
    let sinks = SINKS.lock();
    for sink in sinks.iter().flatten() {
        sink.flush();
    }
}

/// `ByteSink`/`fmt::Write` front end over the registered sinks.
pub struct Writer;

impl ByteSink for Writer {
    fn emit(&mut self, byte: u8) {
        write_bytes(core::slice::from_ref(&byte));
    }
}

impl core::fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        write_bytes(s.as_bytes());
        Ok(())
    }
}
