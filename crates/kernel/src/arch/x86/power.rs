//! Poweroff
//!
//! QEMU ACPI poweroff ports; newer machines use 0x604, isapc uses 0xB004.
//! On real hardware neither responds and we park in the halt loop.

use super::port::Port;

const QEMU_SHUTDOWN: Port<u16> = Port::new(0x604);
const QEMU_SHUTDOWN_LEGACY: Port<u16> = Port::new(0xB004);

const SHUTDOWN_VALUE: u16 = 0x2000;

pub fn poweroff() -> ! {
    crate::info!("power: shutting down");
    crate::console::flush();
    unsafe {
        QEMU_SHUTDOWN.write(SHUTDOWN_VALUE);
        QEMU_SHUTDOWN_LEGACY.write(SHUTDOWN_VALUE);
    }
    loop {
        crate::arch::halt();
    }
}
