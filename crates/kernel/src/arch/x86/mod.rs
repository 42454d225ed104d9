// IA-32 hardware layer: port I/O, serial, 8259 PIC, PIT, IDT, PS/2 glue,
// context switch, QEMU poweroff.

pub mod context;
pub mod idt;
pub mod pic;
pub mod pit;
pub mod port;
pub mod power;
pub mod ps2;
pub mod serial;
