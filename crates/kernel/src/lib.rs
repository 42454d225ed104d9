//! lux-kernel core library
//!
//! Freestanding single-user kernel core for 32-bit x86. The library owns the
//! interrupt and preemption path, the PS/2 keyboard translation state
//! machine, the ATA-PIO storage stack with the luxfs filesystem, and the
//! first-fit kernel heap. Hardware access is confined to `arch::x86`; every
//! other module is architecture-neutral and exercised by host-side tests.
//!
//! Initialization order is fixed: heap, dispatcher, IDT, PIC, timer, disk,
//! filesystem, then `interrupt_enable`. `main.rs` wires the phases.

#![no_std]
#![cfg_attr(
    target_arch = "x86",
    feature(abi_x86_interrupt),
    feature(alloc_error_handler)
)]

extern crate alloc;

pub mod arch;
pub mod block;
pub mod console;
pub mod drivers;
pub mod fs;
pub mod heap;
pub mod interrupts;
pub mod keyboard;
// Explicit path: the crate root file and this module share the `lib` name.
#[path = "lib/mod.rs"]
pub mod lib;
pub mod process;
pub mod swap;
pub mod time;

pub use crate::lib::error::{KernelError, Result};
