//! Architecture layer
//!
//! Everything that touches IA-32 hardware lives under `x86`. The shims here
//! keep the rest of the kernel architecture-neutral so it can run under the
//! host test harness.

#[cfg(target_arch = "x86")]
pub mod x86;

/// Set IF.
#[inline]
pub fn interrupt_enable() {
    #[cfg(target_arch = "x86")]
    unsafe {
        ::x86::irq::enable();
    }
}

/// Clear IF.
#[inline]
pub fn interrupt_disable() {
    #[cfg(target_arch = "x86")]
    unsafe {
        ::x86::irq::disable();
    }
}

/// Run `f` with interrupts masked, restoring the previous IF state after.
/// Off target this is a plain call.
#[inline]
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    #[cfg(target_arch = "x86")]
    {
        let flags: u32;
        unsafe {
            core::arch::asm!("pushfd", "pop {}", out(reg) flags, options(preserves_flags));
        }
        let was_enabled = flags & 0x200 != 0;
        if was_enabled {
            interrupt_disable();
        }
        let result = f();
        if was_enabled {
            interrupt_enable();
        }
        result
    }
    #[cfg(not(target_arch = "x86"))]
    {
        f()
    }
}

/// Park the CPU until the next interrupt.
#[inline]
pub fn halt() {
    #[cfg(target_arch = "x86")]
    unsafe {
        ::x86::halt();
    }
    #[cfg(not(target_arch = "x86"))]
    core::hint::spin_loop();
}
