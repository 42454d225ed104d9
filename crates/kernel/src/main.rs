//! Kernel entry and bring-up
//!
//! The bootloader drops us into 32-bit protected mode with a flat GDT
//! (code 0x08, data 0x10) and interrupts disabled. Bring-up order is
//! fixed: heap, dispatcher, IDT, PIC, timer, disk, filesystem, then
//! `interrupt_enable`. Fatal early failures log and park in the halt
//! loop.

#![cfg_attr(target_arch = "x86", no_std)]
#![cfg_attr(all(target_arch = "x86", not(test)), no_main)]

#[cfg(target_arch = "x86")]
extern crate alloc;

#[cfg(target_arch = "x86")]
mod kernel {
    use alloc::sync::Arc;
    use lux_kernel::arch::x86::{idt, pic, pit, power, ps2, serial};
    use lux_kernel::{arch, block, console, drivers, error, fs, heap, info, keyboard, process};

    #[no_mangle]
    pub extern "C" fn _start() -> ! {
        kernel_main()
    }

    fn kernel_main() -> ! {
        serial::init();
        let _ = console::register_sink(&serial::SERIAL_SINK);
        info!("lux: kernel core starting");

        // The heap precedes everything that allocates; the dispatcher
        // precedes the IDT so IRQ-raised signals always find their table.
        heap::init();
        unsafe {
            idt::init();
            pic::init();
            pit::init();
        }
        ps2::init();

        match drivers::ata::init() {
            Ok(disk) => {
                block::register_system_disk(Arc::new(disk));
                match fs::mount() {
                    Ok(()) => info!("lux: filesystem ready"),
                    Err(e) => error!("lux: mount failed: {}", e),
                }
            }
            Err(e) => error!("lux: no disk: {}", e),
        }

        keyboard::set_layout(keyboard::LayoutId::Us);
        arch::interrupt_enable();
        info!("lux: bring-up complete, {} tasks", process::active_count());

        idle_loop()
    }

    fn idle_loop() -> ! {
        loop {
            // Ctrl-D on the boot console is the poweroff chord while the
            // shell is out of tree.
            if let Some(0x04) = keyboard::poll_char() {
                power::poweroff();
            }
            arch::halt();
        }
    }

    #[cfg(not(test))]
    #[panic_handler]
    fn panic(info: &core::panic::PanicInfo) -> ! {
        error!("panic: {}", info);
        console::flush();
        loop {
            arch::halt();
        }
    }
}

#[cfg(not(target_arch = "x86"))]
fn main() {
    // The kernel binary only exists for the IA-32 target; hosted builds
    // carry the library and its tests.
}
