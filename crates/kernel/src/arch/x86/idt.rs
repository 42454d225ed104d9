//! Interrupt descriptor table
//!
//! 256 IA-32 interrupt gates. Vectors 0-31 are the CPU exceptions; each
//! logs and parks the CPU. Vectors 0x20-0x2F are the remapped IRQs; the
//! PIC is acknowledged before any handler work on every line.

use super::pic::PIC1_OFFSET;
use lazy_static::lazy_static;

/// Flat code segment selector from the boot GDT.
const KERNEL_CODE_SELECTOR: u16 = 0x08;

/// Present, DPL 0, 32-bit interrupt gate.
const GATE_FLAGS: u8 = 0x8E;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct IdtEntry {
    offset_low: u16,
    selector: u16,
    zero: u8,
    flags: u8,
    offset_high: u16,
}

impl IdtEntry {
    const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            zero: 0,
            flags: 0,
            offset_high: 0,
        }
    }

    fn set(&mut self, handler: u32) {
        self.offset_low = handler as u16;
        self.selector = KERNEL_CODE_SELECTOR;
        self.zero = 0;
        self.flags = GATE_FLAGS;
        self.offset_high = (handler >> 16) as u16;
    }
}

#[repr(C, align(16))]
pub struct Idt {
    entries: [IdtEntry; 256],
}

/// CPU-pushed frame for a plain interrupt.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InterruptStackFrame {
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

/// Exception entry: log the vector and park. Nothing past an exception is
/// recoverable in this kernel.
fn fatal_exception(name: &str, frame: &InterruptStackFrame, error_code: Option<u32>) -> ! {
    match error_code {
        Some(code) => crate::error!(
            "exception: {} (error {:#x}) at {:#x}",
            name,
            code,
            frame.eip
        ),
        None => crate::error!("exception: {} at {:#x}", name, frame.eip),
    }
    loop {
        crate::arch::halt();
    }
}

macro_rules! exception_handler {
    ($fn_name:ident, $name:expr) => {
        extern "x86-interrupt" fn $fn_name(frame: InterruptStackFrame) {
            fatal_exception($name, &frame, None);
        }
    };
}

macro_rules! exception_handler_with_code {
    ($fn_name:ident, $name:expr) => {
        extern "x86-interrupt" fn $fn_name(frame: InterruptStackFrame, error_code: u32) {
            fatal_exception($name, &frame, Some(error_code));
        }
    };
}

exception_handler!(divide_error, "divide error");
exception_handler!(debug_trap, "debug");
exception_handler!(nmi, "non-maskable interrupt");
exception_handler!(breakpoint, "breakpoint");
exception_handler!(overflow, "overflow");
exception_handler!(bound_range, "bound range exceeded");
exception_handler!(invalid_opcode, "invalid opcode");
exception_handler!(device_not_available, "device not available");
exception_handler_with_code!(double_fault, "double fault");
exception_handler!(coprocessor_overrun, "coprocessor segment overrun");
exception_handler_with_code!(invalid_tss, "invalid tss");
exception_handler_with_code!(segment_not_present, "segment not present");
exception_handler_with_code!(stack_segment_fault, "stack segment fault");
exception_handler_with_code!(general_protection, "general protection fault");
exception_handler_with_code!(page_fault, "page fault");
exception_handler!(reserved_15, "reserved");
exception_handler!(fpu_error, "x87 fpu error");
exception_handler_with_code!(alignment_check, "alignment check");
exception_handler!(machine_check, "machine check");
exception_handler!(simd_error, "simd floating point");
exception_handler!(virtualization, "virtualization");
exception_handler!(reserved_other, "reserved");

/// Kernel-side IRQ fan-out. Stubs have already sent EOI.
fn handle_irq(irq: u8) {
    match irq {
        0 => super::pit::handle_irq(),
        1 => super::ps2::handle_irq(),
        _ => {
            // Spurious or unused line: the EOI in the stub is all that is
            // required.
            super::pic::end_of_interrupt(irq);
        }
    }
}

macro_rules! irq_stub {
    ($fn_name:ident, $irq:expr) => {
        extern "x86-interrupt" fn $fn_name(_frame: InterruptStackFrame) {
            // IRQ 0 and 1 acknowledge inside their handlers so the EOI
            // always precedes handler work.
            handle_irq($irq);
        }
    };
}

irq_stub!(irq0, 0);
irq_stub!(irq1, 1);
irq_stub!(irq2, 2);
irq_stub!(irq3, 3);
irq_stub!(irq4, 4);
irq_stub!(irq5, 5);
irq_stub!(irq6, 6);
irq_stub!(irq7, 7);
irq_stub!(irq8, 8);
irq_stub!(irq9, 9);
irq_stub!(irq10, 10);
irq_stub!(irq11, 11);
irq_stub!(irq12, 12);
irq_stub!(irq13, 13);
irq_stub!(irq14, 14);
irq_stub!(irq15, 15);

type PlainHandler = extern "x86-interrupt" fn(InterruptStackFrame);
type CodeHandler = extern "x86-interrupt" fn(InterruptStackFrame, u32);

lazy_static! {
    static ref IDT: Idt = {
        let mut idt = Idt {
            entries: [IdtEntry::missing(); 256],
        };

        let plain: [(usize, PlainHandler); 15] = [
            (0, divide_error),
            (1, debug_trap),
            (2, nmi),
            (3, breakpoint),
            (4, overflow),
            (5, bound_range),
            (6, invalid_opcode),
            (7, device_not_available),
            (9, coprocessor_overrun),
            (15, reserved_15),
            (16, fpu_error),
            (18, machine_check),
            (19, simd_error),
            (20, virtualization),
            (21, reserved_other),
        ];
        for (vector, handler) in plain {
            idt.entries[vector].set(handler as usize as u32);
        }

        let with_code: [(usize, CodeHandler); 7] = [
            (8, double_fault),
            (10, invalid_tss),
            (11, segment_not_present),
            (12, stack_segment_fault),
            (13, general_protection),
            (14, page_fault),
            (17, alignment_check),
        ];
        for (vector, handler) in with_code {
            idt.entries[vector].set(handler as usize as u32);
        }

        // Remaining reserved exception vectors share the generic handler.
        for vector in 22..32 {
            idt.entries[vector].set(reserved_other as usize as u32);
        }

        let irqs: [PlainHandler; 16] = [
            irq0, irq1, irq2, irq3, irq4, irq5, irq6, irq7, irq8, irq9, irq10, irq11, irq12,
            irq13, irq14, irq15,
        ];
        for (line, handler) in irqs.iter().enumerate() {
            idt.entries[PIC1_OFFSET as usize + line].set(*handler as usize as u32);
        }

        idt
    };
}

/// Build and load the IDT.
///
/// # Safety
///
/// Requires the boot GDT (code at 0x08) to be live; call once with
/// interrupts disabled, before the PIC is unmasked.
pub unsafe fn init() {
    let pointer = x86::dtables::DescriptorTablePointer {
        limit: (core::mem::size_of::<Idt>() - 1) as u16,
        base: &*IDT as *const Idt,
    };
    x86::dtables::lidt(&pointer);
    crate::info!("idt: 32 exception vectors, 16 irq vectors loaded");
}
