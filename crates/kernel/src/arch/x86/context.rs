//! Context switch boundary
//!
//! One naked routine saves the outgoing task's full general-purpose
//! register set and EFLAGS into its PCB and loads the incoming set. The
//! memory offsets are fixed by `CpuContext`'s `repr(C)` layout; the layout
//! test in `process::task` pins them.
//!
//! The incoming EFLAGS is restored immediately before `ret`, so a task
//! created with IF set resumes with interrupts enabled.

use crate::process::CpuContext;

/// Register save area for the bring-up flow of control, used when the
/// scheduler switches away from the boot stack for the first time.
static mut BOOT_CONTEXT: CpuContext = CpuContext::zeroed();

pub fn boot_context() -> *mut CpuContext {
    core::ptr::addr_of_mut!(BOOT_CONTEXT)
}

/// Save into `prev`, resume from `next`.
///
/// # Safety
///
/// Both pointers must reference live `CpuContext` records; `next` must
/// describe either a context previously saved here or a fresh task seeded
/// by `process::create`. Interrupt state transfers with the saved EFLAGS.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_context(prev: *mut CpuContext, next: *const CpuContext) {
    core::arch::naked_asm!(
        // Save the outgoing register file. eax/ecx are parked on the stack
        // until the PCB pointer is loaded.
        "push eax",
        "mov eax, [esp + 8]", // prev
        "mov [eax + 4], ebx",
        "mov [eax + 8], ecx",
        "mov [eax + 12], edx",
        "mov [eax + 16], esi",
        "mov [eax + 20], edi",
        "mov [eax + 24], ebp",
        "pop ecx", // original eax
        "mov [eax + 0], ecx",
        "mov ecx, [esp]", // return address becomes the saved eip
        "mov [eax + 32], ecx",
        "lea ecx, [esp + 4]", // esp as if this call had returned
        "mov [eax + 28], ecx",
        "pushfd",
        "pop ecx",
        "mov [eax + 36], ecx",
        // Load the incoming register file.
        "mov eax, [esp + 8]", // next
        "mov esp, [eax + 28]",
        "push dword ptr [eax + 32]", // eip
        "push dword ptr [eax + 36]", // eflags
        "mov ebx, [eax + 4]",
        "mov ecx, [eax + 8]",
        "mov edx, [eax + 12]",
        "mov esi, [eax + 16]",
        "mov edi, [eax + 20]",
        "mov ebp, [eax + 24]",
        "mov eax, [eax + 0]",
        "popfd",
        "ret",
    )
}
