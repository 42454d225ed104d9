//! Process control blocks
//!
//! One PCB per slot in the fixed process table. The saved register set is
//! the full IA-32 general-purpose file plus EFLAGS; the context-switch
//! boundary routine reads and writes it at these exact offsets, so the
//! layout is `repr(C)` and must not be reordered.

pub type Pid = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Sleeping,
    Stopped,
}

/// EFLAGS bit 1 is fixed; bit 9 is IF. Fresh tasks start with interrupts
/// enabled.
pub const EFLAGS_BASE: u32 = 0x0002;
pub const EFLAGS_IF: u32 = 0x0200;

/// Saved register file. Field order matches the offsets hard-coded in the
/// context-switch assembly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuContext {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
    pub esi: u32,
    pub edi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub eip: u32,
    pub eflags: u32,
}

impl CpuContext {
    pub const fn zeroed() -> Self {
        Self {
            eax: 0,
            ebx: 0,
            ecx: 0,
            edx: 0,
            esi: 0,
            edi: 0,
            ebp: 0,
            esp: 0,
            eip: 0,
            eflags: 0,
        }
    }
}

/// Process control block. `pid == 0` marks the slot free.
pub struct Pcb {
    pub pid: Pid,
    pub state: ProcessState,
    pub context: CpuContext,
    pub stack_base: *mut u8,
    pub stack_size: usize,
    /// Remaining ticks while Sleeping; the timer path counts it down.
    pub wake_time_ticks: u32,
    pub priority: u8,
}

impl Pcb {
    pub const fn free_slot() -> Self {
        Self {
            pid: 0,
            state: ProcessState::Stopped,
            context: CpuContext::zeroed(),
            stack_base: core::ptr::null_mut(),
            stack_size: 0,
            wake_time_ticks: 0,
            priority: 0,
        }
    }

    pub fn is_free(&self) -> bool {
        self.pid == 0
    }
}

/// Copyable task summary for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub state: ProcessState,
    pub stack_size: usize,
    pub priority: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_layout_matches_switch_offsets() {
        assert_eq!(core::mem::size_of::<CpuContext>(), 40);
        let ctx = CpuContext::zeroed();
        let base = &ctx as *const CpuContext as usize;
        assert_eq!(&ctx.eax as *const u32 as usize - base, 0);
        assert_eq!(&ctx.ebp as *const u32 as usize - base, 24);
        assert_eq!(&ctx.esp as *const u32 as usize - base, 28);
        assert_eq!(&ctx.eip as *const u32 as usize - base, 32);
        assert_eq!(&ctx.eflags as *const u32 as usize - base, 36);
    }

    #[test]
    fn free_slot_marker() {
        let slot = Pcb::free_slot();
        assert!(slot.is_free());
        assert_eq!(slot.wake_time_ticks, 0);
    }
}
