// Device drivers. The ATA driver only exists on the IA-32 target; the RAM
// mock backs the storage stack under the host test harness.

#[cfg(target_arch = "x86")]
pub mod ata;
pub mod mock;
