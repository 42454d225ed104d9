//! Block layer
//!
//! Sector-addressed device abstraction between luxfs and the drivers. The
//! filesystem funnels every access through the registered system disk; the
//! ATA driver implements the trait on hardware and the RAM mock implements
//! it for tests.

use crate::lib::error::{KernelError, Result};
use alloc::sync::Arc;
use spin::Once;

/// Bytes per sector; fixed across the whole storage stack.
pub const SECTOR_SIZE: usize = 512;

/// Sector-addressed block device. `buf` lengths must be a non-zero multiple
/// of [`SECTOR_SIZE`]; `lba` is 28-bit.
pub trait BlockDevice: Send + Sync {
    fn read_sectors(&self, lba: u32, buf: &mut [u8]) -> Result<()>;

    fn write_sectors(&self, lba: u32, buf: &[u8]) -> Result<()>;

    /// Push device caches to stable storage.
    fn flush(&self) -> Result<()>;

    fn sector_count(&self) -> u32;

    fn name(&self) -> &str;

    fn capacity_bytes(&self) -> u64 {
        self.sector_count() as u64 * SECTOR_SIZE as u64
    }
}

/// Validate a transfer shape against a device; shared by the drivers.
pub fn check_transfer(dev: &dyn BlockDevice, lba: u32, len: usize) -> Result<u32> {
    if len == 0 || len % SECTOR_SIZE != 0 {
        return Err(KernelError::InvalidArgument);
    }
    let sectors = (len / SECTOR_SIZE) as u32;
    if lba.checked_add(sectors).map_or(true, |end| end > dev.sector_count()) {
        return Err(KernelError::Bounds);
    }
    Ok(sectors)
}

static SYSTEM_DISK: Once<Arc<dyn BlockDevice>> = Once::new();

/// Register the boot disk. First registration wins; later calls are
/// ignored so bring-up stays idempotent.
pub fn register_system_disk(device: Arc<dyn BlockDevice>) {
    let dev = SYSTEM_DISK.call_once(|| device);
    crate::info!(
        "block: system disk {} ({} sectors)",
        dev.name(),
        dev.sector_count()
    );
}

/// The registered system disk, or `Unavailable` before disk bring-up.
pub fn system_disk() -> Result<Arc<dyn BlockDevice>> {
    SYSTEM_DISK.get().cloned().ok_or(KernelError::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::mock::RamDisk;

    #[test]
    fn transfer_validation() {
        let disk = RamDisk::new("t0", 16);
        assert_eq!(check_transfer(&disk, 0, SECTOR_SIZE).unwrap(), 1);
        assert_eq!(check_transfer(&disk, 14, 2 * SECTOR_SIZE).unwrap(), 2);
        assert_eq!(
            check_transfer(&disk, 0, 100),
            Err(KernelError::InvalidArgument)
        );
        assert_eq!(check_transfer(&disk, 0, 0), Err(KernelError::InvalidArgument));
        assert_eq!(
            check_transfer(&disk, 15, 2 * SECTOR_SIZE),
            Err(KernelError::Bounds)
        );
        assert_eq!(
            check_transfer(&disk, u32::MAX, SECTOR_SIZE),
            Err(KernelError::Bounds)
        );
    }

    #[test]
    fn capacity_math() {
        let disk = RamDisk::new("t1", 4096);
        assert_eq!(disk.capacity_bytes(), 4096 * 512);
    }
}
