//! RAM-backed mock block device
//!
//! Stands in for the ATA disk in host tests: same trait, same transfer
//! validation, plus operation counters so tests can assert writeback
//! behaviour (e.g. that metadata really hits the device).

use crate::block::{check_transfer, BlockDevice, SECTOR_SIZE};
use crate::lib::error::Result;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;

pub struct RamDisk {
    name: String,
    data: Mutex<Vec<u8>>,
    sector_count: u32,
    read_count: AtomicU64,
    write_count: AtomicU64,
    flush_count: AtomicU64,
}

impl RamDisk {
    pub fn new(name: &str, sector_count: u32) -> Self {
        Self {
            name: String::from(name),
            data: Mutex::new(vec![0u8; sector_count as usize * SECTOR_SIZE]),
            sector_count,
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        }
    }

    pub fn read_count(&self) -> u64 {
        self.read_count.load(Ordering::Relaxed)
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::Relaxed)
    }
}

impl BlockDevice for RamDisk {
    fn read_sectors(&self, lba: u32, buf: &mut [u8]) -> Result<()> {
        check_transfer(self, lba, buf.len())?;
        let data = self.data.lock();
        let start = lba as usize * SECTOR_SIZE;
        buf.copy_from_slice(&data[start..start + buf.len()]);
        self.read_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_sectors(&self, lba: u32, buf: &[u8]) -> Result<()> {
        check_transfer(self, lba, buf.len())?;
        let mut data = self.data.lock();
        let start = lba as usize * SECTOR_SIZE;
        data[start..start + buf.len()].copy_from_slice(buf);
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn sector_count(&self) -> u32 {
        self.sector_count
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::error::KernelError;

    #[test]
    fn sector_round_trip() {
        let disk = RamDisk::new("mock0", 8);
        let mut sector = [0u8; SECTOR_SIZE];
        sector[0] = 0xAB;
        sector[511] = 0xCD;
        disk.write_sectors(3, &sector).unwrap();

        let mut back = [0u8; SECTOR_SIZE];
        disk.read_sectors(3, &mut back).unwrap();
        assert_eq!(back[0], 0xAB);
        assert_eq!(back[511], 0xCD);
        assert_eq!(disk.write_count(), 1);
        assert_eq!(disk.read_count(), 1);
    }

    #[test]
    fn multi_sector_transfers() {
        let disk = RamDisk::new("mock1", 8);
        let out: Vec<u8> = (0..2 * SECTOR_SIZE).map(|i| i as u8).collect();
        disk.write_sectors(1, &out).unwrap();
        let mut back = vec![0u8; 2 * SECTOR_SIZE];
        disk.read_sectors(1, &mut back).unwrap();
        assert_eq!(out, back);
    }

    #[test]
    fn rejects_out_of_range() {
        let disk = RamDisk::new("mock2", 2);
        let sector = [0u8; SECTOR_SIZE];
        assert_eq!(disk.write_sectors(2, &sector), Err(KernelError::Bounds));
        let mut buf = [0u8; SECTOR_SIZE];
        assert_eq!(disk.read_sectors(9, &mut buf), Err(KernelError::Bounds));
    }
}
