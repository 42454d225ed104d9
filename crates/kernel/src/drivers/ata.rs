//! ATA-PIO block driver
//!
//! 28-bit LBA, primary channel, master drive only. All transfers are
//! programmed I/O through the task-file registers at 0x1F0-0x1F7 with the
//! alternate status register at 0x3F6 doubling as the 400 ns settle delay.
//! Device interrupts stay disabled (nIEN); every wait is a bounded poll.

use crate::arch::x86::port::Port;
use crate::block::{check_transfer, BlockDevice, SECTOR_SIZE};
use crate::lib::error::{KernelError, Result};
use spin::Mutex;

const PRIMARY_BASE: u16 = 0x1F0;
const PRIMARY_CONTROL: u16 = 0x3F6;

// Status register bits.
const STATUS_BSY: u8 = 0x80;
const STATUS_DF: u8 = 0x20;
const STATUS_DRQ: u8 = 0x08;
const STATUS_ERR: u8 = 0x01;

// Commands.
const CMD_READ_PIO: u8 = 0x20;
const CMD_WRITE_PIO: u8 = 0x30;
const CMD_CACHE_FLUSH: u8 = 0xE7;
const CMD_IDENTIFY: u8 = 0xEC;

/// Device control: disable drive interrupts.
const CONTROL_NIEN: u8 = 0x02;

/// Drive select: master, LBA addressing; low nibble carries LBA 24..27.
const DRIVE_MASTER_LBA: u8 = 0xE0;

const WORDS_PER_SECTOR: usize = SECTOR_SIZE / 2;

/// Largest single command; longer transfers are chunked.
const MAX_CHUNK_SECTORS: u32 = 128;

/// Bound on every status poll.
const WAIT_ITERATIONS: u32 = 1_000_000;

struct AtaController {
    data: Port<u16>,
    feature: Port<u8>,
    sector_count: Port<u8>,
    lba_low: Port<u8>,
    lba_mid: Port<u8>,
    lba_high: Port<u8>,
    drive: Port<u8>,
    command: Port<u8>,
    control: Port<u8>,
}

impl AtaController {
    const fn new(base: u16, control: u16) -> Self {
        Self {
            data: Port::new(base),
            feature: Port::new(base + 1),
            sector_count: Port::new(base + 2),
            lba_low: Port::new(base + 3),
            lba_mid: Port::new(base + 4),
            lba_high: Port::new(base + 5),
            drive: Port::new(base + 6),
            command: Port::new(base + 7),
            control: Port::new(control),
        }
    }

    fn status(&self) -> u8 {
        unsafe { self.command.read() }
    }

    fn alt_status(&self) -> u8 {
        unsafe { self.control.read() }
    }

    /// 400 ns register settle: four alternate-status reads.
    fn settle(&self) {
        for _ in 0..4 {
            let _ = self.alt_status();
        }
    }

    fn wait_bsy_clear(&self) -> Result<()> {
        let mut budget = WAIT_ITERATIONS;
        while self.status() & STATUS_BSY != 0 {
            budget -= 1;
            if budget == 0 {
                return Err(KernelError::DeviceError);
            }
            core::hint::spin_loop();
        }
        Ok(())
    }

    /// Wait for DRQ with ERR/DF early-out.
    fn wait_drq(&self) -> Result<()> {
        let mut budget = WAIT_ITERATIONS;
        loop {
            let status = self.status();
            if status & (STATUS_ERR | STATUS_DF) != 0 {
                return Err(KernelError::DeviceError);
            }
            if status & STATUS_BSY == 0 && status & STATUS_DRQ != 0 {
                return Ok(());
            }
            budget -= 1;
            if budget == 0 {
                return Err(KernelError::DeviceError);
            }
            core::hint::spin_loop();
        }
    }

    /// Program the task file for one chunk. The drive select carries the
    /// current chunk's LBA top nibble every time; nothing is assumed to
    /// survive from the previous chunk.
    fn setup(&self, lba: u32, sectors: u8, cmd: u8) -> Result<()> {
        self.wait_bsy_clear()?;
        unsafe {
            self.drive
                .write(DRIVE_MASTER_LBA | ((lba >> 24) as u8 & 0x0F));
            self.settle();
            self.feature.write(0);
            self.sector_count.write(sectors);
            self.lba_low.write(lba as u8);
            self.lba_mid.write((lba >> 8) as u8);
            self.lba_high.write((lba >> 16) as u8);
            self.command.write(cmd);
        }
        Ok(())
    }

    fn read_chunk(&self, lba: u32, sectors: u32, buf: &mut [u8]) -> Result<()> {
        self.setup(lba, sectors as u8, CMD_READ_PIO)?;
        for sector in 0..sectors as usize {
            self.wait_drq()?;
            let base = sector * SECTOR_SIZE;
            for word in 0..WORDS_PER_SECTOR {
                let value = unsafe { self.data.read() };
                let offset = base + word * 2;
                buf[offset] = value as u8;
                buf[offset + 1] = (value >> 8) as u8;
            }
            self.settle();
        }
        Ok(())
    }

    fn write_chunk(&self, lba: u32, sectors: u32, buf: &[u8]) -> Result<()> {
        self.setup(lba, sectors as u8, CMD_WRITE_PIO)?;
        for sector in 0..sectors as usize {
            self.wait_drq()?;
            let base = sector * SECTOR_SIZE;
            for word in 0..WORDS_PER_SECTOR {
                let offset = base + word * 2;
                let value = buf[offset] as u16 | (buf[offset + 1] as u16) << 8;
                unsafe { self.data.write(value) };
            }
            self.settle();
        }
        self.cache_flush()
    }

    fn cache_flush(&self) -> Result<()> {
        unsafe {
            self.drive.write(DRIVE_MASTER_LBA);
            self.settle();
            self.command.write(CMD_CACHE_FLUSH);
        }
        self.wait_bsy_clear()
    }

    /// IDENTIFY handshake. Returns the 28-bit addressable sector count.
    fn identify(&self) -> Result<u32> {
        unsafe {
            self.control.write(CONTROL_NIEN);
            self.drive.write(DRIVE_MASTER_LBA);
            self.settle();
            self.sector_count.write(0);
            self.lba_low.write(0);
            self.lba_mid.write(0);
            self.lba_high.write(0);
            self.command.write(CMD_IDENTIFY);
        }
        if self.status() == 0 {
            // No device on the channel.
            return Err(KernelError::DeviceError);
        }
        self.wait_bsy_clear()?;
        if self.status() & STATUS_ERR != 0 {
            return Err(KernelError::DeviceError);
        }
        self.wait_drq()?;

        let mut identify = [0u16; WORDS_PER_SECTOR];
        for word in identify.iter_mut() {
            *word = unsafe { self.data.read() };
        }

        // Words 60/61: total addressable sectors, low word first.
        let sectors = identify[60] as u32 | (identify[61] as u32) << 16;
        if sectors == 0 {
            return Err(KernelError::DeviceError);
        }
        Ok(sectors)
    }
}

static CONTROLLER: Mutex<AtaController> =
    Mutex::new(AtaController::new(PRIMARY_BASE, PRIMARY_CONTROL));

/// The primary-master disk as a block device.
pub struct AtaDisk {
    sectors: u32,
}

/// Probe the primary master. Fails with `DeviceError` when absent or when
/// IDENTIFY reports no addressable sectors.
pub fn init() -> Result<AtaDisk> {
    let controller = CONTROLLER.lock();
    let sectors = controller.identify()?;
    crate::info!("ata: primary master, {} sectors", sectors);
    Ok(AtaDisk { sectors })
}

impl BlockDevice for AtaDisk {
    fn read_sectors(&self, lba: u32, buf: &mut [u8]) -> Result<()> {
        let mut remaining = check_transfer(self, lba, buf.len())?;
        let controller = CONTROLLER.lock();
        let mut lba = lba;
        let mut offset = 0usize;
        while remaining > 0 {
            let chunk = remaining.min(MAX_CHUNK_SECTORS);
            let bytes = chunk as usize * SECTOR_SIZE;
            controller.read_chunk(lba, chunk, &mut buf[offset..offset + bytes])?;
            lba += chunk;
            offset += bytes;
            remaining -= chunk;
        }
        Ok(())
    }

    fn write_sectors(&self, lba: u32, buf: &[u8]) -> Result<()> {
        let mut remaining = check_transfer(self, lba, buf.len())?;
        let controller = CONTROLLER.lock();
        let mut lba = lba;
        let mut offset = 0usize;
        while remaining > 0 {
            let chunk = remaining.min(MAX_CHUNK_SECTORS);
            let bytes = chunk as usize * SECTOR_SIZE;
            controller.write_chunk(lba, chunk, &buf[offset..offset + bytes])?;
            lba += chunk;
            offset += bytes;
            remaining -= chunk;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        CONTROLLER.lock().cache_flush()
    }

    fn sector_count(&self) -> u32 {
        self.sectors
    }

    fn name(&self) -> &str {
        "ata0"
    }
}
