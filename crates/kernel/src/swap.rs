//! Swap buffer
//!
//! RAM-backed mutable byte buffer with doubling growth, used as the
//! editable staging area between a file on disk and whatever mutates it.
//! `load_path`/`flush_path` bridge to luxfs: load pulls a whole file in,
//! flush writes the buffer back with truncation, creating the file first
//! when it does not exist yet.

use crate::fs::LuxFs;
use crate::lib::error::{KernelError, Result};
use alloc::vec::Vec;

/// Initial capacity; growth doubles from here until the request fits.
const INITIAL_CAPACITY: usize = 512;

pub struct SwapBuffer {
    data: Vec<u8>,
    size: usize,
}

impl SwapBuffer {
    /// Allocate with at least `reserve` bytes of capacity.
    pub fn new(reserve: usize) -> Self {
        let mut buf = Self {
            data: Vec::new(),
            size: 0,
        };
        buf.reserve(reserve.max(INITIAL_CAPACITY));
        buf
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.size]
    }

    /// Drop contents and storage.
    pub fn free(&mut self) {
        self.data = Vec::new();
        self.size = 0;
    }

    /// Grow capacity to at least `new_cap`, doubling from the current
    /// capacity (or the initial 512). Never shrinks.
    pub fn reserve(&mut self, new_cap: usize) {
        if new_cap <= self.data.len() {
            return;
        }
        let mut cap = self.data.len().max(INITIAL_CAPACITY);
        while cap < new_cap {
            cap *= 2;
        }
        self.data.resize(cap, 0);
    }

    /// Write at `offset`, growing capacity and advancing `size` to cover
    /// the written range.
    pub fn write(&mut self, offset: usize, data: &[u8]) {
        let end = offset + data.len();
        self.reserve(end);
        self.data[offset..end].copy_from_slice(data);
        if end > self.size {
            self.size = end;
        }
    }

    pub fn append(&mut self, data: &[u8]) {
        self.write(self.size, data);
    }

    /// Copy out of the buffer; the whole requested range must be inside
    /// the current size.
    pub fn read(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let end = offset
            .checked_add(buf.len())
            .ok_or(KernelError::Bounds)?;
        if end > self.size {
            return Err(KernelError::Bounds);
        }
        buf.copy_from_slice(&self.data[offset..end]);
        Ok(())
    }

    /// Stat + size the buffer + read the whole file.
    pub fn load_path(&mut self, fs: &LuxFs, path: &str) -> Result<()> {
        let stat = fs.stat(path)?;
        if stat.is_dir {
            return Err(KernelError::TypeMismatch);
        }
        let len = stat.size as usize;
        self.free();
        self.reserve(len.max(INITIAL_CAPACITY));
        let n = fs.read(path, 0, &mut self.data[..len])?;
        self.size = n;
        Ok(())
    }

    /// Write the buffer back: create the file when missing, then overwrite
    /// with truncation.
    pub fn flush_path(&self, fs: &mut LuxFs, path: &str) -> Result<()> {
        match fs.stat(path) {
            Err(KernelError::NotFound) => fs.create_file(path)?,
            Err(e) => return Err(e),
            Ok(stat) if stat.is_dir => return Err(KernelError::TypeMismatch),
            Ok(_) => {}
        }
        fs.write(path, 0, self.as_bytes(), true)
    }
}

// Kernel-global swap buffer, bound to the mounted filesystem. Task-context
// only, like every other filesystem consumer.

use spin::Mutex;

static SWAP: Mutex<Option<SwapBuffer>> = Mutex::new(None);

/// (Re)create the global buffer with at least `reserve` bytes of capacity.
pub fn init(reserve: usize) {
    *SWAP.lock() = Some(SwapBuffer::new(reserve));
}

/// Drop the global buffer and its storage.
pub fn free() {
    *SWAP.lock() = None;
}

fn with_swap<R>(f: impl FnOnce(&mut SwapBuffer) -> Result<R>) -> Result<R> {
    let mut guard = SWAP.lock();
    let buf = guard.as_mut().ok_or(KernelError::Unavailable)?;
    f(buf)
}

pub fn size() -> Result<usize> {
    with_swap(|buf| Ok(buf.size()))
}

pub fn write(offset: usize, data: &[u8]) -> Result<()> {
    with_swap(|buf| {
        buf.write(offset, data);
        Ok(())
    })
}

pub fn append(data: &[u8]) -> Result<()> {
    with_swap(|buf| {
        buf.append(data);
        Ok(())
    })
}

pub fn read(offset: usize, out: &mut [u8]) -> Result<()> {
    with_swap(|buf| buf.read(offset, out))
}

/// Replace the global buffer with the contents of `path`.
pub fn load_path(path: &str) -> Result<()> {
    crate::fs::with_fs(|fs| with_swap(|buf| buf.load_path(fs, path)))
}

/// Write the global buffer back to `path`.
pub fn flush_path(path: &str) -> Result<()> {
    crate::fs::with_fs(|fs| with_swap(|buf| buf.flush_path(fs, path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::mock::RamDisk;
    use crate::fs::disk::{FS_START_LBA, FS_TOTAL_SECTORS};
    use alloc::sync::Arc;

    fn fresh_fs() -> LuxFs {
        let disk = Arc::new(RamDisk::new("swap", FS_START_LBA + FS_TOTAL_SECTORS));
        LuxFs::mount(disk).unwrap()
    }

    #[test]
    fn starts_at_initial_capacity() {
        let buf = SwapBuffer::new(0);
        assert_eq!(buf.capacity(), 512);
        assert_eq!(buf.size(), 0);
    }

    #[test]
    fn capacity_doubles_until_request_fits() {
        let mut buf = SwapBuffer::new(0);
        buf.reserve(513);
        assert_eq!(buf.capacity(), 1024);
        buf.reserve(5000);
        assert_eq!(buf.capacity(), 8192);
        // never shrinks
        buf.reserve(10);
        assert_eq!(buf.capacity(), 8192);
    }

    #[test]
    fn write_grows_and_advances_size() {
        let mut buf = SwapBuffer::new(0);
        buf.write(0, b"hello");
        assert_eq!(buf.size(), 5);
        buf.write(600, b"far");
        assert_eq!(buf.size(), 603);
        assert_eq!(buf.capacity(), 1024);
        // the gap reads back as zeros
        let mut gap = [0xFFu8; 4];
        buf.read(5, &mut gap).unwrap();
        assert_eq!(gap, [0, 0, 0, 0]);
    }

    #[test]
    fn append_and_read_round_trip() {
        let mut buf = SwapBuffer::new(16);
        buf.append(b"abc");
        buf.append(b"def");
        let mut out = [0u8; 6];
        buf.read(0, &mut out).unwrap();
        assert_eq!(&out, b"abcdef");
        let mut tail = [0u8; 3];
        buf.read(3, &mut tail).unwrap();
        assert_eq!(&tail, b"def");
    }

    #[test]
    fn read_out_of_bounds_fails() {
        let mut buf = SwapBuffer::new(0);
        buf.append(b"xyz");
        let mut out = [0u8; 4];
        assert_eq!(buf.read(0, &mut out), Err(KernelError::Bounds));
        let mut out = [0u8; 1];
        assert_eq!(buf.read(3, &mut out), Err(KernelError::Bounds));
        assert!(buf.read(2, &mut out).is_ok());
    }

    #[test]
    fn free_releases_storage() {
        let mut buf = SwapBuffer::new(2048);
        buf.append(b"data");
        buf.free();
        assert_eq!(buf.size(), 0);
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn flush_creates_and_load_round_trips() {
        let mut fs = fresh_fs();
        let mut buf = SwapBuffer::new(0);
        buf.append(b"swap contents");
        buf.flush_path(&mut fs, "/swapfile").unwrap();
        assert_eq!(fs.stat("/swapfile").unwrap().size, 13);

        let mut back = SwapBuffer::new(0);
        back.load_path(&fs, "/swapfile").unwrap();
        assert_eq!(back.size(), 13);
        assert_eq!(back.as_bytes(), b"swap contents");
    }

    #[test]
    fn flush_overwrites_with_truncate() {
        let mut fs = fresh_fs();
        let mut buf = SwapBuffer::new(0);
        buf.append(b"a longer first version");
        buf.flush_path(&mut fs, "/f").unwrap();

        let mut shorter = SwapBuffer::new(0);
        shorter.append(b"v2");
        shorter.flush_path(&mut fs, "/f").unwrap();

        assert_eq!(fs.stat("/f").unwrap().size, 2);
        let mut out = [0u8; 8];
        assert_eq!(fs.read("/f", 0, &mut out).unwrap(), 2);
        assert_eq!(&out[..2], b"v2");
    }

    #[test]
    fn load_missing_or_dir_fails() {
        let mut fs = fresh_fs();
        let mut buf = SwapBuffer::new(0);
        assert_eq!(buf.load_path(&fs, "/absent"), Err(KernelError::NotFound));
        fs.create_dir("/d").unwrap();
        assert_eq!(buf.load_path(&fs, "/d"), Err(KernelError::TypeMismatch));
        assert_eq!(
            buf.flush_path(&mut fs, "/d"),
            Err(KernelError::TypeMismatch)
        );
    }

    #[test]
    fn global_buffer_lifecycle() {
        init(0);
        append(b"abc").unwrap();
        assert_eq!(size().unwrap(), 3);
        let mut out = [0u8; 3];
        read(0, &mut out).unwrap();
        assert_eq!(&out, b"abc");
        // No filesystem is mounted under the test harness.
        assert_eq!(load_path("/x"), Err(KernelError::Unavailable));
        free();
        assert_eq!(size(), Err(KernelError::Unavailable));
    }

    #[test]
    fn load_empty_file_is_empty_buffer() {
        let mut fs = fresh_fs();
        fs.create_file("/empty").unwrap();
        let mut buf = SwapBuffer::new(0);
        buf.load_path(&fs, "/empty").unwrap();
        assert_eq!(buf.size(), 0);
    }
}
