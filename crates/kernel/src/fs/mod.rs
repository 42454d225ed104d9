//! luxfs
//!
//! Compact UNIX-like filesystem over the block layer: one superblock, two
//! single-block allocation bitmaps, a 128-entry inode table, and
//! direct-only data blocks (eight per inode, so files top out at 4096
//! bytes). Metadata writeback is crash-conservative: data blocks are
//! written and bitmaps flushed before the inode that references them.
//!
//! Mounting validates the superblock and formats the region when it is
//! absent or corrupt. Mounting is idempotent. None of this module may be
//! called from IRQ context.

pub mod disk;
pub mod path;

use crate::block::{BlockDevice, SECTOR_SIZE};
use crate::lib::error::{KernelError, Result};
use alloc::sync::Arc;
use disk::{
    Bitmap, DirRecord, Inode, InodeKind, Superblock, BLOCK_BITMAP_BLOCK, DATA_BLOCK_COUNT,
    DATA_START, DIR_RECORD_SIZE, FS_BLOCK_SIZE, FS_START_LBA, FS_TOTAL_SECTORS, INODES_PER_BLOCK,
    INODE_BITMAP_BLOCK, INODE_COUNT, INODE_SIZE, INODE_TABLE_START, INVALID_BLOCK, MAX_FILE_SIZE,
    ROOT_INODE, SUPERBLOCK_BLOCK,
};
use path::Component;
use spin::Mutex;

/// Stat result for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub is_dir: bool,
    pub size: u32,
}

/// One listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: heapless::String<32>,
    pub inode: u32,
    pub is_dir: bool,
    pub size: u32,
}

/// Upper bound on listing length: a full 4096-byte directory holds 113
/// records.
pub const MAX_DIR_ENTRIES: usize = MAX_FILE_SIZE / DIR_RECORD_SIZE + 1;

pub type Listing = heapless::Vec<DirEntry, MAX_DIR_ENTRIES>;

pub struct LuxFs {
    device: Arc<dyn BlockDevice>,
    superblock: Superblock,
    inode_bitmap: Bitmap,
    block_bitmap: Bitmap,
    inodes: [Inode; INODE_COUNT],
}

impl LuxFs {
    /// Mount the region, formatting it when the superblock is absent or
    /// fails validation.
    pub fn mount(device: Arc<dyn BlockDevice>) -> Result<Self> {
        if device.sector_count() < FS_START_LBA + FS_TOTAL_SECTORS {
            crate::error!(
                "luxfs: disk too small ({} sectors)",
                device.sector_count()
            );
            return Err(KernelError::DeviceError);
        }

        let mut block = [0u8; FS_BLOCK_SIZE];
        device.read_sectors(FS_START_LBA + SUPERBLOCK_BLOCK, &mut block)?;
        let superblock = Superblock::decode(&block);
        if !superblock.is_valid() {
            crate::warn!("luxfs: invalid superblock, formatting");
            return Self::format(device);
        }

        let mut fs = Self {
            device,
            superblock,
            inode_bitmap: Bitmap::zeroed(),
            block_bitmap: Bitmap::zeroed(),
            inodes: [Inode::free(); INODE_COUNT],
        };
        fs.read_block(INODE_BITMAP_BLOCK, &mut block)?;
        fs.inode_bitmap = Bitmap::from_block(&block);
        fs.read_block(BLOCK_BITMAP_BLOCK, &mut block)?;
        fs.block_bitmap = Bitmap::from_block(&block);
        for table_block in 0..disk::INODE_TABLE_BLOCKS {
            fs.read_block(INODE_TABLE_START + table_block, &mut block)?;
            for i in 0..INODES_PER_BLOCK {
                let idx = table_block as usize * INODES_PER_BLOCK + i;
                fs.inodes[idx] = Inode::decode(&block[i * INODE_SIZE..])?;
            }
        }
        crate::info!(
            "luxfs: mounted, {}/{} inodes in use",
            fs.inode_bitmap.count_set(INODE_COUNT),
            INODE_COUNT
        );
        Ok(fs)
    }

    /// Write a pristine filesystem: zeroed inode table, root directory at
    /// inode 0 with itself as parent, and both bitmaps.
    fn format(device: Arc<dyn BlockDevice>) -> Result<Self> {
        let mut fs = Self {
            device,
            superblock: Superblock::formatted(),
            inode_bitmap: Bitmap::zeroed(),
            block_bitmap: Bitmap::zeroed(),
            inodes: [Inode::free(); INODE_COUNT],
        };
        fs.inodes[ROOT_INODE as usize] = Inode::new(InodeKind::Dir, ROOT_INODE);
        fs.inode_bitmap.set(ROOT_INODE as usize);

        let mut block = [0u8; FS_BLOCK_SIZE];
        fs.superblock.encode(&mut block);
        fs.write_block(SUPERBLOCK_BLOCK, &block)?;
        fs.flush_inode_bitmap()?;
        fs.flush_block_bitmap()?;
        for table_block in 0..disk::INODE_TABLE_BLOCKS {
            fs.flush_inode_table_block(table_block)?;
        }
        crate::info!("luxfs: formatted {} sectors", FS_TOTAL_SECTORS);
        Ok(fs)
    }

    fn read_block(&self, block: u32, buf: &mut [u8]) -> Result<()> {
        self.device.read_sectors(FS_START_LBA + block, buf)
    }

    fn write_block(&self, block: u32, buf: &[u8]) -> Result<()> {
        self.device.write_sectors(FS_START_LBA + block, buf)
    }

    fn flush_inode_bitmap(&self) -> Result<()> {
        self.write_block(INODE_BITMAP_BLOCK, self.inode_bitmap.as_block())
    }

    fn flush_block_bitmap(&self) -> Result<()> {
        self.write_block(BLOCK_BITMAP_BLOCK, self.block_bitmap.as_block())
    }

    /// Persist the table block containing `idx`.
    fn flush_inode(&self, idx: usize) -> Result<()> {
        self.flush_inode_table_block((idx / INODES_PER_BLOCK) as u32)
    }

    fn flush_inode_table_block(&self, table_block: u32) -> Result<()> {
        let mut block = [0u8; FS_BLOCK_SIZE];
        for i in 0..INODES_PER_BLOCK {
            let idx = table_block as usize * INODES_PER_BLOCK + i;
            self.inodes[idx].encode(&mut block[i * INODE_SIZE..i * INODE_SIZE + INODE_SIZE]);
        }
        self.write_block(INODE_TABLE_START + table_block, &block)
    }

    /// Claim a data block: set the bitmap bit, flush it, zero the block on
    /// disk. Returns the absolute block number.
    fn alloc_block(&mut self) -> Result<u32> {
        let bit = self
            .block_bitmap
            .find_free(DATA_BLOCK_COUNT as usize)
            .ok_or(KernelError::Exhausted)?;
        self.block_bitmap.set(bit);
        self.flush_block_bitmap()?;
        let block = DATA_START + bit as u32;
        let zero = [0u8; FS_BLOCK_SIZE];
        self.write_block(block, &zero)?;
        Ok(block)
    }

    /// Release a data block and flush the bitmap.
    fn free_block(&mut self, block: u32) -> Result<()> {
        if block < DATA_START || block >= DATA_START + DATA_BLOCK_COUNT {
            return Err(KernelError::InvalidArgument);
        }
        self.block_bitmap.clear((block - DATA_START) as usize);
        self.flush_block_bitmap()
    }

    fn alloc_inode(&mut self, kind: InodeKind, parent: u32) -> Result<u32> {
        let idx = self
            .inode_bitmap
            .find_free(INODE_COUNT)
            .ok_or(KernelError::Exhausted)?;
        self.inode_bitmap.set(idx);
        self.inodes[idx] = Inode::new(kind, parent);
        self.flush_inode(idx)?;
        self.flush_inode_bitmap()?;
        Ok(idx as u32)
    }

    /// Release an inode: free its blocks, zero the on-disk record, clear
    /// the bitmap bit, flush inode and bitmap.
    fn free_inode(&mut self, idx: u32) -> Result<()> {
        let inode = self.inodes[idx as usize];
        for block in inode.direct {
            if block != INVALID_BLOCK {
                self.free_block(block)?;
            }
        }
        self.inodes[idx as usize] = Inode::free();
        self.flush_inode(idx as usize)?;
        self.inode_bitmap.clear(idx as usize);
        self.flush_inode_bitmap()
    }

    fn inode(&self, idx: u32) -> Result<&Inode> {
        self.inodes
            .get(idx as usize)
            .filter(|inode| !inode.is_free())
            .ok_or(KernelError::Corrupt)
    }

    /// Copy out of an inode's data blocks through a sector bounce buffer.
    /// The offset clamps to the size; returns bytes actually read.
    fn read_bytes(&self, idx: u32, offset: usize, buf: &mut [u8]) -> Result<usize> {
        let inode = self.inode(idx)?;
        let size = inode.size as usize;
        if offset >= size {
            return Ok(0);
        }
        let total = buf.len().min(size - offset);
        let mut bounce = [0u8; SECTOR_SIZE];
        let mut copied = 0usize;
        while copied < total {
            let pos = offset + copied;
            let block_index = pos / FS_BLOCK_SIZE;
            let within = pos % FS_BLOCK_SIZE;
            let chunk = (FS_BLOCK_SIZE - within).min(total - copied);
            let block = inode.direct[block_index];
            if block == INVALID_BLOCK {
                return Err(KernelError::Corrupt);
            }
            self.read_block(block, &mut bounce)?;
            buf[copied..copied + chunk].copy_from_slice(&bounce[within..within + chunk]);
            copied += chunk;
        }
        Ok(total)
    }

    /// Write-through into an inode: allocate zeroed blocks on demand, write
    /// the data, persist the inode afterwards. Truncation releases every
    /// block first; without it a write past the current size is rejected
    /// as it would leave a hole.
    fn write_bytes(&mut self, idx: u32, offset: usize, data: &[u8], truncate: bool) -> Result<()> {
        if offset
            .checked_add(data.len())
            .map_or(true, |end| end > MAX_FILE_SIZE)
        {
            return Err(KernelError::Bounds);
        }
        let mut inode = *self.inode(idx)?;

        if truncate {
            for block in inode.direct.iter_mut() {
                if *block != INVALID_BLOCK {
                    let b = *block;
                    *block = INVALID_BLOCK;
                    self.free_block(b)?;
                }
            }
            inode.size = 0;
        } else if offset > inode.size as usize {
            return Err(KernelError::InvalidArgument);
        }

        let mut bounce = [0u8; SECTOR_SIZE];
        let mut written = 0usize;
        while written < data.len() {
            let pos = offset + written;
            let block_index = pos / FS_BLOCK_SIZE;
            let within = pos % FS_BLOCK_SIZE;
            let chunk = (FS_BLOCK_SIZE - within).min(data.len() - written);
            if inode.direct[block_index] == INVALID_BLOCK {
                inode.direct[block_index] = self.alloc_block()?;
            }
            let block = inode.direct[block_index];
            if chunk == FS_BLOCK_SIZE {
                self.write_block(block, &data[written..written + chunk])?;
            } else {
                self.read_block(block, &mut bounce)?;
                bounce[within..within + chunk].copy_from_slice(&data[written..written + chunk]);
                self.write_block(block, &bounce)?;
            }
            written += chunk;
        }

        let end = (offset + data.len()) as u32;
        if end > inode.size {
            inode.size = end;
        }
        self.inodes[idx as usize] = inode;
        self.flush_inode(idx as usize)
    }

    /// Scan a directory's records for `name`.
    fn lookup(&self, dir: u32, name: &str) -> Result<Option<u32>> {
        let inode = self.inode(dir)?;
        if inode.kind != InodeKind::Dir {
            return Err(KernelError::TypeMismatch);
        }
        let size = inode.size as usize;
        let mut record = [0u8; DIR_RECORD_SIZE];
        let mut offset = 0;
        while offset + DIR_RECORD_SIZE <= size {
            self.read_bytes(dir, offset, &mut record)?;
            let rec = DirRecord::decode(&record);
            if (rec.inode as usize) < INODE_COUNT && rec.name_matches(name) {
                return Ok(Some(rec.inode));
            }
            offset += DIR_RECORD_SIZE;
        }
        Ok(None)
    }

    /// Append one record; grows the directory across block boundaries,
    /// allocating fresh zero-filled blocks as needed.
    fn dir_append(&mut self, dir: u32, record: DirRecord) -> Result<()> {
        let offset = self.inode(dir)?.size as usize;
        let mut buf = [0u8; DIR_RECORD_SIZE];
        record.encode(&mut buf);
        self.write_bytes(dir, offset, &buf, false)
    }

    /// Drop the record pointing at `target`: the last record fills the
    /// hole, the directory shrinks by one record, and trailing blocks are
    /// released.
    fn dir_remove(&mut self, dir: u32, target: u32) -> Result<()> {
        let size = self.inode(dir)?.size as usize;
        let mut record = [0u8; DIR_RECORD_SIZE];
        let mut found = None;
        let mut offset = 0;
        while offset + DIR_RECORD_SIZE <= size {
            self.read_bytes(dir, offset, &mut record)?;
            if DirRecord::decode(&record).inode == target {
                found = Some(offset);
                break;
            }
            offset += DIR_RECORD_SIZE;
        }
        let hole = found.ok_or(KernelError::NotFound)?;

        let last = size - DIR_RECORD_SIZE;
        if hole != last {
            self.read_bytes(dir, last, &mut record)?;
            let moved = record;
            self.write_bytes(dir, hole, &moved, false)?;
        }

        let mut inode = self.inodes[dir as usize];
        inode.size = last as u32;
        let keep_blocks = (last + FS_BLOCK_SIZE - 1) / FS_BLOCK_SIZE;
        for block_index in keep_blocks..disk::DIRECT_BLOCKS {
            let block = inode.direct[block_index];
            if block != INVALID_BLOCK {
                inode.direct[block_index] = INVALID_BLOCK;
                self.inodes[dir as usize] = inode;
                self.free_block(block)?;
            }
        }
        self.inodes[dir as usize] = inode;
        self.flush_inode(dir as usize)
    }

    /// Walk a component list from the root. `..` steps to the parent
    /// index; the root's parent is the root.
    fn walk(&self, components: &[Component<'_>]) -> Result<u32> {
        let mut current = ROOT_INODE;
        for component in components {
            match component {
                Component::Parent => {
                    current = self.inode(current)?.parent;
                }
                Component::Normal(name) => {
                    current = self
                        .lookup(current, name)?
                        .ok_or(KernelError::NotFound)?;
                }
            }
        }
        Ok(current)
    }

    fn resolve(&self, path: &str) -> Result<u32> {
        self.walk(&path::parse(path)?)
    }

    /// Resolve the parent directory and return it with the leaf name.
    fn resolve_parent<'a>(&self, path: &'a str) -> Result<(u32, &'a str)> {
        let (components, leaf) = path::parse_with_leaf(path)?;
        let dir = self.walk(&components)?;
        if self.inode(dir)?.kind != InodeKind::Dir {
            return Err(KernelError::TypeMismatch);
        }
        Ok((dir, leaf))
    }

    /// `touch`: an existing file is fine, an existing directory is not.
    /// On append failure the freshly allocated inode is rolled back.
    pub fn create_file(&mut self, path: &str) -> Result<()> {
        let (dir, leaf) = self.resolve_parent(path)?;
        if let Some(existing) = self.lookup(dir, leaf)? {
            return match self.inode(existing)?.kind {
                InodeKind::File => Ok(()),
                _ => Err(KernelError::TypeMismatch),
            };
        }
        let record_name = disk::encode_name(leaf)?;
        let idx = self.alloc_inode(InodeKind::File, dir)?;
        let record = DirRecord {
            inode: idx,
            name: record_name,
        };
        if let Err(e) = self.dir_append(dir, record) {
            let _ = self.free_inode(idx);
            return Err(e);
        }
        Ok(())
    }

    /// `mkdir`: the path must not already exist.
    pub fn create_dir(&mut self, path: &str) -> Result<()> {
        let (dir, leaf) = self.resolve_parent(path)?;
        if self.lookup(dir, leaf)?.is_some() {
            return Err(KernelError::InvalidArgument);
        }
        let record_name = disk::encode_name(leaf)?;
        let idx = self.alloc_inode(InodeKind::Dir, dir)?;
        let record = DirRecord {
            inode: idx,
            name: record_name,
        };
        if let Err(e) = self.dir_append(dir, record) {
            let _ = self.free_inode(idx);
            return Err(e);
        }
        Ok(())
    }

    /// Read from a file. Directories are rejected; offsets past the end
    /// read zero bytes.
    pub fn read(&self, path: &str, offset: usize, buf: &mut [u8]) -> Result<usize> {
        let idx = self.resolve(path)?;
        if self.inode(idx)?.kind != InodeKind::File {
            return Err(KernelError::TypeMismatch);
        }
        self.read_bytes(idx, offset, buf)
    }

    /// Write to a file; see `write_bytes` for the hole and bounds rules.
    pub fn write(&mut self, path: &str, offset: usize, data: &[u8], truncate: bool) -> Result<()> {
        let idx = self.resolve(path)?;
        if self.inode(idx)?.kind != InodeKind::File {
            return Err(KernelError::TypeMismatch);
        }
        self.write_bytes(idx, offset, data, truncate)
    }

    /// Remove a file or an empty directory.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let idx = self.resolve(path)?;
        if idx == ROOT_INODE {
            return Err(KernelError::InvalidArgument);
        }
        let inode = *self.inode(idx)?;
        if inode.kind == InodeKind::Dir && inode.size != 0 {
            return Err(KernelError::InvalidArgument);
        }
        self.dir_remove(inode.parent, idx)?;
        self.free_inode(idx)
    }

    pub fn stat(&self, path: &str) -> Result<FileStat> {
        let inode = *self.inode(self.resolve(path)?)?;
        Ok(FileStat {
            is_dir: inode.kind == InodeKind::Dir,
            size: inode.size,
        })
    }

    /// List a directory's live records, or a file as a single entry named
    /// by its basename.
    pub fn list(&self, path: &str) -> Result<Listing> {
        let idx = self.resolve(path)?;
        let inode = *self.inode(idx)?;
        let mut out = Listing::new();

        if inode.kind == InodeKind::File {
            let (_, leaf) = path::parse_with_leaf(path)?;
            let entry = DirEntry {
                name: heapless::String::try_from(leaf)
                    .map_err(|_| KernelError::InvalidArgument)?,
                inode: idx,
                is_dir: false,
                size: inode.size,
            };
            out.push(entry).map_err(|_| KernelError::Exhausted)?;
            return Ok(out);
        }

        let size = inode.size as usize;
        let mut record = [0u8; DIR_RECORD_SIZE];
        let mut offset = 0;
        while offset + DIR_RECORD_SIZE <= size {
            self.read_bytes(idx, offset, &mut record)?;
            offset += DIR_RECORD_SIZE;
            let rec = DirRecord::decode(&record);
            // Skip records whose inode is out of range or freed.
            if rec.inode as usize >= INODE_COUNT {
                continue;
            }
            let target = &self.inodes[rec.inode as usize];
            if target.is_free() {
                continue;
            }
            let entry = DirEntry {
                name: heapless::String::try_from(rec.name_str())
                    .map_err(|_| KernelError::Corrupt)?,
                inode: rec.inode,
                is_dir: target.kind == InodeKind::Dir,
                size: target.size,
            };
            out.push(entry).map_err(|_| KernelError::Exhausted)?;
        }
        Ok(out)
    }

    /// Allocation cross-check used by tests and `fsck`-style reporting:
    /// every reachable inode bit set, every referenced block bit set.
    pub fn check_bitmaps(&self) -> bool {
        for (idx, inode) in self.inodes.iter().enumerate() {
            if inode.is_free() != !self.inode_bitmap.get(idx) {
                return false;
            }
            if inode.is_free() {
                continue;
            }
            for block in inode.direct {
                if block == INVALID_BLOCK {
                    continue;
                }
                if block < DATA_START || block >= DATA_START + DATA_BLOCK_COUNT {
                    return false;
                }
                if !self.block_bitmap.get((block - DATA_START) as usize) {
                    return false;
                }
            }
        }
        true
    }
}

static FILESYSTEM: Mutex<Option<LuxFs>> = Mutex::new(None);

/// Mount the system disk. Idempotent: a second call is a no-op.
pub fn mount() -> Result<()> {
    let mut guard = FILESYSTEM.lock();
    if guard.is_some() {
        return Ok(());
    }
    let device = crate::block::system_disk()?;
    *guard = Some(LuxFs::mount(device)?);
    Ok(())
}

pub fn is_mounted() -> bool {
    FILESYSTEM.lock().is_some()
}

pub(crate) fn with_fs<R>(f: impl FnOnce(&mut LuxFs) -> Result<R>) -> Result<R> {
    let mut guard = FILESYSTEM.lock();
    let fs = guard.as_mut().ok_or(KernelError::Unavailable)?;
    f(fs)
}

pub fn create_file(path: &str) -> Result<()> {
    with_fs(|fs| fs.create_file(path))
}

pub fn create_dir(path: &str) -> Result<()> {
    with_fs(|fs| fs.create_dir(path))
}

pub fn read(path: &str, offset: usize, buf: &mut [u8]) -> Result<usize> {
    with_fs(|fs| fs.read(path, offset, buf))
}

pub fn write(path: &str, offset: usize, data: &[u8], truncate: bool) -> Result<()> {
    with_fs(|fs| fs.write(path, offset, data, truncate))
}

pub fn remove(path: &str) -> Result<()> {
    with_fs(|fs| fs.remove(path))
}

pub fn stat(path: &str) -> Result<FileStat> {
    with_fs(|fs| fs.stat(path))
}

pub fn list(path: &str) -> Result<Listing> {
    with_fs(|fs| fs.list(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::mock::RamDisk;

    const DISK_SECTORS: u32 = FS_START_LBA + FS_TOTAL_SECTORS;

    fn fresh_fs() -> (LuxFs, Arc<RamDisk>) {
        let disk = Arc::new(RamDisk::new("fs", DISK_SECTORS));
        let fs = LuxFs::mount(disk.clone()).unwrap();
        (fs, disk)
    }

    #[test]
    fn mount_formats_empty_disk_with_root_dir() {
        let (fs, _disk) = fresh_fs();
        assert_eq!(fs.inodes[0].kind, InodeKind::Dir);
        assert_eq!(fs.inodes[0].parent, ROOT_INODE);
        assert!(fs.inode_bitmap.get(0));
        assert!(fs.list("/").unwrap().is_empty());
        assert!(fs.check_bitmaps());
    }

    #[test]
    fn mount_rejects_small_disk() {
        let disk = Arc::new(RamDisk::new("small", FS_START_LBA + 16));
        assert_eq!(
            LuxFs::mount(disk).err(),
            Some(KernelError::DeviceError)
        );
    }

    #[test]
    fn remount_preserves_contents() {
        let (mut fs, disk) = fresh_fs();
        fs.create_dir("/d").unwrap();
        fs.create_file("/d/keep").unwrap();
        fs.write("/d/keep", 0, b"persist", true).unwrap();
        drop(fs);

        let fs = LuxFs::mount(disk).unwrap();
        let stat = fs.stat("/d/keep").unwrap();
        assert!(!stat.is_dir);
        assert_eq!(stat.size, 7);
        let mut buf = [0u8; 16];
        assert_eq!(fs.read("/d/keep", 0, &mut buf).unwrap(), 7);
        assert_eq!(&buf[..7], b"persist");
    }

    #[test]
    fn touch_write_read_round_trip() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_file("/a").unwrap();
        fs.write("/a", 0, b"hello", true).unwrap();
        assert_eq!(fs.stat("/a").unwrap().size, 5);

        let mut buf = [0u8; 8];
        let n = fs.read("/a", 0, &mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf[..5], b"hello");
    }

    #[test]
    fn touch_existing_file_is_ok_dir_is_not() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_file("/a").unwrap();
        assert!(fs.create_file("/a").is_ok());
        fs.create_dir("/d").unwrap();
        assert_eq!(fs.create_file("/d"), Err(KernelError::TypeMismatch));
    }

    #[test]
    fn mkdir_requires_fresh_path() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_dir("/d").unwrap();
        assert_eq!(fs.create_dir("/d"), Err(KernelError::InvalidArgument));
        fs.create_file("/f").unwrap();
        assert_eq!(fs.create_dir("/f"), Err(KernelError::InvalidArgument));
    }

    #[test]
    fn mkdir_touch_list_nested() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_dir("/d").unwrap();
        fs.create_file("/d/x").unwrap();

        let listing = fs.list("/d").unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name.as_str(), "x");
        assert!(!listing[0].is_dir);
        assert_eq!(listing[0].size, 0);

        let root = fs.list("/").unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].name.as_str(), "d");
        assert!(root[0].is_dir);
    }

    #[test]
    fn list_file_yields_basename_entry() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_dir("/d").unwrap();
        fs.create_file("/d/note").unwrap();
        fs.write("/d/note", 0, b"abc", true).unwrap();
        let listing = fs.list("/d/note").unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name.as_str(), "note");
        assert_eq!(listing[0].size, 3);
    }

    #[test]
    fn dot_and_dotdot_resolution() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_dir("/d").unwrap();
        fs.create_dir("/d/e").unwrap();
        fs.create_file("/d/e/../f").unwrap();
        assert!(fs.stat("/d/f").is_ok());
        assert!(fs.stat("/d/./f").is_ok());
        // Parent of the root is the root.
        assert!(fs.stat("/../d/f").is_ok());
    }

    #[test]
    fn missing_paths_do_not_resolve() {
        let (fs, _disk) = fresh_fs();
        assert_eq!(fs.stat("/nope"), Err(KernelError::NotFound));
        let mut buf = [0u8; 4];
        assert_eq!(fs.read("/nope", 0, &mut buf), Err(KernelError::NotFound));
    }

    #[test]
    fn directory_reads_and_writes_are_type_errors() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_dir("/d").unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(fs.read("/d", 0, &mut buf), Err(KernelError::TypeMismatch));
        assert_eq!(
            fs.write("/d", 0, b"x", false),
            Err(KernelError::TypeMismatch)
        );
    }

    #[test]
    fn write_bounds_and_hole_rules() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_file("/a").unwrap();
        // offset + len beyond the eight direct blocks
        assert_eq!(
            fs.write("/a", MAX_FILE_SIZE - 2, b"abcd", false),
            Err(KernelError::Bounds)
        );
        // hole: offset past current size without truncate
        assert_eq!(
            fs.write("/a", 10, b"x", false),
            Err(KernelError::InvalidArgument)
        );
        // append at exactly the current size is fine
        fs.write("/a", 0, b"abc", false).unwrap();
        fs.write("/a", 3, b"def", false).unwrap();
        assert_eq!(fs.stat("/a").unwrap().size, 6);
    }

    #[test]
    fn full_size_file_round_trip() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_file("/big").unwrap();
        let data: alloc::vec::Vec<u8> = (0..MAX_FILE_SIZE).map(|i| (i % 251) as u8).collect();
        fs.write("/big", 0, &data, true).unwrap();
        assert_eq!(fs.stat("/big").unwrap().size, MAX_FILE_SIZE as u32);

        let mut back = alloc::vec![0u8; MAX_FILE_SIZE];
        assert_eq!(fs.read("/big", 0, &mut back).unwrap(), MAX_FILE_SIZE);
        assert_eq!(back, data);
        assert!(fs.check_bitmaps());
    }

    #[test]
    fn read_at_size_returns_zero_bytes() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_file("/a").unwrap();
        fs.write("/a", 0, b"xy", true).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(fs.read("/a", 2, &mut buf).unwrap(), 0);
        assert_eq!(fs.read("/a", 100, &mut buf).unwrap(), 0);
    }

    #[test]
    fn truncate_releases_blocks() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_file("/a").unwrap();
        let data = alloc::vec![7u8; 3 * FS_BLOCK_SIZE];
        fs.write("/a", 0, &data, true).unwrap();
        let used_before = fs.block_bitmap.count_set(DATA_BLOCK_COUNT as usize);
        assert_eq!(used_before, 3);

        fs.write("/a", 0, b"tiny", true).unwrap();
        assert_eq!(fs.stat("/a").unwrap().size, 4);
        assert_eq!(fs.block_bitmap.count_set(DATA_BLOCK_COUNT as usize), 1);
        assert!(fs.check_bitmaps());
    }

    #[test]
    fn overwrite_without_truncate_keeps_tail() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_file("/a").unwrap();
        fs.write("/a", 0, b"hello world", true).unwrap();
        fs.write("/a", 0, b"HELLO", false).unwrap();
        let mut buf = [0u8; 16];
        let n = fs.read("/a", 0, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"HELLO world");
    }

    #[test]
    fn directory_size_stays_record_aligned() {
        let (mut fs, _disk) = fresh_fs();
        for name in ["a", "b", "c", "d", "e"] {
            let path = alloc::format!("/{name}");
            fs.create_file(&path).unwrap();
            assert_eq!(fs.stat("/").unwrap().size as usize % DIR_RECORD_SIZE, 0);
        }
        assert_eq!(
            fs.stat("/").unwrap().size as usize,
            5 * DIR_RECORD_SIZE
        );
    }

    #[test]
    fn directory_records_span_block_boundaries() {
        let (mut fs, _disk) = fresh_fs();
        // 15 records * 36 bytes = 540 bytes crosses the first 512-byte block.
        for i in 0..15 {
            let path = alloc::format!("/f{i:02}");
            fs.create_file(&path).unwrap();
        }
        let listing = fs.list("/").unwrap();
        assert_eq!(listing.len(), 15);
        assert!(listing.iter().any(|e| e.name.as_str() == "f14"));
        assert!(fs.check_bitmaps());
    }

    #[test]
    fn remove_file_releases_everything() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_file("/a").unwrap();
        fs.write("/a", 0, &alloc::vec![1u8; 2 * FS_BLOCK_SIZE], true)
            .unwrap();
        fs.remove("/a").unwrap();
        assert_eq!(fs.stat("/a"), Err(KernelError::NotFound));
        assert_eq!(fs.inode_bitmap.count_set(INODE_COUNT), 1); // root only
        // root dir shrank back to empty and released its record block
        assert_eq!(fs.stat("/").unwrap().size, 0);
        assert_eq!(fs.block_bitmap.count_set(DATA_BLOCK_COUNT as usize), 0);
        assert!(fs.check_bitmaps());
    }

    #[test]
    fn remove_middle_entry_compacts_directory() {
        let (mut fs, _disk) = fresh_fs();
        for name in ["a", "b", "c"] {
            fs.create_file(&alloc::format!("/{name}")).unwrap();
        }
        fs.remove("/b").unwrap();
        let entries = fs.list("/").unwrap();
        let names: alloc::vec::Vec<&str> =
            entries.iter().map(|e| e.name.as_str()).collect::<alloc::vec::Vec<_>>();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a"));
        assert!(names.contains(&"c"));
        assert_eq!(fs.stat("/").unwrap().size as usize, 2 * DIR_RECORD_SIZE);
    }

    #[test]
    fn remove_rules_for_directories() {
        let (mut fs, _disk) = fresh_fs();
        fs.create_dir("/d").unwrap();
        fs.create_file("/d/x").unwrap();
        assert_eq!(fs.remove("/d"), Err(KernelError::InvalidArgument));
        fs.remove("/d/x").unwrap();
        fs.remove("/d").unwrap();
        assert_eq!(fs.stat("/d"), Err(KernelError::NotFound));
        assert_eq!(fs.remove("/"), Err(KernelError::InvalidArgument));
    }

    #[test]
    fn inode_exhaustion_reports_and_rolls_back() {
        let (mut fs, _disk) = fresh_fs();
        // Spread files over subdirectories; a single directory tops out at
        // 113 records, well short of the 127 creatable inodes.
        let mut created = 0usize;
        let mut outcome = Ok(());
        'fill: for d in 0..8 {
            outcome = fs.create_dir(&alloc::format!("/d{d}"));
            if outcome.is_err() {
                break;
            }
            created += 1;
            for i in 0..20 {
                outcome = fs.create_file(&alloc::format!("/d{d}/f{i}"));
                if outcome.is_err() {
                    break 'fill;
                }
                created += 1;
            }
        }
        assert_eq!(outcome, Err(KernelError::Exhausted));
        assert_eq!(created, INODE_COUNT - 1);
        assert!(fs.check_bitmaps());
    }

    #[test]
    fn global_mount_is_idempotent() {
        // Without a registered system disk both calls surface Unavailable,
        // never a double-mount panic.
        let first = mount();
        let second = mount();
        assert_eq!(first.is_ok(), second.is_ok());
    }
}
