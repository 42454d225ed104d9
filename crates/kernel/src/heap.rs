//! Kernel heap
//!
//! First-fit allocator over a single fixed arena. Blocks carry an in-band
//! header forming a doubly linked list; allocation splits oversized blocks
//! and freeing coalesces with both neighbours, so adjacent free blocks never
//! coexist at rest. Payloads are 8-byte aligned. The kernel singleton binds
//! the allocator to a static 64 KiB arena and backs `#[global_allocator]`
//! on the freestanding target; every dynamic allocation in the kernel lands
//! here.
//!
//! Raw block headers never escape this module; the public surface deals in
//! opaque payload pointers only.

use core::mem;
use core::ptr;
use spin::Mutex;

/// Alignment of every returned payload; request sizes round up to this.
pub const MIN_ALIGN: usize = 8;

/// Size of the kernel arena.
pub const KERNEL_HEAP_SIZE: usize = 64 * 1024;

#[repr(C)]
struct BlockHeader {
    /// Payload bytes directly after this header.
    size: usize,
    prev: *mut BlockHeader,
    next: *mut BlockHeader,
    free: bool,
}

/// Header footprint, rounded so payloads stay aligned.
const fn header_size() -> usize {
    (mem::size_of::<BlockHeader>() + MIN_ALIGN - 1) & !(MIN_ALIGN - 1)
}

const fn align_up(value: usize) -> usize {
    (value + MIN_ALIGN - 1) & !(MIN_ALIGN - 1)
}

/// Allocator statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    /// Arena size in bytes.
    pub total: usize,
    /// Sum of used payload bytes.
    pub used: usize,
    /// Sum of free payload bytes.
    pub free: usize,
    /// Largest single free payload.
    pub largest_free: usize,
    /// Live allocations.
    pub allocations: usize,
    /// Free blocks on the list.
    pub free_blocks: usize,
}

/// First-fit free-list allocator over one arena.
pub struct Heap {
    start: *mut u8,
    len: usize,
    head: *mut BlockHeader,
    live_allocations: usize,
    initialized: bool,
}

// All mutation goes through the owning Mutex; the raw pointers reference the
// arena handed to init().
unsafe impl Send for Heap {}

impl Heap {
    pub const fn empty() -> Self {
        Self {
            start: ptr::null_mut(),
            len: 0,
            head: ptr::null_mut(),
            live_allocations: 0,
            initialized: false,
        }
    }

    /// Bind the allocator to an arena. The arena must be 8-byte aligned,
    /// live for the allocator's lifetime, and not be handed to anything
    /// else.
    pub unsafe fn init(&mut self, start: *mut u8, len: usize) {
        if self.initialized || len < header_size() + MIN_ALIGN {
            return;
        }
        let head = start as *mut BlockHeader;
        (*head).size = len - header_size();
        (*head).prev = ptr::null_mut();
        (*head).next = ptr::null_mut();
        (*head).free = true;
        self.start = start;
        self.len = len;
        self.head = head;
        self.live_allocations = 0;
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn payload(block: *mut BlockHeader) -> *mut u8 {
        (block as usize + header_size()) as *mut u8
    }

    /// First-fit allocation. Returns null on starvation; callers treat that
    /// as fatal at their layer.
    pub fn allocate(&mut self, size: usize) -> *mut u8 {
        if !self.initialized || size == 0 {
            return ptr::null_mut();
        }
        let needed = align_up(size);
        let mut cursor = self.head;
        while !cursor.is_null() {
            unsafe {
                if (*cursor).free && (*cursor).size >= needed {
                    self.split(cursor, needed);
                    (*cursor).free = false;
                    self.live_allocations += 1;
                    return Self::payload(cursor);
                }
                cursor = (*cursor).next;
            }
        }
        ptr::null_mut()
    }

    /// Allocate `count * elem_size` zero-filled bytes. Rejects requests
    /// whose byte count would wrap.
    pub fn zero_allocate(&mut self, count: usize, elem_size: usize) -> *mut u8 {
        let total = match count.checked_mul(elem_size) {
            Some(total) => total,
            None => return ptr::null_mut(),
        };
        let p = self.allocate(total);
        if !p.is_null() {
            unsafe {
                ptr::write_bytes(p, 0, total);
            }
        }
        p
    }

    /// Carve the tail of `block` into a new free block when the residual is
    /// large enough to hold a header plus one aligned payload.
    unsafe fn split(&mut self, block: *mut BlockHeader, needed: usize) {
        let residual = (*block).size - needed;
        if residual < header_size() + MIN_ALIGN {
            return;
        }
        let tail = (Self::payload(block) as usize + needed) as *mut BlockHeader;
        (*tail).size = residual - header_size();
        (*tail).free = true;
        (*tail).prev = block;
        (*tail).next = (*block).next;
        if !(*tail).next.is_null() {
            (*(*tail).next).prev = tail;
        }
        (*block).next = tail;
        (*block).size = needed;
    }

    /// Release a payload pointer. Pointers outside the arena and pointers
    /// not matching a live block are ignored; freeing twice is a no-op.
    pub fn free(&mut self, p: *mut u8) {
        if p.is_null() || !self.initialized {
            return;
        }
        let addr = p as usize;
        let arena = self.start as usize;
        if addr < arena + header_size() || addr >= arena + self.len {
            return;
        }
        // Walk the list rather than trusting pointer arithmetic, so inner
        // and misaligned pointers cannot corrupt the chain.
        let mut cursor = self.head;
        while !cursor.is_null() {
            unsafe {
                if Self::payload(cursor) == p {
                    if (*cursor).free {
                        return;
                    }
                    (*cursor).free = true;
                    self.live_allocations -= 1;
                    self.coalesce(cursor);
                    return;
                }
                cursor = (*cursor).next;
            }
        }
    }

    /// Merge with the next free neighbour, then fold into a free previous
    /// neighbour.
    unsafe fn coalesce(&mut self, block: *mut BlockHeader) {
        let next = (*block).next;
        if !next.is_null() && (*next).free {
            (*block).size += header_size() + (*next).size;
            (*block).next = (*next).next;
            if !(*block).next.is_null() {
                (*(*block).next).prev = block;
            }
        }
        let prev = (*block).prev;
        if !prev.is_null() && (*prev).free {
            (*prev).size += header_size() + (*block).size;
            (*prev).next = (*block).next;
            if !(*prev).next.is_null() {
                (*(*prev).next).prev = prev;
            }
        }
    }

    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            total: self.len,
            used: 0,
            free: 0,
            largest_free: 0,
            allocations: self.live_allocations,
            free_blocks: 0,
        };
        let mut cursor = self.head;
        while !cursor.is_null() {
            unsafe {
                if (*cursor).free {
                    stats.free += (*cursor).size;
                    stats.free_blocks += 1;
                    if (*cursor).size > stats.largest_free {
                        stats.largest_free = (*cursor).size;
                    }
                } else {
                    stats.used += (*cursor).size;
                }
                cursor = (*cursor).next;
            }
        }
        stats
    }
}

#[repr(align(8))]
struct Arena([u8; KERNEL_HEAP_SIZE]);

static mut KERNEL_ARENA: Arena = Arena([0; KERNEL_HEAP_SIZE]);

static KERNEL_HEAP: Mutex<Heap> = Mutex::new(Heap::empty());

/// Bind the kernel heap to its static arena. Idempotent; must precede any
/// allocation.
pub fn init() {
    let mut heap = KERNEL_HEAP.lock();
    if heap.is_initialized() {
        return;
    }
    unsafe {
        let arena = core::ptr::addr_of_mut!(KERNEL_ARENA) as *mut u8;
        heap.init(arena, KERNEL_HEAP_SIZE);
    }
}

pub fn allocate(size: usize) -> *mut u8 {
    KERNEL_HEAP.lock().allocate(size)
}

pub fn zero_allocate(count: usize, elem_size: usize) -> *mut u8 {
    KERNEL_HEAP.lock().zero_allocate(count, elem_size)
}

pub fn free(p: *mut u8) {
    KERNEL_HEAP.lock().free(p)
}

/// Kernel heap statistics. Before `init()` this reports the arena as one
/// virtual free block.
pub fn stats() -> HeapStats {
    let heap = KERNEL_HEAP.lock();
    if !heap.is_initialized() {
        return HeapStats {
            total: KERNEL_HEAP_SIZE,
            used: 0,
            free: KERNEL_HEAP_SIZE - header_size(),
            largest_free: KERNEL_HEAP_SIZE - header_size(),
            allocations: 0,
            free_blocks: 1,
        };
    }
    heap.stats()
}

#[cfg(all(target_arch = "x86", not(test)))]
mod global_alloc {
    use core::alloc::{GlobalAlloc, Layout};

    struct KernelAllocator;

    unsafe impl GlobalAlloc for KernelAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            if layout.align() > super::MIN_ALIGN {
                return core::ptr::null_mut();
            }
            super::allocate(layout.size())
        }

        unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
            super::free(ptr)
        }
    }

    #[global_allocator]
    static GLOBAL: KernelAllocator = KernelAllocator;

    #[alloc_error_handler]
    fn alloc_error(layout: Layout) -> ! {
        crate::error!("heap: allocation of {} bytes failed", layout.size());
        loop {
            crate::arch::halt();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    const HDR: usize = header_size();

    /// u64 backing keeps the arena 8-byte aligned.
    fn with_heap<R>(len: usize, f: impl FnOnce(&mut Heap) -> R) -> R {
        let mut arena: Vec<u64> = vec![0; len / 8];
        let mut heap = Heap::empty();
        unsafe {
            heap.init(arena.as_mut_ptr() as *mut u8, len);
        }
        f(&mut heap)
    }

    /// used + free payload plus every header must cover the arena.
    fn assert_accounting(heap: &Heap, len: usize) {
        let s = heap.stats();
        let blocks = s.free_blocks + s.allocations;
        assert_eq!(s.used + s.free + blocks * HDR, len);
    }

    #[test]
    fn fresh_heap_is_one_free_block() {
        with_heap(4096, |heap| {
            let s = heap.stats();
            assert_eq!(s.free_blocks, 1);
            assert_eq!(s.used, 0);
            assert_eq!(s.free, 4096 - HDR);
            assert_eq!(s.largest_free, s.free);
        });
    }

    #[test]
    fn payloads_are_aligned_and_distinct() {
        with_heap(4096, |heap| {
            let a = heap.allocate(1);
            let b = heap.allocate(13);
            let c = heap.allocate(24);
            for p in [a, b, c] {
                assert!(!p.is_null());
                assert_eq!(p as usize % MIN_ALIGN, 0);
            }
            assert_ne!(a, b);
            assert_ne!(b, c);
            assert_accounting(heap, 4096);
        });
    }

    #[test]
    fn coalesce_out_of_order_frees() {
        with_heap(4096, |heap| {
            let a = heap.allocate(16);
            let b = heap.allocate(16);
            let c = heap.allocate(16);
            heap.free(a);
            heap.free(c);
            heap.free(b);
            let s = heap.stats();
            assert_eq!(s.free_blocks, 1);
            assert_eq!(s.used, 0);
            assert_eq!(s.allocations, 0);
            assert_eq!(s.largest_free, 4096 - HDR);
        });
    }

    #[test]
    fn exact_fit_leaves_no_residual() {
        with_heap(1024, |heap| {
            let s = heap.stats();
            let p = heap.allocate(s.largest_free);
            assert!(!p.is_null());
            let s = heap.stats();
            assert_eq!(s.free_blocks, 0);
            assert_eq!(s.free, 0);
            assert!(heap.allocate(8).is_null());
            heap.free(p);
            assert_eq!(heap.stats().free_blocks, 1);
        });
    }

    #[test]
    fn double_free_is_a_no_op() {
        with_heap(1024, |heap| {
            let a = heap.allocate(32);
            let b = heap.allocate(32);
            heap.free(a);
            heap.free(a);
            let s = heap.stats();
            assert_eq!(s.allocations, 1);
            heap.free(b);
            assert_eq!(heap.stats().free_blocks, 1);
        });
    }

    #[test]
    fn foreign_and_interior_pointers_are_ignored() {
        with_heap(1024, |heap| {
            let a = heap.allocate(64);
            let mut outside = 0u64;
            heap.free(&mut outside as *mut u64 as *mut u8);
            heap.free(unsafe { a.add(8) });
            let s = heap.stats();
            assert_eq!(s.allocations, 1);
            heap.free(a);
            assert_eq!(heap.stats().allocations, 0);
        });
    }

    #[test]
    fn zero_allocate_zeroes_and_guards_overflow() {
        with_heap(1024, |heap| {
            let p = heap.zero_allocate(4, 16);
            assert!(!p.is_null());
            let bytes = unsafe { core::slice::from_raw_parts(p, 64) };
            assert!(bytes.iter().all(|&b| b == 0));
            assert!(heap.zero_allocate(usize::MAX, 2).is_null());
        });
    }

    #[test]
    fn starvation_returns_null_without_corruption() {
        with_heap(512, |heap| {
            let mut held = Vec::new();
            loop {
                let p = heap.allocate(64);
                if p.is_null() {
                    break;
                }
                held.push(p);
            }
            assert!(!held.is_empty());
            for p in held {
                heap.free(p);
            }
            let s = heap.stats();
            assert_eq!(s.free_blocks, 1);
            assert_eq!(s.used, 0);
        });
    }

    #[test]
    fn accounting_invariant_through_mixed_traffic() {
        with_heap(8192, |heap| {
            let mut live = Vec::new();
            for round in 0..6usize {
                for size in [8, 24, 40, 120] {
                    let p = heap.allocate(size + round);
                    if !p.is_null() {
                        live.push(p);
                    }
                }
                if round % 2 == 1 {
                    // Free every other pointer.
                    let mut keep = Vec::new();
                    for (i, p) in live.drain(..).enumerate() {
                        if i % 2 == 0 {
                            heap.free(p);
                        } else {
                            keep.push(p);
                        }
                    }
                    live = keep;
                }
                assert_accounting(heap, 8192);
            }
            for p in live {
                heap.free(p);
            }
            let s = heap.stats();
            assert_eq!(s.used, 0);
            assert_eq!(s.free_blocks, 1);
        });
    }

    #[test]
    fn uninitialized_kernel_heap_reports_virtual_block() {
        // Runs against the module-level singleton only if nothing
        // initialized it yet; both outcomes must be coherent.
        let s = stats();
        assert_eq!(s.total, KERNEL_HEAP_SIZE);
        assert!(s.free_blocks >= 1);
    }
}
