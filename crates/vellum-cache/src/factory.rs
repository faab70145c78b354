//! Page buffer allocation with free-list reuse.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use vellum_common::page::PageBuffer;

/// Default cap on recycled buffers kept in the free list.
const DEFAULT_FREE_LIMIT: usize = 1024;

/// Memory factory statistics.
#[derive(Debug, Default)]
pub struct MemoryStats {
    /// Buffers allocated fresh from the heap.
    pub pages_allocated: AtomicU64,
    /// Buffers recycled from the free list.
    pub pages_reused: AtomicU64,
    /// Buffers currently owned by callers.
    pub pages_in_use: AtomicU64,
}

/// Allocates and recycles page buffers.
///
/// Every buffer handed out has exactly one owner at any moment; callers
/// return ownership through `deallocate_page`, which feeds the free list.
pub struct MemoryFactory {
    /// Recycled buffers ready for reuse.
    free_list: Mutex<Vec<PageBuffer>>,
    /// Maximum number of buffers retained for reuse.
    free_limit: usize,
    /// Allocation statistics.
    stats: MemoryStats,
}

impl MemoryFactory {
    /// Creates a new memory factory with the default free-list cap.
    pub fn new() -> Self {
        Self::with_free_limit(DEFAULT_FREE_LIMIT)
    }

    /// Creates a memory factory retaining at most `free_limit` buffers.
    pub fn with_free_limit(free_limit: usize) -> Self {
        Self {
            free_list: Mutex::new(Vec::new()),
            free_limit,
            stats: MemoryStats::default(),
        }
    }

    /// Hands out a zeroed page buffer, recycling one when available.
    pub fn allocate_new_page(&self) -> PageBuffer {
        let recycled = self.free_list.lock().pop();

        let page = match recycled {
            Some(mut page) => {
                page.reset();
                self.stats.pages_reused.fetch_add(1, Ordering::Relaxed);
                page
            }
            None => {
                self.stats.pages_allocated.fetch_add(1, Ordering::Relaxed);
                PageBuffer::new()
            }
        };

        self.stats.pages_in_use.fetch_add(1, Ordering::Relaxed);
        page
    }

    /// Takes a buffer back, retaining it for reuse when there is room.
    pub fn deallocate_page(&self, page: PageBuffer) {
        self.stats.pages_in_use.fetch_sub(1, Ordering::Relaxed);

        let mut free_list = self.free_list.lock();
        if free_list.len() < self.free_limit {
            free_list.push(page);
        }
        // Otherwise the buffer drops here.
    }

    /// Returns the number of buffers currently owned by callers.
    pub fn pages_in_use(&self) -> u64 {
        self.stats.pages_in_use.load(Ordering::Relaxed)
    }

    /// Returns allocation statistics.
    pub fn stats(&self) -> &MemoryStats {
        &self.stats
    }
}

impl Default for MemoryFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFactory")
            .field("free_limit", &self.free_limit)
            .field("pages_in_use", &self.pages_in_use())
            .finish()
    }
}
