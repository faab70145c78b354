//! Bounded page cache keyed by file position.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sysinfo::System;

use vellum_common::page::{PageBuffer, PAGE_SIZE};

use crate::factory::MemoryFactory;

/// Configuration for the page cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of pages held.
    pub max_pages: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_pages: 8192 }
    }
}

/// Bounded map from file position to page buffer.
///
/// The cache owns its buffers. `try_remove` transfers ownership out,
/// `add_page` transfers ownership in (handing the buffer back when
/// refused), and clearing paths return buffers to the memory factory.
pub struct PageCache {
    /// Configuration.
    config: CacheConfig,
    /// Factory that receives buffers dropped by clearing paths.
    factory: Arc<MemoryFactory>,
    /// Cached pages by position.
    pages: Mutex<HashMap<u32, PageBuffer>>,
}

impl PageCache {
    /// Creates a new page cache.
    pub fn new(config: CacheConfig, factory: Arc<MemoryFactory>) -> Self {
        Self {
            config,
            factory,
            pages: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a page cache sized to 25% of available system RAM.
    ///
    /// Minimum 1,000 pages so caching stays useful on low-memory systems.
    pub fn auto_sized(factory: Arc<MemoryFactory>) -> Self {
        let mut sys = System::new_all();
        sys.refresh_memory();

        let available_bytes = sys.available_memory() as usize;
        let target_bytes = available_bytes / 4;
        let max_pages = (target_bytes / PAGE_SIZE).max(1_000);

        Self::new(CacheConfig { max_pages }, factory)
    }

    /// Returns the maximum number of pages the cache can hold.
    pub fn max_pages(&self) -> usize {
        self.config.max_pages
    }

    /// Returns the number of pages currently cached.
    pub fn len(&self) -> usize {
        self.pages.lock().len()
    }

    /// Returns true when the cache holds no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.lock().is_empty()
    }

    /// Returns true when a page is cached at the given position.
    pub fn contains(&self, position_id: u32) -> bool {
        self.pages.lock().contains_key(&position_id)
    }

    /// Atomically takes the page at the given position, if cached.
    pub fn try_remove(&self, position_id: u32) -> Option<PageBuffer> {
        self.pages.lock().remove(&position_id)
    }

    /// Inserts a page keyed by its own `position_id`.
    ///
    /// Returns `None` when accepted. Hands the page back when the cache
    /// is full or the slot is already occupied.
    pub fn add_page(&self, page: PageBuffer) -> Option<PageBuffer> {
        let mut pages = self.pages.lock();

        if pages.len() >= self.config.max_pages || pages.contains_key(&page.position_id()) {
            return Some(page);
        }

        pages.insert(page.position_id(), page);
        None
    }

    /// Drops every cached page with a position in the log region
    /// (position > `last_page_id`), returning buffers to the factory.
    ///
    /// Returns the number of pages dropped.
    pub fn clear_log_pages(&self, last_page_id: u32) -> usize {
        let mut pages = self.pages.lock();
        let log_positions: Vec<u32> = pages
            .keys()
            .copied()
            .filter(|&pos| pos > last_page_id)
            .collect();

        for position_id in &log_positions {
            if let Some(page) = pages.remove(position_id) {
                self.factory.deallocate_page(page);
            }
        }
        log_positions.len()
    }

    /// Drops every cached page, returning buffers to the factory.
    pub fn clear(&self) -> usize {
        let mut pages = self.pages.lock();
        let count = pages.len();
        for (_, page) in pages.drain() {
            self.factory.deallocate_page(page);
        }
        count
    }
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("max_pages", &self.config.max_pages)
            .field("len", &self.len())
            .finish()
    }
}
