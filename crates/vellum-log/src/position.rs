//! Log position allocation with allocation-map slot skipping.

use std::sync::atomic::{AtomicU32, Ordering};

/// Allocation-map geometry of the database file.
///
/// The file is partitioned into AM groups of `page_step` slots. Each
/// group begins with one allocation-map page; the remaining slots form
/// `extend_count` extends of `extend_size` slots each, so
/// `page_step == extend_count * extend_size + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmGeometry {
    /// Slots between consecutive allocation-map pages.
    pub page_step: u32,
    /// Slots per extend.
    pub extend_size: u32,
    /// Extends per AM group.
    pub extend_count: u32,
}

impl AmGeometry {
    /// Default geometry: 8-slot extends, 1024 extends per group.
    pub const DEFAULT: AmGeometry = AmGeometry {
        page_step: 8193,
        extend_size: 8,
        extend_count: 1024,
    };

    /// Returns true when the slot is reserved for an allocation-map page.
    #[inline]
    pub fn is_am_position(&self, position_id: u32) -> bool {
        position_id % self.page_step == 0
    }
}

impl Default for AmGeometry {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Hands out monotonically increasing log slot positions, skipping the
/// reserved allocation-map slots.
///
/// Thread-safe and wait-free: two atomic increments worst case.
pub struct LogPositionAllocator {
    /// Geometry used for AM skipping and initialization.
    geometry: AmGeometry,
    /// Last issued (or seeded) position.
    position: AtomicU32,
}

impl LogPositionAllocator {
    /// Creates an allocator seeded at position 0; call `reset` before use.
    pub fn new(geometry: AmGeometry) -> Self {
        Self {
            geometry,
            position: AtomicU32::new(0),
        }
    }

    /// Computes the counter seed for a log run: one slot below the first
    /// slot of the extend two past the one containing `last_page_id`.
    ///
    /// The two-extend gap reserves room for in-flight growth of the data
    /// region.
    pub fn calc_init_log_position_id(geometry: &AmGeometry, last_page_id: u32) -> u32 {
        let step = geometry.page_step as i64;
        let extend_size = geometry.extend_size as i64;

        let group = last_page_id as i64 / step;
        // Truncating division keeps last_page_id 0 in extend 0.
        let extend = (last_page_id as i64 - 1 - group * step) / extend_size;

        let mut next_extend = extend + 2;
        let mut next_group = group;
        if next_extend >= geometry.extend_count as i64 {
            next_extend -= geometry.extend_count as i64;
            next_group += 1;
        }

        (next_group * step + next_extend * extend_size + 1 - 1) as u32
    }

    /// Reseeds the counter from the current end of the data region.
    pub fn reset(&self, last_page_id: u32) {
        let seed = Self::calc_init_log_position_id(&self.geometry, last_page_id);
        self.position.store(seed, Ordering::Release);
    }

    /// Issues the next log slot position.
    ///
    /// One extra increment per AM boundary crossed; uncontended calls
    /// never take more than two.
    pub fn next(&self) -> u32 {
        let mut next = self.position.fetch_add(1, Ordering::AcqRel) + 1;
        while self.geometry.is_am_position(next) {
            next = self.position.fetch_add(1, Ordering::AcqRel) + 1;
        }
        next
    }

    /// Returns the last issued (or seeded) position.
    pub fn current(&self) -> u32 {
        self.position.load(Ordering::Acquire)
    }

    /// Returns the geometry.
    pub fn geometry(&self) -> AmGeometry {
        self.geometry
    }
}

impl std::fmt::Debug for LogPositionAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogPositionAllocator")
            .field("position", &self.current())
            .field("geometry", &self.geometry)
            .finish()
    }
}
