//! Logical page to log position index.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Maps each logical page ID to its latest position in the log region.
///
/// Readers consult this index to find the newest version of a page
/// before falling back to the data region. The checkpoint clears it
/// wholesale once the log has been drained.
pub struct WalIndex {
    entries: RwLock<HashMap<u32, u32>>,
}

impl WalIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Records the latest log position of a page.
    pub fn insert(&self, page_id: u32, position_id: u32) {
        self.entries.write().insert(page_id, position_id);
    }

    /// Returns the current log position of a page, if any.
    pub fn get_page_position(&self, page_id: u32) -> Option<u32> {
        self.entries.read().get(&page_id).copied()
    }

    /// Number of indexed pages.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for WalIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalIndex").field("len", &self.len()).finish()
    }
}
