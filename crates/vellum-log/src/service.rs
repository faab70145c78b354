//! Log service: page appends and checkpoint execution.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use vellum_cache::{MemoryFactory, PageCache};
use vellum_common::page::{PageBuffer, PageType};
use vellum_common::Result;
use vellum_disk::DiskService;

use crate::checkpoint::{plan_actions, CheckpointActionType};
use crate::journal::{LogJournal, LogPageHeader};
use crate::position::{AmGeometry, LogPositionAllocator};
use crate::wal_index::WalIndex;

/// Coordinates the log region of the database file.
///
/// Writers append dirty pages through this service; the checkpoint
/// drains confirmed pages back into the data region and resets the
/// in-memory log state. Writers may run in parallel on independent
/// transactions; the caller guarantees checkpoint runs exclusively.
pub struct LogService {
    /// Disk service for the single database file.
    disk: Arc<DiskService>,
    /// Page buffer allocation.
    factory: Arc<MemoryFactory>,
    /// Position-keyed page cache.
    cache: Arc<PageCache>,
    /// Logical page to log position index.
    wal_index: Arc<WalIndex>,
    /// Log slot allocation.
    allocator: LogPositionAllocator,
    /// Pending log page metadata.
    journal: LogJournal,
}

impl LogService {
    /// Creates a log service over the given collaborators.
    pub fn new(
        disk: Arc<DiskService>,
        factory: Arc<MemoryFactory>,
        cache: Arc<PageCache>,
        wal_index: Arc<WalIndex>,
        geometry: AmGeometry,
    ) -> Self {
        Self {
            disk,
            factory,
            cache,
            wal_index,
            allocator: LogPositionAllocator::new(geometry),
            journal: LogJournal::new(),
        }
    }

    /// Seeds the log state from the data region at open time.
    pub fn initialize(&self) {
        let last_page_id = self.disk.last_file_position_id();
        self.journal.set_last_page_id(last_page_id);
        self.allocator.reset(last_page_id);
        debug!(last_page_id, log_position_id = self.allocator.current(), "log initialized");
    }

    /// Maximum page ID ever observed.
    pub fn last_page_id(&self) -> u32 {
        self.journal.last_page_id()
    }

    /// Last issued log position.
    pub fn log_position_id(&self) -> u32 {
        self.allocator.current()
    }

    /// Number of headers pending checkpoint.
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// The WAL index collaborator.
    pub fn wal_index(&self) -> &WalIndex {
        &self.wal_index
    }

    /// Appends a batch of dirty pages to the log region.
    ///
    /// Positions are assigned in input order, the file is pre-extended to
    /// cover the batch, and each header enters the journal only after its
    /// page is on disk.
    pub async fn write_log_pages(&self, pages: &mut [PageBuffer]) -> Result<()> {
        if pages.is_empty() {
            return Ok(());
        }

        let mut last_position = 0u32;
        for page in pages.iter_mut() {
            let position_id = self.allocator.next();
            page.set_position_id(position_id);
            page.set_recovery_position_id(position_id);
            if position_id > last_position {
                last_position = position_id;
            }
        }

        self.disk.ensure_length(last_position).await?;

        for page in pages.iter_mut() {
            let header = LogPageHeader {
                position_id: page.position_id(),
                page_id: page.page_id(),
                transaction_id: page.transaction_id(),
                is_confirmed: page.is_confirmed(),
            };
            self.disk.write_page(page).await?;
            self.journal.append(header);
        }

        Ok(())
    }

    /// Appends empty pages recording logical deletions or resets.
    ///
    /// Fills `wal_dirty_pages` with the `page_id -> position_id` mapping
    /// for the caller's WAL index updates. The caller confirms the
    /// transaction later through its commit batch.
    pub async fn write_empty_log_pages(
        &self,
        page_ids: &[u32],
        transaction_id: u32,
        wal_dirty_pages: &mut HashMap<u32, u32>,
    ) -> Result<()> {
        debug_assert!(wal_dirty_pages.is_empty());

        if page_ids.is_empty() {
            return Ok(());
        }

        let mut last_position = 0u32;
        let mut placements = Vec::with_capacity(page_ids.len());
        for &page_id in page_ids {
            let position_id = self.allocator.next();
            wal_dirty_pages.insert(page_id, position_id);
            placements.push((page_id, position_id));
            if position_id > last_position {
                last_position = position_id;
            }
        }

        self.disk.ensure_length(last_position).await?;

        // One borrowed buffer serves the whole batch.
        let mut page = self.factory.allocate_new_page();
        let result = self
            .write_empty_batch(&mut page, &placements, transaction_id)
            .await;
        self.factory.deallocate_page(page);
        result
    }

    async fn write_empty_batch(
        &self,
        page: &mut PageBuffer,
        placements: &[(u32, u32)],
        transaction_id: u32,
    ) -> Result<()> {
        for &(page_id, position_id) in placements {
            page.reset();
            page.set_page_id(page_id);
            page.set_position_id(position_id);
            page.set_recovery_position_id(position_id);
            page.set_transaction_id(transaction_id);
            page.set_page_type(PageType::Empty);
            page.set_confirmed(false);
            page.set_dirty(true);

            let header = LogPageHeader {
                position_id,
                page_id,
                transaction_id,
                is_confirmed: false,
            };
            self.disk.write_page(page).await?;
            self.journal.append(header);
        }
        Ok(())
    }

    /// Drains the log region into the data region.
    ///
    /// Returns the number of pages landed in the data region. With an
    /// empty journal and `crop` false this is a no-op returning 0. With
    /// `crop` true the file is truncated to the data region afterwards;
    /// otherwise the former log region is zeroed. `add_to_cache` offers
    /// copied pages to the page cache instead of releasing them.
    pub async fn checkpoint(&self, crop: bool, add_to_cache: bool) -> Result<usize> {
        if self.journal.is_empty() && !crop {
            return Ok(0);
        }

        let last_page_id = self.journal.last_page_id();
        let start_temp_position_id = last_page_id.max(self.allocator.current()) + 1;
        let mut temp_pages = Vec::new();

        self.run_checkpoint(start_temp_position_id, &mut temp_pages, crop, add_to_cache)
            .await
    }

    async fn run_checkpoint(
        &self,
        start_temp_position_id: u32,
        temp_pages: &mut Vec<LogPageHeader>,
        crop: bool,
        add_to_cache: bool,
    ) -> Result<usize> {
        let last_page_id = self.journal.last_page_id();
        let (headers, confirmed) = self.journal.snapshot();
        let geometry = self.allocator.geometry();
        let actions = plan_actions(
            &headers,
            &confirmed,
            last_page_id,
            start_temp_position_id,
            &geometry,
            temp_pages,
        );

        debug!(
            pending = headers.len(),
            actions = actions.len(),
            last_page_id,
            crop,
            "checkpoint started"
        );

        let mut counter = 0usize;

        for action in &actions {
            match action.action {
                CheckpointActionType::ClearPage => {
                    if let Some(page) = self.cache.try_remove(action.position_id) {
                        self.factory.deallocate_page(page);
                    }
                    self.disk.write_empty_page(action.position_id).await?;
                }
                CheckpointActionType::CopyToDataFile | CheckpointActionType::CopyToTempFile => {
                    let mut page = match self.cache.try_remove(action.position_id) {
                        Some(page) => page,
                        None => {
                            let mut fresh = self.factory.allocate_new_page();
                            if let Err(err) =
                                self.disk.read_page(&mut fresh, action.position_id).await
                            {
                                self.factory.deallocate_page(fresh);
                                return Err(err);
                            }
                            fresh
                        }
                    };

                    if action.action == CheckpointActionType::CopyToDataFile {
                        page.set_page_id(action.target_position_id);
                        page.set_position_id(action.target_position_id);
                        page.set_recovery_position_id(action.target_position_id);
                        page.set_transaction_id(0);
                        page.set_confirmed(false);
                        page.set_dirty(true);
                        counter += 1;
                    } else {
                        // Temp slots must look authoritative to crash
                        // recovery.
                        page.set_position_id(action.target_position_id);
                        page.set_confirmed(true);
                        page.set_dirty(true);
                    }

                    if let Err(err) = self.disk.write_page(&mut page).await {
                        self.factory.deallocate_page(page);
                        return Err(err);
                    }

                    if action.must_clear {
                        if let Err(err) = self.disk.write_empty_page(action.position_id).await {
                            self.factory.deallocate_page(page);
                            return Err(err);
                        }
                    }

                    // The cache holding the target after a copy means a
                    // stale version survived past its overwrite.
                    if let Some(stale) = self.cache.try_remove(action.target_position_id) {
                        warn!(
                            position_id = action.target_position_id,
                            "cache still held the checkpoint target, dropping stale page"
                        );
                        self.factory.deallocate_page(stale);
                    }

                    if add_to_cache {
                        if let Some(rejected) = self.cache.add_page(page) {
                            self.factory.deallocate_page(rejected);
                        }
                    } else {
                        self.factory.deallocate_page(page);
                    }
                }
            }
        }

        if crop {
            self.disk.set_length(last_page_id).await?;
        } else {
            let last_used_position = match temp_pages.last() {
                Some(temp) => temp.position_id,
                None => last_page_id.max(self.allocator.current()),
            };
            self.disk
                .write_empty_pages(last_page_id + 1, last_used_position)
                .await?;
        }

        self.allocator.reset(last_page_id);
        self.journal.clear();
        self.wal_index.clear();
        self.cache.clear_log_pages(last_page_id);

        debug!(counter, "checkpoint finished");
        Ok(counter)
    }

    /// Releases the in-memory log state. The underlying services are
    /// closed by their owners.
    pub fn close(&self) {
        self.journal.clear();
        self.wal_index.clear();
    }
}

impl std::fmt::Debug for LogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogService")
            .field("last_page_id", &self.last_page_id())
            .field("log_position_id", &self.log_position_id())
            .field("journal_len", &self.journal_len())
            .finish()
    }
}
