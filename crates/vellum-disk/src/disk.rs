//! Single-file disk service with slot-addressed page I/O.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use vellum_common::page::{PageBuffer, PAGE_SIZE};
use vellum_common::{Result, VellumError};

/// Configuration for the disk service.
#[derive(Debug, Clone)]
pub struct DiskConfig {
    /// Path to the database file.
    pub path: PathBuf,
    /// Enable fsync after each write.
    pub fsync_enabled: bool,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/vellum.db"),
            fsync_enabled: true,
        }
    }
}

/// Disk service statistics.
#[derive(Debug, Default)]
pub struct DiskStats {
    /// Total pages read.
    pub pages_read: AtomicU64,
    /// Total pages written.
    pub pages_written: AtomicU64,
    /// Total zeroed pages written.
    pub empty_pages_written: AtomicU64,
    /// Number of syncs performed.
    pub syncs: AtomicU64,
}

/// Slot-addressed page I/O over the single database file.
///
/// All operations are serialized per file behind an async mutex; callers
/// provide parallelism at the transaction level, not here.
pub struct DiskService {
    /// Configuration.
    config: DiskConfig,
    /// The database file handle.
    file: Mutex<File>,
    /// Highest slot covered by the file length at open time.
    last_file_position_id: u32,
    /// I/O statistics.
    stats: DiskStats,
}

impl DiskService {
    /// Opens (or creates) the database file.
    pub async fn open(config: DiskConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&config.path)
            .await?;

        let file_size = file.metadata().await?.len();
        let last_file_position_id = (file_size / PAGE_SIZE as u64).saturating_sub(1) as u32;

        Ok(Self {
            config,
            file: Mutex::new(file),
            last_file_position_id,
            stats: DiskStats::default(),
        })
    }

    /// Returns the highest slot in the file at open time.
    pub fn last_file_position_id(&self) -> u32 {
        self.last_file_position_id
    }

    /// Grows or shrinks the file to cover exactly the given slot.
    pub async fn set_length(&self, position_id: u32) -> Result<()> {
        let file = self.file.lock().await;
        file.set_len((position_id as u64 + 1) * PAGE_SIZE as u64)
            .await?;
        Ok(())
    }

    /// Grows the file to cover the given slot; never shrinks.
    ///
    /// Writers pre-extend through this so concurrent batches cannot
    /// truncate each other's slots.
    pub async fn ensure_length(&self, position_id: u32) -> Result<()> {
        let file = self.file.lock().await;
        let needed = (position_id as u64 + 1) * PAGE_SIZE as u64;
        if file.metadata().await?.len() < needed {
            file.set_len(needed).await?;
        }
        Ok(())
    }

    /// Reads the page at the given slot into the provided buffer.
    ///
    /// Fails with `PageCorrupted` when the stored checksum does not match
    /// the page contents.
    pub async fn read_page(&self, page: &mut PageBuffer, position_id: u32) -> Result<()> {
        let mut file = self.file.lock().await;

        let file_size = file.metadata().await?.len();
        let offset = position_id as u64 * PAGE_SIZE as u64;
        if offset + PAGE_SIZE as u64 > file_size {
            return Err(VellumError::PositionOutOfBounds {
                position_id,
                last_position_id: (file_size / PAGE_SIZE as u64).saturating_sub(1) as u32,
            });
        }

        file.seek(std::io::SeekFrom::Start(offset)).await?;
        file.read_exact(page.as_bytes_mut()).await?;
        drop(file);

        if !page.verify_checksum() {
            return Err(VellumError::PageCorrupted {
                position_id,
                reason: "checksum mismatch".to_string(),
            });
        }

        self.stats.pages_read.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes a page at its own `position_id`.
    ///
    /// Clears the in-memory dirty flag and stamps the checksum before the
    /// bytes reach disk.
    pub async fn write_page(&self, page: &mut PageBuffer) -> Result<()> {
        page.set_dirty(false);
        page.update_checksum();

        let offset = page.position_id() as u64 * PAGE_SIZE as u64;

        let mut file = self.file.lock().await;
        file.seek(std::io::SeekFrom::Start(offset)).await?;
        file.write_all(page.as_bytes()).await?;
        if self.config.fsync_enabled {
            file.sync_all().await?;
            self.stats.syncs.fetch_add(1, Ordering::Relaxed);
        }
        drop(file);

        self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes a zeroed page at the given slot.
    pub async fn write_empty_page(&self, position_id: u32) -> Result<()> {
        self.write_empty_pages(position_id, position_id).await
    }

    /// Writes zeroed pages at every slot in `from..=to`.
    ///
    /// A range with `from > to` is a no-op.
    pub async fn write_empty_pages(&self, from: u32, to: u32) -> Result<()> {
        if from > to {
            return Ok(());
        }

        let zeros = [0u8; PAGE_SIZE];
        let mut file = self.file.lock().await;
        file.seek(std::io::SeekFrom::Start(from as u64 * PAGE_SIZE as u64))
            .await?;
        for _ in from..=to {
            file.write_all(&zeros).await?;
            self.stats.empty_pages_written.fetch_add(1, Ordering::Relaxed);
        }
        if self.config.fsync_enabled {
            file.sync_all().await?;
            self.stats.syncs.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Flushes pending writes to disk.
    pub async fn sync(&self) -> Result<()> {
        let file = self.file.lock().await;
        file.sync_all().await?;
        self.stats.syncs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns disk statistics.
    pub fn stats(&self) -> &DiskStats {
        &self.stats
    }
}

impl std::fmt::Debug for DiskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskService")
            .field("path", &self.config.path)
            .field("last_file_position_id", &self.last_file_position_id)
            .field(
                "pages_written",
                &self.stats.pages_written.load(Ordering::Relaxed),
            )
            .finish()
    }
}
