//! Configuration structures for VellumDB.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration for the database engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the single database file.
    pub db_path: PathBuf,
    /// Enable fsync after page writes.
    pub fsync_enabled: bool,
    /// Maximum number of pages kept in the page cache.
    pub cache_pages: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/vellum.db"),
            fsync_enabled: true,
            cache_pages: 8192, // 64 MB with 8 KiB pages
        }
    }
}

impl StorageConfig {
    /// Returns the total cache size in bytes.
    pub fn cache_size_bytes(&self) -> usize {
        self.cache_pages * crate::page::PAGE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./data/vellum.db"));
        assert!(config.fsync_enabled);
        assert_eq!(config.cache_pages, 8192);
    }

    #[test]
    fn test_cache_size_bytes() {
        let config = StorageConfig::default();
        assert_eq!(config.cache_size_bytes(), 8192 * 8192);
        assert_eq!(config.cache_size_bytes(), 67_108_864); // 64 MB
    }

    #[test]
    fn test_storage_config_custom() {
        let config = StorageConfig {
            db_path: PathBuf::from("/var/lib/vellum/main.db"),
            fsync_enabled: false,
            cache_pages: 1024,
        };

        assert_eq!(config.db_path, PathBuf::from("/var/lib/vellum/main.db"));
        assert!(!config.fsync_enabled);
        assert_eq!(config.cache_size_bytes(), 1024 * 8192);
    }

    #[test]
    fn test_storage_config_serde_roundtrip() {
        let original = StorageConfig::default();
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: StorageConfig = serde_json::from_str(&serialized).unwrap();

        assert_eq!(original.db_path, deserialized.db_path);
        assert_eq!(original.fsync_enabled, deserialized.fsync_enabled);
        assert_eq!(original.cache_pages, deserialized.cache_pages);
    }
}
