//! Disk service for VellumDB.
//!
//! All data lives in a single file partitioned into fixed-size slots.
//! This crate provides page-granular reads and writes at slot positions,
//! file length management, and zeroed-page writes for slot clearing.

mod disk;

pub use disk::{DiskConfig, DiskService, DiskStats};
