//! Page memory management for VellumDB.
//!
//! This crate provides:
//! - A memory factory that allocates page buffers and recycles them
//!   through a free list
//! - A bounded page cache mapping file positions to page buffers, with
//!   atomic take semantics and log-region clearing

mod cache;
mod factory;

pub use cache::{CacheConfig, PageCache};
pub use factory::{MemoryFactory, MemoryStats};
