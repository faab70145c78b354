//! Log region and checkpoint core for VellumDB.
//!
//! Modified pages are appended to a log region colocated with the data
//! file; a checkpoint later migrates confirmed pages back to their home
//! slots, relocating conflicting sources through a temp region so the
//! log slots can be freed.

pub mod checkpoint;
pub mod journal;
pub mod position;
pub mod service;
pub mod wal_index;

pub use checkpoint::{plan_actions, CheckpointAction, CheckpointActionType};
pub use journal::{LogJournal, LogPageHeader};
pub use position::{AmGeometry, LogPositionAllocator};
pub use service::LogService;
pub use wal_index::WalIndex;
