//! In-memory journal of log page metadata.

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;

/// Metadata for one page written to the log region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogPageHeader {
    /// Physical slot the page occupies in the log region.
    pub position_id: u32,
    /// Logical page identity (home slot in the data region).
    pub page_id: u32,
    /// Owning transaction.
    pub transaction_id: u32,
    /// True on the last page of a committed transaction batch.
    pub is_confirmed: bool,
}

/// State guarded by a single short-lived mutex.
struct JournalState {
    /// Transactions whose final page carried the confirmed flag.
    confirmed: HashSet<u32>,
    /// Maximum page ID ever observed, on disk or in the log.
    last_page_id: u32,
}

/// Append-only queue of log page headers, plus the confirmed-transaction
/// set and the highest observed page ID.
///
/// Headers live here between checkpoints and are dropped en masse at
/// checkpoint end.
pub struct LogJournal {
    /// Headers in append order.
    pending: Mutex<VecDeque<LogPageHeader>>,
    /// Confirmed set and last page ID.
    state: Mutex<JournalState>,
}

impl LogJournal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            state: Mutex::new(JournalState {
                confirmed: HashSet::new(),
                last_page_id: 0,
            }),
        }
    }

    /// Appends a header.
    ///
    /// The scalar updates land before the enqueue so any observer of the
    /// queue also sees a consistent `last_page_id` and confirmed set.
    pub fn append(&self, header: LogPageHeader) {
        {
            let mut state = self.state.lock();
            if header.is_confirmed {
                state.confirmed.insert(header.transaction_id);
            }
            if header.page_id > state.last_page_id {
                state.last_page_id = header.page_id;
            }
        }
        self.pending.lock().push_back(header);
    }

    /// Number of headers pending checkpoint.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// True when no headers are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Maximum page ID ever observed.
    pub fn last_page_id(&self) -> u32 {
        self.state.lock().last_page_id
    }

    /// Seeds `last_page_id` from the data region at open time.
    pub fn set_last_page_id(&self, last_page_id: u32) {
        self.state.lock().last_page_id = last_page_id;
    }

    /// True when the transaction committed durably.
    pub fn is_confirmed(&self, transaction_id: u32) -> bool {
        self.state.lock().confirmed.contains(&transaction_id)
    }

    /// Snapshots the pending headers and the confirmed set.
    ///
    /// Checkpoint runs with writers excluded, so the snapshot is the
    /// complete log run.
    pub fn snapshot(&self) -> (Vec<LogPageHeader>, HashSet<u32>) {
        let headers = self.pending.lock().iter().copied().collect();
        let confirmed = self.state.lock().confirmed.clone();
        (headers, confirmed)
    }

    /// Drops all headers and the confirmed set; `last_page_id` survives.
    pub fn clear(&self) {
        self.pending.lock().clear();
        self.state.lock().confirmed.clear();
    }
}

impl Default for LogJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogJournal")
            .field("pending", &self.len())
            .field("last_page_id", &self.last_page_id())
            .finish()
    }
}
