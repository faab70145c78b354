//! Checkpoint planning.
//!
//! Converts the journal and the confirmed-transaction set into an
//! ordered action list. Every read from a slot is ordered before any
//! write to it; when the dependency graph contains a cycle, a copy into
//! the temp region breaks it. One level of indirection suffices because
//! no slot appears more than once as a winning version.

use std::collections::{BTreeMap, HashSet};

use crate::journal::LogPageHeader;
use crate::position::AmGeometry;

/// What the executor must do with a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointActionType {
    /// Copy the page home into the data region.
    CopyToDataFile,
    /// Relocate the page into the temp region.
    CopyToTempFile,
    /// Overwrite the slot with a zeroed page.
    ClearPage,
}

/// One step of a checkpoint plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointAction {
    /// Step kind.
    pub action: CheckpointActionType,
    /// Source slot (the slot itself for `ClearPage`).
    pub position_id: u32,
    /// Destination slot (0 for `ClearPage`).
    pub target_position_id: u32,
    /// Zero the source slot after the copy so crash recovery cannot
    /// misread a stale header.
    pub must_clear: bool,
}

/// Plans the checkpoint for one log run.
///
/// For each logical page the winning version is the entry with the
/// greatest position among confirmed transactions; entries of
/// unconfirmed transactions and superseded confirmed entries are
/// discarded. Winners are emitted in descending page ID order so that a
/// winning source occupying a smaller target slot is relocated to the
/// temp region before that slot is overwritten. Relocations are appended
/// to `temp_pages`, one slot each from `start_temp_position_id` upward,
/// stepping over reserved allocation-map slots.
pub fn plan_actions(
    headers: &[LogPageHeader],
    confirmed: &HashSet<u32>,
    last_page_id: u32,
    start_temp_position_id: u32,
    geometry: &AmGeometry,
    temp_pages: &mut Vec<LogPageHeader>,
) -> Vec<CheckpointAction> {
    // Winning version of each logical page.
    let mut winners: BTreeMap<u32, LogPageHeader> = BTreeMap::new();
    for header in headers {
        if !confirmed.contains(&header.transaction_id) {
            continue;
        }
        let entry = winners.entry(header.page_id).or_insert(*header);
        if header.position_id > entry.position_id {
            *entry = *header;
        }
    }

    // Winner slots hold live data and are never cleared directly.
    let winner_positions: HashSet<u32> = winners.values().map(|w| w.position_id).collect();

    // Pages needing a copy, keyed to their current source slot. A winner
    // already sitting at its home slot needs no action.
    let mut sources: BTreeMap<u32, u32> = winners
        .iter()
        .filter(|(page_id, w)| w.position_id != **page_id)
        .map(|(page_id, w)| (*page_id, w.position_id))
        .collect();
    let targets: HashSet<u32> = sources.keys().copied().collect();

    let order: Vec<u32> = sources.keys().rev().copied().collect();
    let mut actions = Vec::with_capacity(headers.len());
    let mut next_temp_position = start_temp_position_id;

    for page_id in order {
        // A pending source living in this copy's target slot moves to
        // the temp region first.
        let victim = sources
            .iter()
            .find(|(_, source)| **source == page_id)
            .map(|(victim_page, _)| *victim_page);
        if let Some(victim_page) = victim {
            if geometry.is_am_position(next_temp_position) {
                next_temp_position += 1;
            }
            let temp_position = next_temp_position;
            next_temp_position += 1;
            actions.push(CheckpointAction {
                action: CheckpointActionType::CopyToTempFile,
                position_id: page_id,
                target_position_id: temp_position,
                must_clear: false,
            });
            if let Some(winner) = winners.get(&victim_page) {
                temp_pages.push(LogPageHeader {
                    position_id: temp_position,
                    page_id: victim_page,
                    transaction_id: winner.transaction_id,
                    is_confirmed: true,
                });
            }
            sources.insert(victim_page, temp_position);
        }

        let Some(source) = sources.remove(&page_id) else {
            continue;
        };
        let must_clear = source < start_temp_position_id && !targets.contains(&source);
        actions.push(CheckpointAction {
            action: CheckpointActionType::CopyToDataFile,
            position_id: source,
            target_position_id: page_id,
            must_clear,
        });
    }

    // Slots holding superseded or unconfirmed versions.
    let mut clear_positions: Vec<u32> = headers
        .iter()
        .map(|h| h.position_id)
        .filter(|pos| !winner_positions.contains(pos) && !targets.contains(pos))
        .collect();
    clear_positions.sort_unstable();
    clear_positions.dedup();
    for position_id in clear_positions {
        actions.push(CheckpointAction {
            action: CheckpointActionType::ClearPage,
            position_id,
            target_position_id: 0,
            must_clear: false,
        });
    }

    // Copy targets are home slots, so they never exceed the data region.
    debug_assert!(targets.iter().all(|t| *t <= last_page_id));

    actions
}
