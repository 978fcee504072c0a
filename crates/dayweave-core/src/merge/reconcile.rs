//! Completion detection between two snapshots of a user's items.
//!
//! An item that was active last time but is missing from the fresh fetch was
//! completed in its source system. It is flagged in storage, and the
//! ordering ids of the survivors close ranks so the sequence stays dense
//! until the next assignment pass.

use std::collections::{HashMap, HashSet};

use super::{MergeProblem, MergeStage};
use crate::storage::{ItemStore, WriteOutcome};
use crate::timeline::Item;

/// What the reconciler did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    /// Ids of items detected as completed, in snapshot order.
    pub completed: Vec<String>,
    pub problems: Vec<MergeProblem>,
}

/// Copy stored state onto freshly fetched records.
///
/// Fetchers only know what the source system knows. Position and the
/// manual-reorder flag live in our store, so the snapshot wins for both.
pub fn carry_persisted_state<'a>(previous: &[Item], fresh: impl IntoIterator<Item = &'a mut Item>) {
    let stored: HashMap<&str, &Item> = previous.iter().map(|i| (i.id.as_str(), i)).collect();
    for item in fresh {
        if let Some(known) = stored.get(item.id.as_str()) {
            item.ordering_id = known.ordering_id;
            item.has_been_reordered = known.has_been_reordered;
        }
    }
}

/// Mark vanished items completed and compact the survivors' ordering ids.
///
/// `flexible` and `events` together form the fresh fetch. Write failures are
/// collected, never propagated; compaction happens regardless, because the
/// vanished item is gone from the in-memory set either way.
pub fn reconcile_completed<S: ItemStore>(
    store: &S,
    previous: &[Item],
    flexible: &mut [Item],
    events: &mut [Item],
) -> ReconcileOutcome {
    let vanished: Vec<&Item> = {
        let fresh_ids: HashSet<&str> = flexible
            .iter()
            .chain(events.iter())
            .map(|i| i.id.as_str())
            .collect();
        previous
            .iter()
            .filter(|item| !fresh_ids.contains(item.id.as_str()))
            .collect()
    };

    let mut outcome = ReconcileOutcome::default();
    if vanished.is_empty() {
        return outcome;
    }

    for item in &vanished {
        match store.mark_completed(&item.id) {
            Ok(WriteOutcome::Applied) => {
                tracing::debug!(item_id = %item.id, "marked completed");
            }
            Ok(WriteOutcome::NotFound) => {
                tracing::warn!(item_id = %item.id, "did not find item to mark completed");
                outcome
                    .problems
                    .push(MergeProblem::row_not_found(&item.id, MergeStage::Completion));
            }
            Err(e) => {
                tracing::error!(item_id = %item.id, error = %e, "failed to mark item completed");
                outcome.problems.push(MergeProblem::write_failed(
                    &item.id,
                    MergeStage::Completion,
                    e.to_string(),
                ));
            }
        }
        outcome.completed.push(item.id.clone());
    }

    // Items without a position never held a slot, so they free none. Hand
    // placement can stack several items on one position: it is freed once,
    // and only when no survivor still sits on it.
    let held: HashSet<u32> = flexible
        .iter()
        .chain(events.iter())
        .map(|item| item.ordering_id)
        .collect();
    let mut freed: Vec<u32> = vanished
        .iter()
        .map(|item| item.ordering_id)
        .filter(|&ordering_id| ordering_id > 0 && !held.contains(&ordering_id))
        .collect();
    freed.sort_unstable();
    freed.dedup();

    if !freed.is_empty() {
        for item in flexible.iter_mut().chain(events.iter_mut()) {
            if item.ordering_id == 0 {
                continue;
            }
            let below = freed.partition_point(|&f| f < item.ordering_id) as u32;
            item.ordering_id = item.ordering_id.saturating_sub(below).max(1);
        }
    }

    tracing::debug!(
        completed = outcome.completed.len(),
        freed_positions = freed.len(),
        "reconciled completions"
    );
    outcome
}
