//! Dense ordering assignment.

use super::{MergeProblem, MergeStage};
use crate::storage::{ItemStore, WriteOutcome};
use crate::timeline::TimelineEntry;

/// Stamp `1..=K` onto the entries in list order and persist each value.
///
/// Every entry receives its id in memory even when the write fails, and the
/// walk always reaches the end. Re-running over a partially written list
/// converges because each write sets an absolute value.
pub fn assign_ordering_ids<S: ItemStore>(
    store: &S,
    entries: &mut [TimelineEntry],
) -> Vec<MergeProblem> {
    let mut problems = Vec::new();
    for (position, entry) in entries.iter_mut().enumerate() {
        let ordering_id = position as u32 + 1;
        let item = &mut entry.item;
        item.ordering_id = ordering_id;

        match store.set_ordering_id(&item.id, ordering_id) {
            Ok(WriteOutcome::Applied) => {}
            Ok(WriteOutcome::NotFound) => {
                tracing::warn!(item_id = %item.id, ordering_id, "did not find item to update");
                problems.push(MergeProblem::row_not_found(&item.id, MergeStage::Ordering));
            }
            Err(e) => {
                tracing::error!(
                    item_id = %item.id,
                    ordering_id,
                    error = %e,
                    "failed to update ordering id"
                );
                problems.push(MergeProblem::write_failed(
                    &item.id,
                    MergeStage::Ordering,
                    e.to_string(),
                ));
            }
        }
    }
    tracing::debug!(assigned = entries.len(), problems = problems.len(), "assigned ordering ids");
    problems
}
