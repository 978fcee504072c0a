//! Re-threading of manually reordered items around calendar anchors.
//!
//! The greedy scheduler only knows priorities and gap sizes. An item the user
//! dragged somewhere carries the ordering id it was dropped at; this pass
//! moves it back next to the calendar event that position referred to.
//!
//! Targets are resolved once against the scheduler's output, then the list is
//! rebuilt in a single left-to-right pass that emits each anchor followed by
//! everything attached to it.

use std::collections::HashMap;

use crate::timeline::TimelineEntry;

/// A scheduled entry holding an established position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Anchor {
    index: usize,
    ordering_id: u32,
}

/// Pick the anchor a reordered entry at `index` belongs after, if any.
///
/// Looks first for the highest earlier anchor that still outranks the
/// entry's own position, then for the lowest later anchor the entry's
/// position already exceeds.
fn target_anchor(anchors: &[Anchor], index: usize, own: u32) -> Option<Anchor> {
    let split = anchors.partition_point(|a| a.index < index);
    let (previous, next) = anchors.split_at(split);

    previous
        .iter()
        .filter(|a| a.ordering_id > own)
        .max_by_key(|a| a.ordering_id)
        .or_else(|| {
            next.iter()
                .filter(|a| a.ordering_id < own)
                .min_by_key(|a| a.ordering_id)
        })
        .copied()
}

/// Relocate reordered unscheduled entries next to their calendar anchors.
///
/// Entries that are scheduled, not reordered, or have no recorded position
/// pass through untouched. Several entries attached to the same anchor stack
/// after it in their original relative order.
pub fn adjust_for_reordered(entries: Vec<TimelineEntry>) -> Vec<TimelineEntry> {
    let anchors: Vec<Anchor> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_scheduled() && e.item.has_position())
        .map(|(index, e)| Anchor {
            index,
            ordering_id: e.item.ordering_id,
        })
        .collect();

    let mut attach_after: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut relocated = vec![false; entries.len()];

    if !anchors.is_empty() {
        for (index, entry) in entries.iter().enumerate() {
            let item = &entry.item;
            if entry.is_scheduled() || !item.has_been_reordered || !item.has_position() {
                continue;
            }
            if let Some(anchor) = target_anchor(&anchors, index, item.ordering_id) {
                tracing::debug!(
                    item_id = %item.id,
                    ordering_id = item.ordering_id,
                    anchor_ordering_id = anchor.ordering_id,
                    "relocating reordered item after calendar anchor"
                );
                attach_after.entry(anchor.index).or_default().push(index);
                relocated[index] = true;
            }
        }
    }

    if attach_after.is_empty() {
        return entries;
    }

    let mut pending: Vec<Option<TimelineEntry>> = entries.into_iter().map(Some).collect();
    let mut rebuilt = Vec::with_capacity(pending.len());
    for index in 0..pending.len() {
        if relocated[index] {
            continue;
        }
        if let Some(entry) = pending[index].take() {
            rebuilt.push(entry);
        }
        if let Some(attached) = attach_after.get(&index) {
            rebuilt.extend(attached.iter().filter_map(|&i| pending[i].take()));
        }
    }
    rebuilt
}
