//! The agenda merge pipeline.
//!
//! One call takes the user's previous snapshot and a fresh fetch and runs,
//! single-threaded and in order:
//! 1. completion reconciliation ([`reconcile`])
//! 2. priority sort of flexible items ([`compare`])
//! 3. gap filling between calendar events ([`interleave`])
//! 4. manual-reorder adjustment ([`reorder`])
//! 5. dense ordering assignment ([`assign`])
//! 6. grouping for presentation ([`group`])
//!
//! Storage writes happen in steps 1 and 5. They are sequential and not
//! transactional; failures are collected into the [`MergeReport`] instead of
//! aborting, and every write is idempotent so the whole merge can be re-run.

pub mod assign;
pub mod compare;
pub mod group;
pub mod interleave;
pub mod reconcile;
pub mod reorder;

use std::collections::HashSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};

pub use assign::assign_ordering_ids;
pub use compare::{compare_base, stable_sort_by, ItemComparator, MergeContext, PriorityMapping};
pub use group::group_entries;
pub use interleave::{interleave, sort_slots, CalendarSlot};
pub use reconcile::{carry_persisted_state, reconcile_completed, ReconcileOutcome};
pub use reorder::adjust_for_reordered;

use crate::storage::{ItemStore, MergeConfig};
use crate::timeline::{Item, ItemKindTag, TimelineGroup};

/// Which write a problem came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStage {
    Completion,
    Ordering,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ProblemKind {
    /// The store returned an error.
    WriteFailed(String),
    /// No row matched the id; the in-memory result is unaffected.
    RowNotFound,
}

/// A per-item issue encountered while persisting merge results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeProblem {
    pub item_id: String,
    pub stage: MergeStage,
    pub kind: ProblemKind,
}

impl MergeProblem {
    pub fn write_failed(item_id: &str, stage: MergeStage, message: impl Into<String>) -> Self {
        Self {
            item_id: item_id.to_string(),
            stage,
            kind: ProblemKind::WriteFailed(message.into()),
        }
    }

    pub fn row_not_found(item_id: &str, stage: MergeStage) -> Self {
        Self {
            item_id: item_id.to_string(),
            stage,
            kind: ProblemKind::RowNotFound,
        }
    }

    /// Hard failures make a report partial; missing rows do not.
    pub fn is_failure(&self) -> bool {
        matches!(self.kind, ProblemKind::WriteFailed(_))
    }
}

/// Outcome of one merge call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    pub groups: Vec<TimelineGroup>,
    /// Ids detected as completed during reconciliation.
    pub completed: Vec<String>,
    pub problems: Vec<MergeProblem>,
}

impl MergeReport {
    /// True when at least one write failed; the caller may retry the merge.
    pub fn is_partial(&self) -> bool {
        self.problems.iter().any(MergeProblem::is_failure)
    }

    /// Ids whose writes failed, without duplicates, in first-seen order.
    pub fn failed_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.problems
            .iter()
            .filter(|p| p.is_failure())
            .map(|p| p.item_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// All merged items in final order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.groups.iter().flat_map(|g| g.tasks.iter())
    }

    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.tasks.len()).sum()
    }
}

/// Allocations applied to fetched records that arrive without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationDefaults {
    pub message: Duration,
    pub tracked_task: Duration,
    pub calendar_event: Duration,
}

impl Default for AllocationDefaults {
    fn default() -> Self {
        Self {
            message: Duration::minutes(5),
            tracked_task: Duration::hours(1),
            calendar_event: Duration::minutes(30),
        }
    }
}

impl AllocationDefaults {
    fn for_kind(&self, kind: ItemKindTag) -> Duration {
        match kind {
            ItemKindTag::Message => self.message,
            ItemKindTag::TrackedTask => self.tracked_task,
            ItemKindTag::CalendarEvent => self.calendar_event,
        }
    }
}

impl From<&MergeConfig> for AllocationDefaults {
    /// Values that are not a positive, representable number of minutes keep
    /// the built-in default for their kind.
    fn from(config: &MergeConfig) -> Self {
        let fallback = Self::default();
        let minutes = |value: i64, default: Duration| {
            Duration::try_minutes(value)
                .filter(|d| *d > Duration::zero())
                .unwrap_or(default)
        };
        Self {
            message: minutes(config.default_message_minutes, fallback.message),
            tracked_task: minutes(config.default_task_minutes, fallback.tracked_task),
            calendar_event: minutes(config.default_event_minutes, fallback.calendar_event),
        }
    }
}

/// Runs the merge pipeline.
#[derive(Debug, Clone, Default)]
pub struct TimelineMerger {
    defaults: AllocationDefaults,
}

impl TimelineMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: AllocationDefaults) -> Self {
        Self { defaults }
    }

    pub fn from_config(config: &MergeConfig) -> Self {
        Self::with_defaults(AllocationDefaults::from(config))
    }

    /// Load the user's active snapshot from `store`, then [`merge`](Self::merge).
    ///
    /// # Errors
    /// Returns the store's error if the snapshot cannot be read. Nothing has
    /// been written at that point.
    pub fn merge_for_user<S: ItemStore>(
        &self,
        store: &S,
        ctx: &MergeContext,
        user_id: &str,
        fresh: Vec<Item>,
    ) -> Result<MergeReport, S::Error> {
        let previous = store.active_items(user_id)?;
        Ok(self.merge(store, ctx, &previous, fresh))
    }

    /// Merge a fresh fetch against the previous snapshot.
    ///
    /// `fresh` holds flexible items and calendar events alike, in fetch
    /// order. Always returns a result; write problems are listed in the
    /// report.
    pub fn merge<S: ItemStore>(
        &self,
        store: &S,
        ctx: &MergeContext,
        previous: &[Item],
        fresh: Vec<Item>,
    ) -> MergeReport {
        let fresh = self.prepare(fresh);
        let (mut events, mut flexible): (Vec<Item>, Vec<Item>) =
            fresh.into_iter().partition(|item| !item.is_flexible());

        carry_persisted_state(previous, flexible.iter_mut().chain(events.iter_mut()));
        let reconciled = reconcile_completed(store, previous, &mut flexible, &mut events);

        let flexible = ItemComparator::new(ctx).sort(flexible);
        let mut slots: Vec<CalendarSlot> = events
            .into_iter()
            .filter_map(|item| CalendarSlot::from_item(item).ok())
            .collect();
        sort_slots(&mut slots);

        tracing::debug!(
            flexible = flexible.len(),
            events = slots.len(),
            "interleaving timeline"
        );
        let entries = interleave(slots, flexible, ctx.now);
        let mut entries = adjust_for_reordered(entries);

        let mut problems = reconciled.problems;
        problems.extend(assign_ordering_ids(store, &mut entries));

        let report = MergeReport {
            groups: group_entries(entries, ctx.now),
            completed: reconciled.completed,
            problems,
        };
        if report.is_partial() {
            tracing::warn!(failed = report.failed_ids().len(), "merge finished with failed writes");
        }
        report
    }

    /// Drop duplicate ids (first occurrence wins) and fill in missing allocations.
    fn prepare(&self, fresh: Vec<Item>) -> Vec<Item> {
        let mut seen = HashSet::new();
        fresh
            .into_iter()
            .filter(|item| {
                let first = seen.insert(item.id.clone());
                if !first {
                    tracing::warn!(item_id = %item.id, "dropping duplicate fetched item");
                }
                first
            })
            .map(|mut item| {
                if item.is_flexible() && item.time_allocation <= Duration::zero() {
                    item.time_allocation = self.defaults.for_kind(item.kind_tag());
                }
                item
            })
            .collect()
    }
}
