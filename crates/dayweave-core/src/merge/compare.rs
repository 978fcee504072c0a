//! Priority ordering over mixed item kinds.
//!
//! Every kind pair has exactly one directional rule, looked up through the
//! `match` in [`ItemComparator::precedes`]. The rules are not guaranteed to be
//! transitive across kinds (established ordering ids can contradict the
//! kind-specific rules), so sorting goes through [`stable_sort_by`] rather than
//! `slice::sort_by`, which may panic on an inconsistent total order.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::timeline::{Item, ItemKind, MessageDetails, TrackedTaskDetails};

/// Priority label -> rank. Lower rank means more important.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityMapping(HashMap<String, i64>);

impl PriorityMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, rank: i64) {
        self.0.insert(label.into(), rank);
    }

    pub fn rank(&self, label: &str) -> Option<i64> {
        self.0.get(label).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for PriorityMapping {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<HashMap<String, i64>> for PriorityMapping {
    fn from(map: HashMap<String, i64>) -> Self {
        Self(map)
    }
}

/// Everything the comparator needs besides the items themselves.
#[derive(Debug, Clone)]
pub struct MergeContext {
    /// Reference instant for due-date windows, gap filling and grouping.
    pub now: DateTime<Utc>,
    /// The user's own mail domain; messages from it outrank outside mail.
    pub user_domain: String,
    pub priorities: PriorityMapping,
    /// Tasks due before `now + due_soon` are treated as urgent.
    pub due_soon: Duration,
}

impl MergeContext {
    pub fn new(now: DateTime<Utc>, user_domain: impl Into<String>) -> Self {
        Self {
            now,
            user_domain: user_domain.into(),
            priorities: PriorityMapping::default(),
            due_soon: Duration::days(7),
        }
    }

    pub fn with_priorities(mut self, priorities: PriorityMapping) -> Self {
        self.priorities = priorities;
        self
    }

    pub fn with_due_soon(mut self, window: Duration) -> Self {
        self.due_soon = window;
        self
    }
}

/// Base rule shared by every kind pair.
///
/// Established positions persist across merges; failing that, items the user
/// placed by hand come before fresh ones. `None` means inconclusive.
pub fn compare_base(a: &Item, b: &Item) -> Option<bool> {
    if a.has_position() && b.has_position() {
        Some(a.ordering_id < b.ordering_id)
    } else if a.has_been_reordered && !b.has_been_reordered {
        Some(true)
    } else if !a.has_been_reordered && b.has_been_reordered {
        Some(false)
    } else {
        None
    }
}

/// Directional "a goes before b" over mixed item kinds.
#[derive(Debug, Clone, Copy)]
pub struct ItemComparator<'a> {
    ctx: &'a MergeContext,
}

impl<'a> ItemComparator<'a> {
    pub fn new(ctx: &'a MergeContext) -> Self {
        Self { ctx }
    }

    pub fn precedes(&self, a: &Item, b: &Item) -> bool {
        if let Some(decided) = compare_base(a, b) {
            return decided;
        }
        match (&a.kind, &b.kind) {
            (ItemKind::Message(x), ItemKind::Message(y)) => self.message_precedes(x, y),
            (ItemKind::TrackedTask(x), ItemKind::TrackedTask(y)) => self.task_precedes(x, y),
            (ItemKind::TrackedTask(_), ItemKind::Message(m)) => !self.is_own_domain(m),
            (ItemKind::Message(m), ItemKind::TrackedTask(_)) => self.is_own_domain(m),
            (ItemKind::CalendarEvent(x), ItemKind::CalendarEvent(y)) => x.start < y.start,
            // events are anchored by time, never ranked against flexible work
            _ => false,
        }
    }

    /// Stable sort of `items` by [`precedes`](Self::precedes).
    pub fn sort(&self, items: Vec<Item>) -> Vec<Item> {
        stable_sort_by(items, &|a: &Item, b: &Item| self.precedes(a, b))
    }

    fn is_own_domain(&self, message: &MessageDetails) -> bool {
        message.sender_domain.eq_ignore_ascii_case(&self.ctx.user_domain)
    }

    fn message_precedes(&self, a: &MessageDetails, b: &MessageDetails) -> bool {
        match (self.is_own_domain(a), self.is_own_domain(b)) {
            (true, false) => true,
            (false, true) => false,
            _ => a.sent_at < b.sent_at,
        }
    }

    fn is_due_soon(&self, task: &TrackedTaskDetails) -> bool {
        // a window reaching past the representable range covers every date
        let horizon = self.ctx.now.checked_add_signed(self.ctx.due_soon);
        task.due_date.is_some_and(|due| horizon.map_or(true, |horizon| due < horizon))
    }

    fn task_precedes(&self, a: &TrackedTaskDetails, b: &TrackedTaskDetails) -> bool {
        match (self.is_due_soon(a), self.is_due_soon(b)) {
            (true, true) => return a.due_date < b.due_date,
            (true, false) => return true,
            (false, true) => return false,
            (false, false) => {}
        }

        let rank_of = |task: &TrackedTaskDetails| {
            task.priority_id
                .as_deref()
                .and_then(|label| self.ctx.priorities.rank(label))
        };
        match (rank_of(a), rank_of(b)) {
            (Some(x), Some(y)) if x != y => x < y,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            _ => a.task_number < b.task_number,
        }
    }
}

/// Stable merge sort driven by a "strictly precedes" predicate.
///
/// An element from the right half is only taken ahead of the left one when
/// it strictly precedes it, so ties keep their input order. Never panics,
/// whatever the predicate answers.
pub fn stable_sort_by<T, F>(mut items: Vec<T>, precedes: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> bool,
{
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = stable_sort_by(items, precedes);
    let right = stable_sort_by(right, precedes);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => precedes(r, l),
            _ => break,
        };
        if take_right {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    merged
}
