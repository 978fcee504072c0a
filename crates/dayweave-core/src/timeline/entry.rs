//! Merged timeline entries and the presentation groups built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::Item;

/// Where the scheduler put an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum Placement {
    /// Pinned to a calendar slot.
    Scheduled {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Flexible work, placed by priority.
    Unscheduled,
}

/// One item on the merged timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub item: Item,
    pub placement: Placement,
}

impl TimelineEntry {
    pub fn scheduled(item: Item, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            item,
            placement: Placement::Scheduled { start, end },
        }
    }

    pub fn unscheduled(item: Item) -> Self {
        Self {
            item,
            placement: Placement::Unscheduled,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self.placement, Placement::Scheduled { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    ScheduledTask,
    UnscheduledGroup,
}

impl GroupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScheduledTask => "scheduled_task",
            Self::UnscheduledGroup => "unscheduled_group",
        }
    }
}

/// A presentation group: one calendar slot, or a run of flexible items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineGroup {
    #[serde(rename = "type")]
    pub kind: GroupKind,
    pub datetime_start: DateTime<Utc>,
    /// Whole seconds.
    pub time_duration: i64,
    pub tasks: Vec<Item>,
}

impl TimelineGroup {
    pub fn is_scheduled(&self) -> bool {
        self.kind == GroupKind::ScheduledTask
    }
}
