//! Folding the ordered timeline into presentation groups.

use chrono::{DateTime, Duration, Utc};

use crate::timeline::{GroupKind, Item, Placement, TimelineEntry, TimelineGroup};

/// Group a fully ordered timeline.
///
/// Each scheduled entry becomes its own group. Consecutive unscheduled
/// entries share one group that starts where the previous scheduled group
/// ended (or at `now`) and lasts until the next scheduled group starts; a
/// trailing run lasts as long as its members' allocations add up to.
pub fn group_entries(entries: Vec<TimelineEntry>, now: DateTime<Utc>) -> Vec<TimelineGroup> {
    let mut groups = Vec::new();
    let mut last_end = now;
    let mut run: Vec<Item> = Vec::new();

    for entry in entries {
        match entry.placement {
            Placement::Unscheduled => run.push(entry.item),
            Placement::Scheduled { start, end } => {
                if !run.is_empty() {
                    groups.push(TimelineGroup {
                        kind: GroupKind::UnscheduledGroup,
                        datetime_start: last_end,
                        time_duration: (start - last_end).num_seconds(),
                        tasks: std::mem::take(&mut run),
                    });
                }
                groups.push(TimelineGroup {
                    kind: GroupKind::ScheduledTask,
                    datetime_start: start,
                    time_duration: (end - start).num_seconds(),
                    tasks: vec![entry.item],
                });
                last_end = end;
            }
        }
    }

    if !run.is_empty() {
        let total = run
            .iter()
            .fold(Duration::zero(), |acc, item| acc + item.time_allocation);
        groups.push(TimelineGroup {
            kind: GroupKind::UnscheduledGroup,
            datetime_start: last_end,
            time_duration: total.num_seconds(),
            tasks: run,
        });
    }

    groups
}
