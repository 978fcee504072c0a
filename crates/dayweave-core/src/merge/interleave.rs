//! Greedy placement of flexible work into the gaps between calendar events.
//!
//! Walks events in start order with a time cursor that begins at "now".
//! Before each event, flexible items are taken in priority order for as long
//! as the next one still fits in what is left of the gap. An item that does
//! not fit stays at the head of the queue for the next, possibly larger,
//! gap or for the tail of the day.

use chrono::{DateTime, Utc};

use crate::timeline::{EventWindow, Item, TimelineEntry};

/// A calendar event together with its fixed window.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarSlot {
    pub window: EventWindow,
    pub item: Item,
}

impl CalendarSlot {
    /// Wrap a calendar event; hands the item back if it is not one.
    pub fn from_item(item: Item) -> Result<Self, Item> {
        match item.event_window().copied() {
            Some(window) => Ok(Self { window, item }),
            None => Err(item),
        }
    }
}

/// Stable sort by start instant; events starting together keep fetch order.
pub fn sort_slots(slots: &mut [CalendarSlot]) {
    slots.sort_by_key(|slot| slot.window.start);
}

/// Interleave priority-ordered flexible items with time-ordered events.
///
/// `slots` must already be sorted by start (see [`sort_slots`]).
pub fn interleave(
    slots: Vec<CalendarSlot>,
    flexible: Vec<Item>,
    now: DateTime<Utc>,
) -> Vec<TimelineEntry> {
    let mut entries = Vec::with_capacity(slots.len() + flexible.len());
    let mut flexible = flexible.into_iter().peekable();
    let mut cursor = now;

    for slot in slots {
        let mut gap = slot.window.start - cursor;
        while let Some(item) = flexible.next_if(|item| item.time_allocation <= gap) {
            gap = gap - item.time_allocation;
            entries.push(TimelineEntry::unscheduled(item));
        }
        cursor = slot.window.end;
        entries.push(TimelineEntry::scheduled(
            slot.item,
            slot.window.start,
            slot.window.end,
        ));
    }

    entries.extend(flexible.map(TimelineEntry::unscheduled));
    entries
}
