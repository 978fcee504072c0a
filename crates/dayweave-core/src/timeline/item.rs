//! Agenda item types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::source::SourceInfo;
use crate::error::ValidationError;

/// An inbound message (mail, chat) waiting for a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDetails {
    #[serde(default)]
    pub thread_id: String,
    pub sender_domain: String,
    pub sent_at: DateTime<Utc>,
}

/// An issue-tracker record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedTaskDetails {
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Tracker-specific priority label, resolved through the merge's priority mapping.
    #[serde(default)]
    pub priority_id: Option<String>,
    #[serde(default)]
    pub priority_normalized: f64,
    #[serde(default)]
    pub task_number: i64,
}

/// A fixed calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EventWindow {
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Kind-specific payload of an [`Item`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    Message(MessageDetails),
    TrackedTask(TrackedTaskDetails),
    CalendarEvent(EventWindow),
}

/// Discriminator of [`ItemKind`], handy for dispatch tables and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKindTag {
    Message,
    TrackedTask,
    CalendarEvent,
}

impl ItemKindTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::TrackedTask => "tracked_task",
            Self::CalendarEvent => "calendar_event",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "message" => Some(Self::Message),
            "tracked_task" => Some(Self::TrackedTask),
            "calendar_event" => Some(Self::CalendarEvent),
            _ => None,
        }
    }
}

/// A single thing to do, owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub source: SourceInfo,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub deeplink: String,
    /// Time the item needs when it is not pinned to a calendar slot.
    #[serde(rename = "time_allocated", with = "nanos", default = "Duration::zero")]
    pub time_allocation: Duration,
    /// Position in the user's agenda; `0` means no position yet.
    #[serde(default)]
    pub ordering_id: u32,
    /// Set by the user's drag action; never cleared by the merge.
    #[serde(default)]
    pub has_been_reordered: bool,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl Item {
    fn with_kind(id: impl Into<String>, user_id: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            external_id: String::new(),
            source: SourceInfo::default(),
            title: String::new(),
            body: String::new(),
            sender: String::new(),
            deeplink: String::new(),
            time_allocation: Duration::zero(),
            ordering_id: 0,
            has_been_reordered: false,
            is_completed: false,
            kind,
        }
    }

    /// A message received at `sent_at` from `sender_domain`.
    pub fn message(
        id: impl Into<String>,
        user_id: impl Into<String>,
        sender_domain: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self::with_kind(
            id,
            user_id,
            ItemKind::Message(MessageDetails {
                thread_id: String::new(),
                sender_domain: sender_domain.into(),
                sent_at,
            }),
        )
        .with_source(SourceInfo::gmail())
    }

    /// A tracked task with the tracker's sequential number.
    pub fn tracked_task(
        id: impl Into<String>,
        user_id: impl Into<String>,
        task_number: i64,
    ) -> Self {
        Self::with_kind(
            id,
            user_id,
            ItemKind::TrackedTask(TrackedTaskDetails {
                due_date: None,
                priority_id: None,
                priority_normalized: 0.0,
                task_number,
            }),
        )
        .with_source(SourceInfo::jira())
    }

    /// A calendar event occupying `start..end`.
    ///
    /// # Errors
    /// Returns an error if `end` precedes `start`.
    pub fn calendar_event(
        id: impl Into<String>,
        user_id: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let window = EventWindow::try_new(start, end)?;
        let mut item = Self::with_kind(id, user_id, ItemKind::CalendarEvent(window))
            .with_source(SourceInfo::google_calendar());
        item.time_allocation = window.duration();
        Ok(item)
    }

    pub fn kind_tag(&self) -> ItemKindTag {
        match self.kind {
            ItemKind::Message(_) => ItemKindTag::Message,
            ItemKind::TrackedTask(_) => ItemKindTag::TrackedTask,
            ItemKind::CalendarEvent(_) => ItemKindTag::CalendarEvent,
        }
    }

    /// Flexible items have no fixed time and are placed by the scheduler.
    pub fn is_flexible(&self) -> bool {
        !matches!(self.kind, ItemKind::CalendarEvent(_))
    }

    pub fn event_window(&self) -> Option<&EventWindow> {
        match &self.kind {
            ItemKind::CalendarEvent(window) => Some(window),
            _ => None,
        }
    }

    /// Whether the item holds an established position.
    pub fn has_position(&self) -> bool {
        self.ordering_id > 0
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_source(mut self, source: SourceInfo) -> Self {
        self.source = source;
        self
    }

    pub fn with_time_allocation(mut self, allocation: Duration) -> Self {
        self.time_allocation = allocation;
        self
    }

    pub fn with_ordering_id(mut self, ordering_id: u32) -> Self {
        self.ordering_id = ordering_id;
        self
    }

    pub fn with_reordered(mut self, reordered: bool) -> Self {
        self.has_been_reordered = reordered;
        self
    }

    /// Set the due date; ignored for non-task kinds.
    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        if let ItemKind::TrackedTask(details) = &mut self.kind {
            details.due_date = Some(due);
        }
        self
    }

    /// Set the priority label; ignored for non-task kinds.
    pub fn with_priority(mut self, priority_id: impl Into<String>) -> Self {
        if let ItemKind::TrackedTask(details) = &mut self.kind {
            details.priority_id = Some(priority_id.into());
        }
        self
    }
}

/// (De)serialize a [`Duration`] as integer nanoseconds.
pub(crate) mod nanos {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_nanoseconds().unwrap_or(i64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::nanoseconds(i64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_event_rejects_inverted_range() {
        let now = Utc::now();
        let result = Item::calendar_event("e1", "u", now, now - Duration::minutes(5));
        assert!(matches!(
            result,
            Err(ValidationError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn calendar_event_allocation_is_its_length() {
        let now = Utc::now();
        let event = Item::calendar_event("e1", "u", now, now + Duration::minutes(45)).unwrap();
        assert_eq!(event.time_allocation, Duration::minutes(45));
        assert!(!event.is_flexible());
        assert_eq!(event.kind_tag(), ItemKindTag::CalendarEvent);
    }

    #[test]
    fn task_builders_only_touch_tasks() {
        let now = Utc::now();
        let msg = Item::message("m1", "u", "corp.io", now)
            .with_due_date(now)
            .with_priority("P1");
        assert!(matches!(msg.kind, ItemKind::Message(_)));

        let task = Item::tracked_task("t1", "u", 7)
            .with_due_date(now)
            .with_priority("P1");
        match task.kind {
            ItemKind::TrackedTask(details) => {
                assert_eq!(details.due_date, Some(now));
                assert_eq!(details.priority_id.as_deref(), Some("P1"));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn json_carries_kind_tag_and_nanosecond_allocation() {
        let now = Utc::now();
        let item = Item::tracked_task("t1", "u", 3).with_time_allocation(Duration::minutes(1));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "tracked_task");
        assert_eq!(json["time_allocated"], 60_000_000_000i64);

        let parsed: Item = serde_json::from_value(serde_json::json!({
            "id": "m9",
            "kind": "message",
            "sender_domain": "corp.io",
            "sent_at": now.to_rfc3339(),
        }))
        .unwrap();
        assert_eq!(parsed.kind_tag(), ItemKindTag::Message);
        assert_eq!(parsed.ordering_id, 0);
        assert_eq!(parsed.time_allocation, Duration::zero());
    }
}
