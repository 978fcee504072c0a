//! Fetchers backed by JSON files on disk.
//!
//! A snapshot directory holds up to three files:
//! - `tasks.json`: an array of tracked tasks, or `{ "tasks": [...], "priority_mapping": {...} }`
//! - `messages.json`: an array of messages
//! - `events.json`: an array of calendar events
//!
//! A missing file means the source currently has nothing for the user.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{CalendarFetcher, MessageFetcher, TaskFetch, TaskFetcher};
use crate::error::{FetchError, ValidationError};
use crate::timeline::{EventWindow, Item, ItemKindTag};

const SOURCE_NAME: &str = "snapshot";

#[derive(Deserialize)]
#[serde(untagged)]
enum TaskFile {
    Plain(Vec<Item>),
    WithMapping(TaskFetch),
}

/// Reads `tasks.json`, `messages.json` and `events.json` from one directory.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    dir: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read<T>(&self, file: &str) -> Result<Option<T>, FetchError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let path = self.dir.join(file);
        tokio::task::spawn_blocking(move || read_json(&path))
            .await
            .map_err(|e| FetchError::Aborted {
                source_name: SOURCE_NAME.to_string(),
                message: e.to_string(),
            })?
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, FetchError> {
    let unreadable = |message: String| FetchError::Unreadable {
        source_name: SOURCE_NAME.to_string(),
        path: path.to_path_buf(),
        message,
    };
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "snapshot file absent");
            return Ok(None);
        }
        Err(e) => return Err(unreadable(e.to_string())),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| unreadable(e.to_string()))
}

/// Check kinds and windows, and claim unowned records for `user_id`.
fn normalize(
    items: Vec<Item>,
    expected: ItemKindTag,
    user_id: &str,
) -> Result<Vec<Item>, FetchError> {
    items
        .into_iter()
        .map(|mut item| {
            let id = item.id.clone();
            let invalid = move |message: String| FetchError::Source {
                source_name: SOURCE_NAME.to_string(),
                message: format!("item '{id}': {message}"),
            };
            if item.kind_tag() != expected {
                return Err(invalid(format!(
                    "expected {}, found {}",
                    expected.as_str(),
                    item.kind_tag().as_str()
                )));
            }
            if let Some(window) = item.event_window().copied() {
                EventWindow::try_new(window.start, window.end).map_err(|e| invalid(e.to_string()))?;
                item.time_allocation = window.duration();
            }
            if item.time_allocation < chrono::Duration::zero() {
                let err = ValidationError::NegativeAllocation { id: item.id.clone() };
                return Err(invalid(err.to_string()));
            }
            if item.user_id.is_empty() {
                item.user_id = user_id.to_string();
            }
            Ok(item)
        })
        .collect()
}

#[async_trait]
impl TaskFetcher for JsonSnapshotSource {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_tasks(&self, user_id: &str) -> Result<TaskFetch, FetchError> {
        let fetch = match self.read::<TaskFile>("tasks.json").await? {
            None => TaskFetch::default(),
            Some(TaskFile::Plain(tasks)) => TaskFetch {
                tasks,
                priority_mapping: None,
            },
            Some(TaskFile::WithMapping(fetch)) => fetch,
        };
        Ok(TaskFetch {
            tasks: normalize(fetch.tasks, ItemKindTag::TrackedTask, user_id)?,
            priority_mapping: fetch.priority_mapping,
        })
    }
}

#[async_trait]
impl MessageFetcher for JsonSnapshotSource {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_messages(&self, user_id: &str) -> Result<Vec<Item>, FetchError> {
        let messages = self.read::<Vec<Item>>("messages.json").await?.unwrap_or_default();
        normalize(messages, ItemKindTag::Message, user_id)
    }
}

#[async_trait]
impl CalendarFetcher for JsonSnapshotSource {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_events(&self, user_id: &str) -> Result<Vec<Item>, FetchError> {
        let events = self.read::<Vec<Item>>("events.json").await?.unwrap_or_default();
        normalize(events, ItemKindTag::CalendarEvent, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::gather_fetches;

    fn write(dir: &Path, file: &str, content: &str) {
        std::fs::write(dir.join(file), content).unwrap();
    }

    #[tokio::test]
    async fn empty_directory_yields_empty_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonSnapshotSource::new(dir.path());

        let bundle = gather_fetches("u", &source, &source, &source).await.unwrap();

        assert!(bundle.is_empty());
        assert!(bundle.priority_mapping.is_none());
    }

    #[tokio::test]
    async fn reads_all_three_files() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "tasks.json",
            r#"{"priority_mapping": {"High": 1},
                "tasks": [{"id": "t1", "kind": "tracked_task", "priority_id": "High",
                           "time_allocated": 1800000000000}]}"#,
        );
        write(
            dir.path(),
            "messages.json",
            r#"[{"id": "m1", "kind": "message", "sender_domain": "corp.io",
                 "sent_at": "2024-03-01T09:00:00Z"}]"#,
        );
        write(
            dir.path(),
            "events.json",
            r#"[{"id": "e1", "kind": "calendar_event",
                 "start": "2024-03-01T10:00:00Z", "end": "2024-03-01T10:45:00Z"}]"#,
        );
        let source = JsonSnapshotSource::new(dir.path());

        let bundle = gather_fetches("ada", &source, &source, &source).await.unwrap();

        assert_eq!(bundle.len(), 3);
        assert_eq!(bundle.tasks[0].user_id, "ada");
        assert_eq!(bundle.tasks[0].time_allocation, chrono::Duration::minutes(30));
        assert_eq!(bundle.events[0].time_allocation, chrono::Duration::minutes(45));
        assert_eq!(bundle.priority_mapping.unwrap().rank("High"), Some(1));
    }

    #[tokio::test]
    async fn plain_task_array_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "tasks.json", r#"[{"id": "t1", "kind": "tracked_task"}]"#);
        let source = JsonSnapshotSource::new(dir.path());

        let fetch = source.fetch_tasks("u").await.unwrap();

        assert_eq!(fetch.tasks.len(), 1);
        assert!(fetch.priority_mapping.is_none());
    }

    #[tokio::test]
    async fn wrong_kind_in_file_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "messages.json",
            r#"[{"id": "t1", "kind": "tracked_task"}]"#,
        );
        let source = JsonSnapshotSource::new(dir.path());

        let err = source.fetch_messages("u").await.unwrap_err();

        assert!(matches!(err, FetchError::Source { .. }));
    }

    #[tokio::test]
    async fn inverted_event_window_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "events.json",
            r#"[{"id": "e1", "kind": "calendar_event",
                 "start": "2024-03-01T10:00:00Z", "end": "2024-03-01T09:00:00Z"}]"#,
        );
        let source = JsonSnapshotSource::new(dir.path());

        assert!(source.fetch_events("u").await.is_err());
    }

    #[tokio::test]
    async fn malformed_json_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "events.json", "[{");
        let source = JsonSnapshotSource::new(dir.path());

        let err = source.fetch_events("u").await.unwrap_err();

        assert!(matches!(err, FetchError::Unreadable { .. }));
    }
}
