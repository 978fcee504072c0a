//! Upstream fetch collaborators.
//!
//! Each source (tracker, mail/chat, calendar) is behind its own trait so
//! network clients and local snapshots plug in the same way. The core never
//! retries; a failed fetch aborts the merge before anything is written,
//! since merging a partial fetch would mark the missing source's items
//! completed.

mod snapshot;

pub use snapshot::JsonSnapshotSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::merge::PriorityMapping;
use crate::timeline::Item;

/// What a task tracker returns: its items and, optionally, its priority scheme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFetch {
    pub tasks: Vec<Item>,
    #[serde(default)]
    pub priority_mapping: Option<PriorityMapping>,
}

#[async_trait]
pub trait TaskFetcher: Send + Sync {
    fn source_name(&self) -> &str;

    async fn fetch_tasks(&self, user_id: &str) -> Result<TaskFetch, FetchError>;
}

#[async_trait]
pub trait MessageFetcher: Send + Sync {
    fn source_name(&self) -> &str;

    async fn fetch_messages(&self, user_id: &str) -> Result<Vec<Item>, FetchError>;
}

#[async_trait]
pub trait CalendarFetcher: Send + Sync {
    fn source_name(&self) -> &str;

    /// Events relevant to the agenda being built.
    async fn fetch_events(&self, user_id: &str) -> Result<Vec<Item>, FetchError>;
}

/// Combined output of one round of fetches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchBundle {
    pub tasks: Vec<Item>,
    pub messages: Vec<Item>,
    pub events: Vec<Item>,
    pub priority_mapping: Option<PriorityMapping>,
}

impl FetchBundle {
    pub fn len(&self) -> usize {
        self.tasks.len() + self.messages.len() + self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All items in fetch order (tasks, then messages, then events).
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.tasks.iter().chain(&self.messages).chain(&self.events)
    }

    pub fn into_items(self) -> Vec<Item> {
        let mut items = self.tasks;
        items.extend(self.messages);
        items.extend(self.events);
        items
    }
}

/// Run the three fetches concurrently and wait for all of them.
///
/// # Errors
/// Returns the first fetch failure; the other fetches are dropped.
pub async fn gather_fetches<T, M, C>(
    user_id: &str,
    task_fetcher: &T,
    message_fetcher: &M,
    calendar_fetcher: &C,
) -> Result<FetchBundle, FetchError>
where
    T: TaskFetcher + ?Sized,
    M: MessageFetcher + ?Sized,
    C: CalendarFetcher + ?Sized,
{
    let (task_fetch, messages, events) = tokio::try_join!(
        task_fetcher.fetch_tasks(user_id),
        message_fetcher.fetch_messages(user_id),
        calendar_fetcher.fetch_events(user_id),
    )
    .map_err(|e| {
        tracing::error!(source_name = e.source_name(), error = %e, "fetch failed");
        e
    })?;

    tracing::debug!(
        tasks = task_fetch.tasks.len(),
        messages = messages.len(),
        events = events.len(),
        "gathered fetches"
    );
    Ok(FetchBundle {
        tasks: task_fetch.tasks,
        messages,
        events,
        priority_mapping: task_fetch.priority_mapping,
    })
}
