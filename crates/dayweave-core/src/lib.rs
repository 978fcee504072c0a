//! # Dayweave Core Library
//!
//! Merges work from several independent sources into one ordered,
//! time-annotated agenda per user. Messages, tracked tasks and calendar
//! events are fetched separately; the core reconciles them against the
//! previous agenda and lays them out around the user's fixed calendar.
//!
//! ## Architecture
//!
//! - **Timeline**: the item model and the grouped output types
//! - **Merge**: completion reconciliation, priority sort, gap filling,
//!   manual-reorder adjustment, dense ordering and grouping
//! - **Fetch**: collaborator traits for upstream sources, plus a JSON
//!   snapshot implementation
//! - **Storage**: SQLite item store and TOML configuration
//!
//! ## Key Components
//!
//! - [`TimelineMerger`]: runs one merge and returns a [`MergeReport`]
//! - [`ItemStore`]: the persistence seam the merge writes through
//! - [`ItemDb`]: SQLite implementation of [`ItemStore`]
//! - [`Config`]: application configuration management

pub mod error;
pub mod fetch;
pub mod merge;
pub mod storage;
pub mod timeline;

pub use error::{ConfigError, CoreError, DatabaseError, FetchError, ValidationError};
pub use fetch::{
    gather_fetches, CalendarFetcher, FetchBundle, JsonSnapshotSource, MessageFetcher, TaskFetch,
    TaskFetcher,
};
pub use merge::{
    AllocationDefaults, MergeContext, MergeProblem, MergeReport, MergeStage, PriorityMapping,
    ProblemKind, TimelineMerger,
};
pub use storage::{Config, ItemDb, ItemStore, WriteOutcome};
pub use timeline::{
    extract_email_domain, GroupKind, Item, ItemKind, ItemKindTag, SourceInfo, TimelineEntry,
    TimelineGroup,
};
