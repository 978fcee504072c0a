//! Agenda data model.
//!
//! This module provides:
//! - Items of every kind (messages, tracked tasks, calendar events)
//! - Source metadata for the systems items are fetched from
//! - Merged timeline entries and the presentation groups built from them

mod entry;
mod item;
mod source;

pub use entry::{GroupKind, Placement, TimelineEntry, TimelineGroup};
pub use item::{EventWindow, Item, ItemKind, ItemKindTag, MessageDetails, TrackedTaskDetails};
pub use source::{extract_email_domain, SourceInfo};
