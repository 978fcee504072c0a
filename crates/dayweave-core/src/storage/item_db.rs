//! SQLite-backed item storage.
//!
//! Fetched records are upserted here before every merge; the merge then
//! reads the active snapshot back and writes completions and positions
//! through [`ItemStore`].

use std::path::Path;

use chrono::{Duration, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension};

use super::{data_dir, migrations, ItemStore, WriteOutcome};
use crate::error::{CoreError, DatabaseError};
use crate::timeline::{Item, ItemKind, SourceInfo};

const ITEM_COLUMNS: &str = "id, user_id, external_id, source, title, body, sender, deeplink,
     time_allocated, ordering_id, has_been_reordered, is_completed, details";

fn json_column<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<T, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Build an Item from a row selected with [`ITEM_COLUMNS`].
fn row_to_item(row: &rusqlite::Row) -> Result<Item, rusqlite::Error> {
    let source: SourceInfo = json_column(row, 3)?;
    let kind: ItemKind = json_column(row, 12)?;

    Ok(Item {
        id: row.get(0)?,
        user_id: row.get(1)?,
        external_id: row.get(2)?,
        source,
        title: row.get(4)?,
        body: row.get(5)?,
        sender: row.get(6)?,
        deeplink: row.get(7)?,
        time_allocation: Duration::nanoseconds(row.get(8)?),
        ordering_id: row.get(9)?,
        has_been_reordered: row.get(10)?,
        is_completed: row.get(11)?,
        kind,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::QueryFailed(e.to_string()))
}

fn outcome(changed: usize) -> WriteOutcome {
    if changed == 0 {
        WriteOutcome::NotFound
    } else {
        WriteOutcome::Applied
    }
}

/// SQLite database for agenda items.
pub struct ItemDb {
    conn: Connection,
}

impl ItemDb {
    /// Open the database at `~/.config/dayweave/dayweave.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("dayweave.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        migrations::migrate(&self.conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Insert or refresh freshly fetched records.
    ///
    /// Content columns are overwritten. Position and the reorder flag are
    /// owned by this store and survive. A completed row that is fetched again
    /// was reopened upstream: it becomes active and loses its stale position.
    ///
    /// # Errors
    /// Returns an error if any write fails; the batch is rolled back.
    pub fn upsert_fetched(&self, items: &[Item]) -> Result<usize, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO items (id, user_id, external_id, kind, source, title, body, sender,
                                    deeplink, time_allocated, details)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                    user_id = excluded.user_id,
                    external_id = excluded.external_id,
                    kind = excluded.kind,
                    source = excluded.source,
                    title = excluded.title,
                    body = excluded.body,
                    sender = excluded.sender,
                    deeplink = excluded.deeplink,
                    time_allocated = excluded.time_allocated,
                    details = excluded.details,
                    ordering_id = CASE WHEN items.is_completed = 1
                        THEN 0 ELSE items.ordering_id END,
                    is_completed = 0,
                    completed_at = NULL",
            )?;
            for item in items {
                stmt.execute(params![
                    item.id,
                    item.user_id,
                    item.external_id,
                    item.kind_tag().as_str(),
                    to_json(&item.source)?,
                    item.title,
                    item.body,
                    item.sender,
                    item.deeplink,
                    item.time_allocation.num_nanoseconds().unwrap_or(i64::MAX),
                    to_json(&item.kind)?,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(count = items.len(), "upserted fetched items");
        Ok(items.len())
    }

    /// Get an item by id, completed or not.
    pub fn get(&self, id: &str) -> Result<Option<Item>, DatabaseError> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
                params![id],
                row_to_item,
            )
            .optional()?;
        Ok(item)
    }

    /// Record a manual drag: the item now sits at `ordering_id` and is
    /// flagged as reordered for all future merges.
    pub fn mark_reordered(
        &self,
        id: &str,
        ordering_id: u32,
    ) -> Result<WriteOutcome, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE items SET ordering_id = ?2, has_been_reordered = 1 WHERE id = ?1",
            params![id, ordering_id],
        )?;
        Ok(outcome(changed))
    }
}

impl ItemStore for ItemDb {
    type Error = DatabaseError;

    /// Positioned items first in ordering-id order, then unpositioned ones
    /// in insertion order.
    fn active_items(&self, user_id: &str) -> Result<Vec<Item>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE user_id = ?1 AND is_completed = 0
             ORDER BY ordering_id = 0, ordering_id, rowid"
        ))?;
        let items = stmt
            .query_map(params![user_id], row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn mark_completed(&self, id: &str) -> Result<WriteOutcome, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE items SET is_completed = 1, completed_at = COALESCE(completed_at, ?2)
             WHERE id = ?1",
            params![id, Utc::now().to_rfc3339()],
        )?;
        Ok(outcome(changed))
    }

    fn set_ordering_id(&self, id: &str, ordering_id: u32) -> Result<WriteOutcome, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE items SET ordering_id = ?2 WHERE id = ?1",
            params![id, ordering_id],
        )?;
        Ok(outcome(changed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(id: &str) -> Item {
        Item::tracked_task(id, "u", 7)
            .with_title(format!("Task {id}"))
            .with_priority("High")
            .with_time_allocation(Duration::minutes(45))
    }

    #[test]
    fn upsert_and_get_roundtrip_all_kinds() {
        let db = ItemDb::open_memory().unwrap();
        let now = Utc::now();
        let message = Item::message("m1", "u", "corp.io", now).with_title("Hello");
        let event = Item::calendar_event("e1", "u", now, now + Duration::minutes(30)).unwrap();

        db.upsert_fetched(&[task("t1"), message.clone(), event.clone()])
            .unwrap();

        assert_eq!(db.get("t1").unwrap().unwrap(), task("t1"));
        assert_eq!(db.get("m1").unwrap().unwrap(), message);
        assert_eq!(db.get("e1").unwrap().unwrap(), event);
        assert!(db.get("missing").unwrap().is_none());
    }

    #[test]
    fn upsert_preserves_position_and_reorder_flag() {
        let db = ItemDb::open_memory().unwrap();
        db.upsert_fetched(&[task("t1")]).unwrap();
        db.mark_reordered("t1", 4).unwrap();

        db.upsert_fetched(&[task("t1").with_title("Renamed")]).unwrap();

        let stored = db.get("t1").unwrap().unwrap();
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.ordering_id, 4);
        assert!(stored.has_been_reordered);
    }

    #[test]
    fn refetched_completed_item_is_reopened_without_position() {
        let db = ItemDb::open_memory().unwrap();
        db.upsert_fetched(&[task("t1")]).unwrap();
        db.set_ordering_id("t1", 3).unwrap();
        db.mark_completed("t1").unwrap();
        assert!(db.active_items("u").unwrap().is_empty());

        db.upsert_fetched(&[task("t1")]).unwrap();

        let stored = db.get("t1").unwrap().unwrap();
        assert!(!stored.is_completed);
        assert_eq!(stored.ordering_id, 0);
    }

    #[test]
    fn active_items_are_ordered_and_exclude_completed() {
        let db = ItemDb::open_memory().unwrap();
        db.upsert_fetched(&[task("a"), task("b"), task("c"), task("d")])
            .unwrap();
        db.set_ordering_id("c", 1).unwrap();
        db.set_ordering_id("a", 2).unwrap();
        db.mark_completed("b").unwrap();

        let ids: Vec<String> = db
            .active_items("u")
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();

        assert_eq!(ids, vec!["c", "a", "d"]);
    }

    #[test]
    fn active_items_are_scoped_to_user() {
        let db = ItemDb::open_memory().unwrap();
        db.upsert_fetched(&[task("mine"), Item::tracked_task("theirs", "other", 1)])
            .unwrap();

        let items = db.active_items("u").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "mine");
    }

    #[test]
    fn writes_report_missing_rows() {
        let db = ItemDb::open_memory().unwrap();
        assert_eq!(db.mark_completed("nope").unwrap(), WriteOutcome::NotFound);
        assert_eq!(db.set_ordering_id("nope", 1).unwrap(), WriteOutcome::NotFound);
        assert_eq!(db.mark_reordered("nope", 1).unwrap(), WriteOutcome::NotFound);
    }

    #[test]
    fn repeated_writes_are_applied_idempotently() {
        let db = ItemDb::open_memory().unwrap();
        db.upsert_fetched(&[task("t1")]).unwrap();

        assert_eq!(db.set_ordering_id("t1", 2).unwrap(), WriteOutcome::Applied);
        assert_eq!(db.set_ordering_id("t1", 2).unwrap(), WriteOutcome::Applied);
        assert_eq!(db.mark_completed("t1").unwrap(), WriteOutcome::Applied);
        assert_eq!(db.mark_completed("t1").unwrap(), WriteOutcome::Applied);

        let stored = db.get("t1").unwrap().unwrap();
        assert_eq!(stored.ordering_id, 2);
        assert!(stored.is_completed);
    }

    #[test]
    fn open_at_creates_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.db");
        {
            let db = ItemDb::open_at(&path).unwrap();
            db.upsert_fetched(&[task("t1")]).unwrap();
        }
        let reopened = ItemDb::open_at(&path).unwrap();
        assert!(reopened.get("t1").unwrap().is_some());
    }
}
