//! File-backed SQLite store.
//!
//! Single-writer: safe for one process at a time. Every call borrows a
//! connection from the bounded pool and runs on the blocking thread pool.

mod files;
mod pool;
mod schema;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use taskboard_types::{
    Error, ItemId, NewItem, Record, Result, Status, now_millis, plan_reorder, sort_records,
};

use crate::{BackendKind, Store};
use pool::ConnectionPool;

const SELECT_ITEMS: &str =
    "SELECT id, title, description, status, resolved, order_index, created_at FROM items";

pub struct SqliteStore {
    path: PathBuf,
    pool: Arc<ConnectionPool>,
}

impl SqliteStore {
    /// Prepare the database file and build the pool. Does not touch the schema; call
    /// [`Store::init`] before serving.
    pub fn open(path: impl AsRef<Path>, pool_size: usize, acquire_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        files::prepare_db_path(path)?;
        tracing::info!(path = %path.display(), pool_size, "SQLite store opened");
        Ok(Self {
            path: path.to_path_buf(),
            pool: Arc::new(ConnectionPool::new(path, pool_size, acquire_timeout)),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn update(&self, sql: &'static str, id: ItemId, status: Status, resolved: bool) -> Result<u64> {
        self.pool
            .run(move |conn| {
                let changed = conn
                    .execute(sql, params![status.as_str(), resolved, id])
                    .map_err(Error::store)?;
                Ok(changed as u64)
            })
            .await
    }
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    let status: String = row.get(3)?;
    let created_ms: i64 = row.get(6)?;
    Ok(Record {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: Status::parse(&status),
        resolved: row.get(4)?,
        position: row.get(5)?,
        created_at: DateTime::from_timestamp_millis(created_ms).unwrap_or_default(),
    })
}

fn load_ordered(conn: &Connection) -> Result<Vec<Record>> {
    let mut stmt = conn.prepare_cached(SELECT_ITEMS).map_err(Error::store)?;
    let mut records = stmt
        .query_map([], read_record)
        .map_err(Error::store)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::store)?;
    sort_records(&mut records);
    Ok(records)
}

#[async_trait]
impl Store for SqliteStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn init(&self) -> Result<()> {
        self.pool.run(|conn| schema::apply(conn)).await
    }

    async fn list(&self) -> Result<Vec<Record>> {
        self.pool.run(|conn| load_ordered(conn)).await
    }

    async fn create(&self, title: &str, description: &str) -> Result<ItemId> {
        let item = NewItem::new(title, description)?;
        let created_at = now_millis().timestamp_millis();
        self.pool
            .run(move |conn| {
                conn.execute(
                    "INSERT INTO items (title, description, status, resolved, order_index, created_at)
                     VALUES (?1, ?2, 'todo', 0, 0, ?3)",
                    params![item.title.as_str(), item.description.as_str(), created_at],
                )
                .map_err(Error::store)?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    async fn delete(&self, id: ItemId) -> Result<u64> {
        self.pool
            .run(move |conn| {
                let removed = conn
                    .execute("DELETE FROM items WHERE id = ?1", [id])
                    .map_err(Error::store)?;
                Ok(removed as u64)
            })
            .await
    }

    async fn set_status(&self, id: ItemId, status: &Status) -> Result<u64> {
        let resolved = status.implies_resolved();
        self.update(
            "UPDATE items SET status = ?1, resolved = ?2 WHERE id = ?3",
            id,
            status.clone(),
            resolved,
        )
        .await
    }

    async fn resolve(&self, id: ItemId) -> Result<u64> {
        self.update(
            "UPDATE items SET status = ?1, resolved = ?2 WHERE id = ?3",
            id,
            Status::Completed,
            true,
        )
        .await
    }

    async fn unresolve(&self, id: ItemId) -> Result<u64> {
        self.update(
            "UPDATE items SET status = ?1, resolved = ?2 WHERE id = ?3",
            id,
            Status::Todo,
            false,
        )
        .await
    }

    async fn set_position(&self, id: ItemId, position: i64) -> Result<u64> {
        self.pool
            .run(move |conn| {
                let changed = conn
                    .execute(
                        "UPDATE items SET order_index = ?1 WHERE id = ?2",
                        params![position, id],
                    )
                    .map_err(Error::store)?;
                Ok(changed as u64)
            })
            .await
    }

    async fn reorder(&self, moved: ItemId, target: ItemId) -> Result<()> {
        self.pool
            .run(move |conn| {
                // IMMEDIATE takes the write lock up front so two reorders cannot
                // interleave their read and write passes.
                let tx = conn
                    .transaction_with_behavior(TransactionBehavior::Immediate)
                    .map_err(Error::store)?;
                let ordered = load_ordered(&tx)?;
                let plan = plan_reorder(&ordered, moved, target)?;
                {
                    let mut stmt = tx
                        .prepare_cached("UPDATE items SET order_index = ?1 WHERE id = ?2")
                        .map_err(Error::store)?;
                    for (id, position) in &plan {
                        stmt.execute(params![position, id]).map_err(Error::store)?;
                    }
                }
                tx.commit().map_err(Error::store)?;
                tracing::debug!(moved, target, renumbered = plan.len(), "Reordered items");
                Ok(())
            })
            .await
    }

    async fn close(&self) {
        self.pool.close();
        tracing::info!(path = %self.path.display(), "SQLite store closed");
    }
}

impl SqliteStore {
    /// Fetch one record by id. Used by tests and diagnostics.
    pub async fn get(&self, id: ItemId) -> Result<Option<Record>> {
        self.pool
            .run(move |conn| {
                conn.query_row(&format!("{SELECT_ITEMS} WHERE id = ?1"), [id], read_record)
                    .optional()
                    .map_err(Error::store)
            })
            .await
    }
}
