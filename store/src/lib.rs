//! Record persistence for Taskboard.
//!
//! # Architecture
//!
//! [`Store`] is the one capability surface every backend implements:
//!
//! | Backend | Type | Use |
//! |---------|------|-----|
//! | `sqlite` | [`SqliteStore`] | file-backed, pooled, single instance |
//! | `memory` | [`MemoryStore`] | tests and throwaway runs |
//!
//! The backend is picked once, from configuration, by [`open`]. The server never
//! talks to a backend directly: it goes through [`InstrumentedStore`], which
//! times every call and records the outcome without changing it.
//!
//! # Semantics
//!
//! - `create` validates that title and description are non-blank after trimming.
//! - `delete` and the update operations report rows affected; an absent id is `0`,
//!   never an error.
//! - `reorder` is the only operation that fails on an absent id, and it renumbers
//!   every record (see [`taskboard_types::ordering`]).

mod instrumented;
mod memory;
mod sqlite;

pub use instrumented::{InstrumentedStore, operation_kind};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use taskboard_types::{Error, ItemId, Record, Result, Status};

/// Default number of pooled SQLite connections.
pub const DEFAULT_POOL_SIZE: usize = 4;
/// Default wait for a pooled connection before failing with `PoolExhausted`.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// CRUD and ordering operations over persisted records.
#[async_trait]
pub trait Store: Send + Sync {
    /// Which backend this is, for health output.
    fn backend(&self) -> BackendKind;

    /// Bootstrap the schema. Idempotent.
    async fn init(&self) -> Result<()>;

    /// All records in list order.
    async fn list(&self) -> Result<Vec<Record>>;

    async fn create(&self, title: &str, description: &str) -> Result<ItemId>;

    async fn delete(&self, id: ItemId) -> Result<u64>;

    /// Set the status and derive `resolved` from it.
    async fn set_status(&self, id: ItemId, status: &Status) -> Result<u64>;

    async fn resolve(&self, id: ItemId) -> Result<u64>;

    async fn unresolve(&self, id: ItemId) -> Result<u64>;

    /// Overwrite one record's position. Siblings are not renumbered.
    async fn set_position(&self, id: ItemId, position: i64) -> Result<u64>;

    /// Move `moved` onto `target` and renumber every record.
    async fn reorder(&self, moved: ItemId, target: ItemId) -> Result<()>;

    /// Release backend resources. Later calls fail with `Error::Store`.
    async fn close(&self);
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Sqlite,
    Memory,
}

impl BackendKind {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(BackendKind::Sqlite),
            "memory" | "mem" => Ok(BackendKind::Memory),
            other => Err(Error::Configuration(format!(
                "unknown store backend {other:?} (expected sqlite or memory)"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to construct a backend.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub backend: BackendKind,
    pub path: PathBuf,
    pub pool_size: usize,
    pub acquire_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            path: PathBuf::from("data").join("taskboard.db"),
            pool_size: DEFAULT_POOL_SIZE,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

/// Construct the configured backend. The schema is not touched; call `init`.
pub fn open(options: &StoreOptions) -> Result<Arc<dyn Store>> {
    match options.backend {
        BackendKind::Sqlite => Ok(Arc::new(SqliteStore::open(
            &options.path,
            options.pool_size,
            options.acquire_timeout,
        )?)),
        BackendKind::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
