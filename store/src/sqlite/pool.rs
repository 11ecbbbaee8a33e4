//! Bounded SQLite connection pool.
//!
//! A semaphore caps the number of connections in use. Waiters queue on it up
//! to the acquire timeout and then fail with [`Error::PoolExhausted`].
//! Connections are opened lazily and returned to the idle list on drop.
//!
//! All SQLite calls run on the blocking thread pool via [`ConnectionPool::run`],
//! so the async reactor is never blocked on disk IO.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rusqlite::Connection;
use taskboard_types::{Error, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) struct ConnectionPool {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
    acquire_timeout: Duration,
    closed: AtomicBool,
}

impl ConnectionPool {
    pub(crate) fn new(path: &Path, size: usize, acquire_timeout: Duration) -> Self {
        Self {
            path: path.to_path_buf(),
            idle: Mutex::new(Vec::with_capacity(size)),
            permits: Arc::new(Semaphore::new(size.max(1))),
            acquire_timeout,
            closed: AtomicBool::new(false),
        }
    }

    /// Run `f` with a pooled connection on the blocking thread pool.
    pub(crate) async fn run<T, F>(self: &Arc<Self>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut conn = self.acquire().await?;
        tokio::task::spawn_blocking(move || f(conn.get_mut()?))
            .await
            .map_err(|e| Error::Store(format!("store task failed: {e}")))?
    }

    async fn acquire(self: &Arc<Self>) -> Result<PooledConnection> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Store("store is closed".to_string()));
        }
        let started = Instant::now();
        let permit =
            match tokio::time::timeout(self.acquire_timeout, Arc::clone(&self.permits).acquire_owned())
                .await
            {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return Err(Error::Store("store is closed".to_string())),
                Err(_) => {
                    let waited_ms = started.elapsed().as_millis() as u64;
                    tracing::warn!(waited_ms, "SQLite pool exhausted");
                    return Err(Error::PoolExhausted { waited_ms });
                }
            };

        let cached = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        let conn = match cached {
            Some(conn) => conn,
            None => self.open_connection()?,
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(self),
            _permit: permit,
        })
    }

    fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path).map_err(|e| {
            Error::Store(format!(
                "failed to open database at {}: {e}",
                self.path.display()
            ))
        })?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(Error::store)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(Error::store)?;
        tracing::debug!(path = %self.path.display(), "Opened SQLite connection");
        Ok(conn)
    }

    /// Stop handing out connections and drop the idle ones.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.permits.close();
        if let Ok(mut idle) = self.idle.lock() {
            idle.clear();
        }
    }

    #[cfg(test)]
    pub(crate) fn idle_count(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }
}

struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<ConnectionPool>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    fn get_mut(&mut self) -> Result<&mut Connection> {
        self.conn
            .as_mut()
            .ok_or_else(|| Error::Store("pooled connection already released".to_string()))
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if self.pool.closed.load(Ordering::Acquire) {
            return;
        }
        if let Ok(mut idle) = self.pool.idle.lock() {
            idle.push(conn);
        }
    }
}
