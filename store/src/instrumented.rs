//! Store wrapper that records a latency sample and an outcome counter for every call.
//!
//! Results and errors pass through untouched. `init`, `close` and `backend` are
//! lifecycle calls and are not recorded.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use taskboard_metrics::{Metrics, OperationKind};
use taskboard_types::{ItemId, Record, Result, Status};

use crate::{BackendKind, Store};

/// Metric category for an operation name. Anything that is not a list, create
/// or delete is an update.
#[must_use]
pub fn operation_kind(name: &str) -> OperationKind {
    match name {
        "list" => OperationKind::Read,
        "create" => OperationKind::Create,
        "delete" => OperationKind::Delete,
        _ => OperationKind::Update,
    }
}

pub struct InstrumentedStore {
    inner: Arc<dyn Store>,
    metrics: Arc<Metrics>,
}

impl InstrumentedStore {
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, metrics: Arc<Metrics>) -> Self {
        Self { inner, metrics }
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    async fn observe<T>(&self, name: &'static str, call: impl Future<Output = Result<T>>) -> Result<T> {
        let started = Instant::now();
        let result = call.await;
        let elapsed = started.elapsed().as_secs_f64();
        if let Err(err) = &result {
            tracing::debug!(operation = name, error = %err, "Store operation failed");
        }
        self.metrics
            .record_store_operation(operation_kind(name), name, elapsed, result.is_ok());
        result
    }
}

#[async_trait]
impl Store for InstrumentedStore {
    fn backend(&self) -> BackendKind {
        self.inner.backend()
    }

    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn list(&self) -> Result<Vec<Record>> {
        self.observe("list", self.inner.list()).await
    }

    async fn create(&self, title: &str, description: &str) -> Result<ItemId> {
        self.observe("create", self.inner.create(title, description))
            .await
    }

    async fn delete(&self, id: ItemId) -> Result<u64> {
        self.observe("delete", self.inner.delete(id)).await
    }

    async fn set_status(&self, id: ItemId, status: &Status) -> Result<u64> {
        self.observe("set_status", self.inner.set_status(id, status))
            .await
    }

    async fn resolve(&self, id: ItemId) -> Result<u64> {
        self.observe("resolve", self.inner.resolve(id)).await
    }

    async fn unresolve(&self, id: ItemId) -> Result<u64> {
        self.observe("unresolve", self.inner.unresolve(id)).await
    }

    async fn set_position(&self, id: ItemId, position: i64) -> Result<u64> {
        self.observe("set_position", self.inner.set_position(id, position))
            .await
    }

    async fn reorder(&self, moved: ItemId, target: ItemId) -> Result<()> {
        self.observe("reorder", self.inner.reorder(moved, target))
            .await
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
