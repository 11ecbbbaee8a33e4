//! In-process store. Nothing survives a restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use taskboard_types::{
    Error, ItemId, NewItem, Record, Result, Status, now_millis, plan_reorder, sort_records,
};
use tokio::sync::Mutex;

use crate::{BackendKind, Store};

#[derive(Default)]
struct State {
    next_id: ItemId,
    records: BTreeMap<ItemId, Record>,
    closed: bool,
}

impl State {
    fn open(&mut self) -> Result<&mut Self> {
        if self.closed {
            return Err(Error::Store("store is closed".to_string()));
        }
        Ok(self)
    }

    fn ordered(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.records.values().cloned().collect();
        sort_records(&mut records);
        records
    }

    fn update(&mut self, id: ItemId, apply: impl FnOnce(&mut Record)) -> Result<u64> {
        Ok(self.open()?.records.get_mut(&id).map_or(0, |record| {
            apply(record);
            1
        }))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn init(&self) -> Result<()> {
        self.state.lock().await.open().map(|_| ())
    }

    async fn list(&self) -> Result<Vec<Record>> {
        let mut state = self.state.lock().await;
        Ok(state.open()?.ordered())
    }

    async fn create(&self, title: &str, description: &str) -> Result<ItemId> {
        let item = NewItem::new(title, description)?;
        let mut guard = self.state.lock().await;
        let state = guard.open()?;
        state.next_id += 1;
        let id = state.next_id;
        state.records.insert(
            id,
            Record {
                id,
                title: item.title.into_inner(),
                description: item.description.into_inner(),
                status: Status::Todo,
                resolved: false,
                position: 0,
                created_at: now_millis(),
            },
        );
        Ok(id)
    }

    async fn delete(&self, id: ItemId) -> Result<u64> {
        let mut state = self.state.lock().await;
        Ok(u64::from(state.open()?.records.remove(&id).is_some()))
    }

    async fn set_status(&self, id: ItemId, status: &Status) -> Result<u64> {
        let status = status.clone();
        self.state.lock().await.update(id, |record| {
            record.resolved = status.implies_resolved();
            record.status = status;
        })
    }

    async fn resolve(&self, id: ItemId) -> Result<u64> {
        self.state.lock().await.update(id, |record| {
            record.resolved = true;
            record.status = Status::Completed;
        })
    }

    async fn unresolve(&self, id: ItemId) -> Result<u64> {
        self.state.lock().await.update(id, |record| {
            record.resolved = false;
            record.status = Status::Todo;
        })
    }

    async fn set_position(&self, id: ItemId, position: i64) -> Result<u64> {
        self.state
            .lock()
            .await
            .update(id, |record| record.position = position)
    }

    async fn reorder(&self, moved: ItemId, target: ItemId) -> Result<()> {
        let mut guard = self.state.lock().await;
        let state = guard.open()?;
        let plan = plan_reorder(&state.ordered(), moved, target)?;
        for (id, position) in plan {
            if let Some(record) = state.records.get_mut(&id) {
                record.position = position;
            }
        }
        Ok(())
    }

    async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        state.records.clear();
    }
}
