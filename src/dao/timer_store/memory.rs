//! In-process [`TimerStore`] used as the default backend and by tests.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    models::{NewRecordEntity, RecordEntity, TimerEntity, TimerPatch, newest_first},
    storage::{StorageError, StorageResult},
    timer_store::TimerStore,
};

/// Failure surfaced while the memory store is switched offline.
#[derive(Debug, Error)]
#[error("memory store is offline")]
pub struct MemoryStoreOffline;

impl From<MemoryStoreOffline> for StorageError {
    fn from(err: MemoryStoreOffline) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}

#[derive(Default)]
struct MemoryInner {
    timer: RwLock<Option<TimerEntity>>,
    records: RwLock<Vec<RecordEntity>>,
    offline: AtomicBool,
}

/// Volatile store keeping both documents in memory.
#[derive(Clone, Default)]
pub struct MemoryTimerStore {
    inner: Arc<MemoryInner>,
}

impl MemoryTimerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable backend: every call fails while offline.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), MemoryStoreOffline> {
        if self.inner.offline.load(Ordering::SeqCst) {
            Err(MemoryStoreOffline)
        } else {
            Ok(())
        }
    }
}

impl TimerStore for MemoryTimerStore {
    fn load_timer(&self) -> BoxFuture<'static, StorageResult<Option<TimerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            Ok(store.inner.timer.read().await.clone())
        })
    }

    fn merge_timer(&self, patch: TimerPatch) -> BoxFuture<'static, StorageResult<TimerEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let mut guard = store.inner.timer.write().await;
            let entity = guard.get_or_insert_with(TimerEntity::default);
            patch.apply_to(entity);
            Ok(entity.clone())
        })
    }

    fn insert_record(
        &self,
        record: NewRecordEntity,
    ) -> BoxFuture<'static, StorageResult<RecordEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let record = record.with_id(Uuid::new_v4());
            store.inner.records.write().await.push(record.clone());
            Ok(record)
        })
    }

    fn delete_record(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let mut guard = store.inner.records.write().await;
            let before = guard.len();
            guard.retain(|record| record.id != id);
            Ok(guard.len() != before)
        })
    }

    fn list_records(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<RecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let records = store.inner.records.read().await.clone();
            Ok(newest_first(records, limit))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online().map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.health_check()
    }
}
