//! Shared state store adapter.
//!
//! Wraps whichever [`TimerStore`] backend is installed and republishes every
//! successful read or write on two watch feeds (timer, records), so each view
//! holding a [`Subscription`] converges on the latest document. A read only
//! publishes when no write committed while it was in flight.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::{RwLock, watch};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{NewRecordEntity, TimerPatch},
        timer_store::TimerStore,
    },
    error::ServiceError,
    state::{
        record::{RECORD_LIST_LIMIT, Record},
        timer::TimerState,
    },
};

/// Push-based view over one of the store feeds.
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`]) stops delivery.
pub struct Subscription<T> {
    receiver: watch::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Latest published value, marking it as seen.
    pub fn current(&mut self) -> T {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait for the next published value. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Stop receiving updates.
    pub fn unsubscribe(self) {}
}

/// Adapter over the remote document store holding the timer singleton and the records.
pub struct SharedStore {
    backend: RwLock<Option<Arc<dyn TimerStore>>>,
    timer: watch::Sender<Option<TimerState>>,
    records: watch::Sender<Vec<Record>>,
    degraded: watch::Sender<bool>,
    timer_writes: AtomicU64,
    record_writes: AtomicU64,
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore {
    /// Start without a backend, in degraded mode.
    pub fn new() -> Self {
        let (timer, _) = watch::channel(None);
        let (records, _) = watch::channel(Vec::new());
        let (degraded, _) = watch::channel(true);
        Self {
            backend: RwLock::new(None),
            timer,
            records,
            degraded,
            timer_writes: AtomicU64::new(0),
            record_writes: AtomicU64::new(0),
        }
    }

    /// Install a backend, leave degraded mode and pull the current documents.
    pub async fn install(&self, backend: Arc<dyn TimerStore>) {
        {
            let mut guard = self.backend.write().await;
            *guard = Some(backend);
        }
        self.set_degraded(false);
        if let Err(err) = self.refresh().await {
            warn!(error = %err, "initial store refresh failed");
        }
    }

    /// Drop the backend and enter degraded mode.
    pub async fn clear(&self) {
        {
            let mut guard = self.backend.write().await;
            guard.take();
        }
        self.set_degraded(true);
    }

    /// Whether commands are currently refused for lack of a reachable backend.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Flip the degraded flag, notifying watchers only on an actual change.
    pub fn set_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Watch the degraded flag.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    async fn backend(&self) -> Result<Arc<dyn TimerStore>, ServiceError> {
        let guard = self.backend.read().await;
        guard.as_ref().cloned().ok_or(ServiceError::Degraded)
    }

    /// Fetch the timer document once. `None` until the first write creates it.
    pub async fn read_timer_state(&self) -> Result<Option<TimerState>, ServiceError> {
        let backend = self.backend().await?;
        let generation = self.timer_writes.load(Ordering::Acquire);
        let state = backend.load_timer().await?.map(TimerState::from);
        self.publish_timer(state.clone(), Some(generation));
        Ok(state)
    }

    /// Subscribe to every published version of the timer document.
    pub fn subscribe_timer_state(&self) -> Subscription<Option<TimerState>> {
        Subscription {
            receiver: self.timer.subscribe(),
        }
    }

    /// Merge-write a patch into the timer document and publish the result.
    pub async fn write_timer_state(&self, patch: TimerPatch) -> Result<TimerState, ServiceError> {
        let backend = self.backend().await?;
        let entity = backend.merge_timer(patch).await?;
        self.timer_writes.fetch_add(1, Ordering::AcqRel);
        let state = TimerState::from(entity);
        self.publish_timer(Some(state.clone()), None);
        Ok(state)
    }

    /// Append a record; the store assigns its identifier.
    pub async fn append_record(&self, record: NewRecordEntity) -> Result<Record, ServiceError> {
        let backend = self.backend().await?;
        let created = Record::from(backend.insert_record(record).await?);
        let generation = self.record_writes.fetch_add(1, Ordering::AcqRel) + 1;
        self.reload_records(&backend, generation).await;
        Ok(created)
    }

    /// Subscribe to the capped, newest-first record listing.
    pub fn subscribe_records(&self) -> Subscription<Vec<Record>> {
        Subscription {
            receiver: self.records.subscribe(),
        }
    }

    /// Delete a record. Returns `false` when the identifier was unknown.
    pub async fn delete_record(&self, id: Uuid) -> Result<bool, ServiceError> {
        let backend = self.backend().await?;
        let deleted = backend.delete_record(id).await?;
        if deleted {
            let generation = self.record_writes.fetch_add(1, Ordering::AcqRel) + 1;
            self.reload_records(&backend, generation).await;
        }
        Ok(deleted)
    }

    /// Newest-first listing, capped at [`RECORD_LIST_LIMIT`].
    pub async fn list_records(&self) -> Result<Vec<Record>, ServiceError> {
        let backend = self.backend().await?;
        let generation = self.record_writes.load(Ordering::Acquire);
        let records: Vec<Record> = backend
            .list_records(RECORD_LIST_LIMIT)
            .await?
            .into_iter()
            .map(Record::from)
            .collect();
        self.publish_records(records.clone(), generation);
        Ok(records)
    }

    /// Re-read both documents so writes from other processes reach local subscribers.
    pub async fn refresh(&self) -> Result<(), ServiceError> {
        self.read_timer_state().await?;
        self.list_records().await?;
        Ok(())
    }

    /// Probe the installed backend.
    pub async fn health_check(&self) -> Result<(), ServiceError> {
        let backend = self.backend().await?;
        backend.health_check().await?;
        Ok(())
    }

    async fn reload_records(&self, backend: &Arc<dyn TimerStore>, generation: u64) {
        match backend.list_records(RECORD_LIST_LIMIT).await {
            Ok(records) => self.publish_records(
                records.into_iter().map(Record::from).collect(),
                generation,
            ),
            Err(err) => warn!(error = %err, "failed to reload records after write"),
        }
    }

    /// `read_generation` is the write counter sampled before a read; writes pass `None`.
    fn publish_timer(&self, state: Option<TimerState>, read_generation: Option<u64>) {
        let changed = publish_unless_stale(&self.timer, &self.timer_writes, read_generation, state);
        if changed {
            debug!("published timer document");
        }
    }

    fn publish_records(&self, records: Vec<Record>, generation: u64) {
        publish_unless_stale(
            &self.records,
            &self.record_writes,
            Some(generation),
            records,
        );
    }
}

/// Replace the watched value unless a write committed after `generation` was sampled.
///
/// The check runs under the watch lock, so it cannot interleave with another publish.
fn publish_unless_stale<T: PartialEq>(
    sender: &watch::Sender<T>,
    writes: &AtomicU64,
    generation: Option<u64>,
    value: T,
) -> bool {
    sender.send_if_modified(|current| {
        let stale = generation.is_some_and(|seen| writes.load(Ordering::Acquire) != seen);
        if stale || *current == value {
            return false;
        }
        *current = value;
        true
    })
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::AtomicBool,
        time::{Duration, SystemTime},
    };

    use futures::future::BoxFuture;
    use tokio::sync::Notify;

    use super::*;
    use crate::dao::{
        models::{RecordEntity, TimerEntity},
        storage::StorageResult,
        timer_store::memory::MemoryTimerStore,
    };

    /// Memory backend whose next armed read holds its result until released.
    #[derive(Clone, Default)]
    struct StallingReads {
        inner: MemoryTimerStore,
        armed: Arc<AtomicBool>,
        loaded: Arc<Notify>,
        release: Arc<Notify>,
    }

    impl StallingReads {
        fn arm(&self) {
            self.armed.store(true, Ordering::SeqCst);
        }

        async fn hold<T>(self, result: T) -> T {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.loaded.notify_one();
                self.release.notified().await;
            }
            result
        }
    }

    impl TimerStore for StallingReads {
        fn load_timer(&self) -> BoxFuture<'static, StorageResult<Option<TimerEntity>>> {
            let this = self.clone();
            let load = self.inner.load_timer();
            Box::pin(async move { this.hold(load.await).await })
        }

        fn merge_timer(&self, patch: TimerPatch) -> BoxFuture<'static, StorageResult<TimerEntity>> {
            self.inner.merge_timer(patch)
        }

        fn insert_record(
            &self,
            record: NewRecordEntity,
        ) -> BoxFuture<'static, StorageResult<RecordEntity>> {
            self.inner.insert_record(record)
        }

        fn delete_record(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.delete_record(id)
        }

        fn list_records(
            &self,
            limit: usize,
        ) -> BoxFuture<'static, StorageResult<Vec<RecordEntity>>> {
            let this = self.clone();
            let list = self.inner.list_records(limit);
            Box::pin(async move { this.hold(list.await).await })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    async fn installed() -> (SharedStore, MemoryTimerStore) {
        let backend = MemoryTimerStore::new();
        let store = SharedStore::new();
        store.install(Arc::new(backend.clone())).await;
        (store, backend)
    }

    fn record(team: &str, secs: u64) -> NewRecordEntity {
        NewRecordEntity {
            team_name: team.into(),
            completed_at: at(secs),
            password_entered_at: at(secs),
            elapsed_time: 100,
            remaining_time: 800,
        }
    }

    #[tokio::test]
    async fn starts_degraded_without_backend() {
        let store = SharedStore::new();
        assert!(store.is_degraded());
        assert!(matches!(
            store.read_timer_state().await,
            Err(ServiceError::Degraded)
        ));
    }

    #[tokio::test]
    async fn writes_reach_subscribers() {
        let (store, _) = installed().await;
        let mut subscription = store.subscribe_timer_state();
        assert_eq!(subscription.current(), None);

        let written = store
            .write_timer_state(TimerPatch {
                team_name: Some("Team A".into()),
                updated_at: Some(at(5)),
                ..TimerPatch::default()
            })
            .await
            .unwrap();

        let pushed = subscription.changed().await.unwrap();
        assert_eq!(pushed, Some(written.clone()));
        assert_eq!(store.read_timer_state().await.unwrap(), Some(written));
    }

    #[tokio::test]
    async fn refresh_picks_up_foreign_writes() {
        let (store, backend) = installed().await;
        let mut subscription = store.subscribe_timer_state();
        subscription.current();

        backend
            .merge_timer(TimerPatch {
                team_name: Some("Elsewhere".into()),
                ..TimerPatch::default()
            })
            .await
            .unwrap();
        store.refresh().await.unwrap();

        let pushed = subscription.changed().await.unwrap().unwrap();
        assert_eq!(pushed.team_name, "Elsewhere");
    }

    #[tokio::test]
    async fn record_feed_tracks_appends_and_deletes() {
        let (store, _) = installed().await;
        let mut records = store.subscribe_records();

        let first = store.append_record(record("Team A", 10)).await.unwrap();
        assert_eq!(records.changed().await.unwrap(), vec![first.clone()]);

        let second = store.append_record(record("Team A", 20)).await.unwrap();
        assert_eq!(
            records.changed().await.unwrap(),
            vec![second.clone(), first.clone()]
        );

        assert!(store.delete_record(first.id).await.unwrap());
        assert!(!store.delete_record(first.id).await.unwrap());
        assert_eq!(records.changed().await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn backend_failure_surfaces_as_unavailable() {
        let (store, backend) = installed().await;
        backend.set_offline(true);
        assert!(matches!(
            store.write_timer_state(TimerPatch::default()).await,
            Err(ServiceError::Unavailable(_))
        ));
        assert!(store.health_check().await.is_err());
    }

    #[tokio::test]
    async fn clear_enters_degraded_mode() {
        let (store, _) = installed().await;
        let mut watcher = store.degraded_watcher();
        assert!(!store.is_degraded());

        store.clear().await;
        watcher.changed().await.unwrap();
        assert!(*watcher.borrow());
        assert!(matches!(store.list_records().await, Err(ServiceError::Degraded)));
    }

    #[tokio::test]
    async fn slow_read_does_not_roll_back_a_newer_write() {
        let backend = StallingReads::default();
        let store = Arc::new(SharedStore::new());
        store.install(Arc::new(backend.clone())).await;
        store
            .write_timer_state(TimerPatch {
                team_name: Some("Team A".into()),
                is_running: Some(true),
                updated_at: Some(at(10)),
                ..TimerPatch::default()
            })
            .await
            .unwrap();
        let mut subscription = store.subscribe_timer_state();

        backend.arm();
        let reader = tokio::spawn({
            let store = store.clone();
            async move { store.read_timer_state().await }
        });
        backend.loaded.notified().await;

        let paused = store
            .write_timer_state(TimerPatch {
                is_running: Some(false),
                is_paused: Some(true),
                updated_at: Some(at(20)),
                ..TimerPatch::default()
            })
            .await
            .unwrap();
        backend.release.notify_one();

        let read = reader.await.unwrap().unwrap().unwrap();
        assert!(read.is_running);
        assert_eq!(subscription.current(), Some(paused));
    }

    #[tokio::test]
    async fn slow_listing_does_not_hide_a_new_record() {
        let backend = StallingReads::default();
        let store = Arc::new(SharedStore::new());
        store.install(Arc::new(backend.clone())).await;
        let mut records = store.subscribe_records();

        backend.arm();
        let lister = tokio::spawn({
            let store = store.clone();
            async move { store.list_records().await }
        });
        backend.loaded.notified().await;

        let created = store.append_record(record("Team A", 10)).await.unwrap();
        backend.release.notify_one();

        assert!(lister.await.unwrap().unwrap().is_empty());
        assert_eq!(records.current(), vec![created]);
    }
}
