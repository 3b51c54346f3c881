#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{NewRecordEntity, RecordEntity, TimerEntity, TimerPatch};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the document store holding the timer singleton and the records collection.
pub trait TimerStore: Send + Sync {
    fn load_timer(&self) -> BoxFuture<'static, StorageResult<Option<TimerEntity>>>;
    /// Merge the patch into the singleton, creating it from defaults when absent.
    fn merge_timer(&self, patch: TimerPatch) -> BoxFuture<'static, StorageResult<TimerEntity>>;
    fn insert_record(&self, record: NewRecordEntity)
    -> BoxFuture<'static, StorageResult<RecordEntity>>;
    /// Returns `false` when no record carried this identifier.
    fn delete_record(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Newest first, at most `limit` entries.
    fn list_records(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<RecordEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
