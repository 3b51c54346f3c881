use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::doc,
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoRecordDocument, MongoTimerDocument, merge_update, record_filter, timer_filter},
};
use crate::dao::{
    models::{NewRecordEntity, RecordEntity, TimerEntity, TimerPatch},
    storage::StorageResult,
    timer_store::TimerStore,
};

const TIMER_COLLECTION_NAME: &str = "timer";
const RECORD_COLLECTION_NAME: &str = "records";

/// [`TimerStore`] backed by a MongoDB database.
#[derive(Clone)]
pub struct MongoTimerStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoTimerStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.record_collection().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! { "completed_at": -1 })
            .options(
                IndexOptions::builder()
                    .name(Some("record_completed_at_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: RECORD_COLLECTION_NAME,
                index: "completed_at",
                source,
            })?;

        Ok(())
    }

    async fn timer_collection(&self) -> Collection<MongoTimerDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoTimerDocument>(TIMER_COLLECTION_NAME)
    }

    async fn record_collection(&self) -> Collection<MongoRecordDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoRecordDocument>(RECORD_COLLECTION_NAME)
    }

    async fn load_timer(&self) -> MongoResult<Option<TimerEntity>> {
        let collection = self.timer_collection().await;
        let document = collection
            .find_one(timer_filter())
            .await
            .map_err(|source| MongoDaoError::LoadTimer { source })?;
        Ok(document.map(Into::into))
    }

    async fn merge_timer(&self, patch: TimerPatch) -> MongoResult<TimerEntity> {
        let collection = self.timer_collection().await;
        let document = collection
            .find_one_and_update(timer_filter(), merge_update(&patch))
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::MergeTimer { source })?
            .ok_or(MongoDaoError::MergeReturnedNothing)?;
        Ok(document.into())
    }

    async fn insert_record(&self, record: NewRecordEntity) -> MongoResult<RecordEntity> {
        let id = Uuid::new_v4();
        let document = MongoRecordDocument::new(id, record);
        let collection = self.record_collection().await;
        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::InsertRecord { id, source })?;
        document.try_into_entity()
    }

    async fn delete_record(&self, id: Uuid) -> MongoResult<bool> {
        let collection = self.record_collection().await;
        let result = collection
            .delete_one(record_filter(id))
            .await
            .map_err(|source| MongoDaoError::DeleteRecord { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn list_records(&self, limit: usize) -> MongoResult<Vec<RecordEntity>> {
        let collection = self.record_collection().await;
        let documents: Vec<MongoRecordDocument> = collection
            .find(doc! {})
            .sort(doc! { "completed_at": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(|source| MongoDaoError::ListRecords { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListRecords { source })?;

        documents
            .into_iter()
            .map(MongoRecordDocument::try_into_entity)
            .collect()
    }
}

impl TimerStore for MongoTimerStore {
    fn load_timer(&self) -> BoxFuture<'static, StorageResult<Option<TimerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_timer().await.map_err(Into::into) })
    }

    fn merge_timer(&self, patch: TimerPatch) -> BoxFuture<'static, StorageResult<TimerEntity>> {
        let store = self.clone();
        Box::pin(async move { store.merge_timer(patch).await.map_err(Into::into) })
    }

    fn insert_record(
        &self,
        record: NewRecordEntity,
    ) -> BoxFuture<'static, StorageResult<RecordEntity>> {
        let store = self.clone();
        Box::pin(async move { store.insert_record(record).await.map_err(Into::into) })
    }

    fn delete_record(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_record(id).await.map_err(Into::into) })
    }

    fn list_records(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<RecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_records(limit).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
