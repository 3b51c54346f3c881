use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use uuid::Uuid;

use crate::dao::{
    models::{NewRecordEntity, RecordEntity, TimerEntity, TimerPatch, newest_first},
    storage::StorageResult,
    timer_store::TimerStore,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchRecordDocument, CouchTimerDocument, END_SUFFIX, RECORD_PREFIX,
        RevisionOnly, TIMER_DOC_ID, record_doc_id,
    },
};

/// Attempts made by a read-modify-write before giving up on revision conflicts.
const MERGE_ATTEMPTS: usize = 3;

/// Outcome of a PUT against a document endpoint.
enum PutOutcome {
    Written,
    Conflict,
}

/// [`TimerStore`] backed by a CouchDB database over HTTP.
#[derive(Clone)]
pub struct CouchTimerStore {
    client: Client,
    config: Arc<CouchConfig>,
}

impl CouchTimerStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            config: Arc::new(config),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.credentials {
            Some(creds) => builder.basic_auth(&creds.username, Some(&creds.password)),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.config.document_url(path);
        self.with_auth(self.client.request(method, url))
    }

    fn database_url(&self) -> String {
        self.config.document_url("")
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.config.database.clone();
        let url = self.database_url();

        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .with_auth(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    tracing::info!(database = %database, "Created CouchDB database");
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<PutOutcome>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(PutOutcome::Conflict),
            status if status.is_success() => Ok(PutOutcome::Written),
            status => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status,
            }),
        }
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: ALL_DOCS.to_string(),
                    source,
                })
            })
            .collect()
    }

    /// Read the singleton, merge the patch and write it back under the read revision.
    async fn merge_timer(&self, patch: TimerPatch) -> CouchResult<TimerEntity> {
        for attempt in 1..=MERGE_ATTEMPTS {
            let existing = self
                .get_document::<CouchTimerDocument>(TIMER_DOC_ID)
                .await?;
            let (mut timer, rev) = match existing {
                Some(doc) => (doc.timer, doc.rev),
                None => (TimerEntity::default(), None),
            };
            patch.apply_to(&mut timer);

            let document = CouchTimerDocument::new(timer, rev);
            match self.put_document(TIMER_DOC_ID, &document).await? {
                PutOutcome::Written => return Ok(document.timer),
                PutOutcome::Conflict => {
                    tracing::debug!(attempt, "Timer document revision conflict, retrying merge");
                }
            }
        }

        Err(CouchDaoError::Conflict {
            path: TIMER_DOC_ID.to_owned(),
        })
    }

    async fn insert_record(&self, record: NewRecordEntity) -> CouchResult<RecordEntity> {
        let id = Uuid::new_v4();
        let document = CouchRecordDocument::new(id, record);
        match self.put_document(&document.id, &document).await? {
            PutOutcome::Written => RecordEntity::try_from(document),
            PutOutcome::Conflict => Err(CouchDaoError::Conflict { path: document.id }),
        }
    }

    async fn delete_record(&self, id: Uuid) -> CouchResult<bool> {
        let doc_id = record_doc_id(id);
        let Some(existing) = self.get_document::<RevisionOnly>(&doc_id).await? else {
            return Ok(false);
        };

        let response = self
            .request(Method::DELETE, &doc_id)
            .query(&[("rev", existing.rev.as_str())])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(CouchDaoError::RequestStatus {
                path: doc_id,
                status,
            }),
        }
    }

    async fn list_records(&self, limit: usize) -> CouchResult<Vec<RecordEntity>> {
        let records = self
            .list_documents::<CouchRecordDocument>(RECORD_PREFIX)
            .await?
            .into_iter()
            .map(RecordEntity::try_from)
            .collect::<CouchResult<Vec<_>>>()?;
        Ok(newest_first(records, limit))
    }

    async fn ping(&self) -> CouchResult<()> {
        let url = self.database_url();
        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: url,
                status: response.status(),
            })
        }
    }
}

impl TimerStore for CouchTimerStore {
    fn load_timer(&self) -> BoxFuture<'static, StorageResult<Option<TimerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .get_document::<CouchTimerDocument>(TIMER_DOC_ID)
                .await?;
            Ok(document.map(|doc| doc.timer))
        })
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
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
