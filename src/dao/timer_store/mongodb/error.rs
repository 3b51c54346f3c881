use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures raised by the MongoDB timer store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to load the timer document")]
    LoadTimer {
        #[source]
        source: MongoError,
    },
    #[error("failed to merge into the timer document")]
    MergeTimer {
        #[source]
        source: MongoError,
    },
    #[error("upsert of the timer document returned nothing")]
    MergeReturnedNothing,
    #[error("failed to insert record `{id}`")]
    InsertRecord {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete record `{id}`")]
    DeleteRecord {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list records")]
    ListRecords {
        #[source]
        source: MongoError,
    },
    #[error("stored record identifier `{value}` is not a UUID")]
    InvalidRecordId {
        value: String,
        #[source]
        source: uuid::Error,
    },
}
