use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::CouchDaoError;
use crate::dao::models::{NewRecordEntity, RecordEntity, TimerEntity};

pub const TIMER_DOC_ID: &str = "timer::current";
pub const RECORD_PREFIX: &str = "record::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[allow(dead_code)]
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Revision metadata returned by CouchDB on GET.
#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    #[serde(rename = "_rev")]
    pub rev: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchTimerDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub timer: TimerEntity,
}

impl CouchTimerDocument {
    pub fn new(timer: TimerEntity, rev: Option<String>) -> Self {
        Self {
            id: TIMER_DOC_ID.to_owned(),
            rev,
            timer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRecordDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub record: RecordBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordBody {
    pub team_name: String,
    pub completed_at: SystemTime,
    pub password_entered_at: SystemTime,
    pub elapsed_time: u32,
    pub remaining_time: u32,
}

impl CouchRecordDocument {
    pub fn new(id: Uuid, record: NewRecordEntity) -> Self {
        Self {
            id: record_doc_id(id),
            rev: None,
            record: RecordBody {
                team_name: record.team_name,
                completed_at: record.completed_at,
                password_entered_at: record.password_entered_at,
                elapsed_time: record.elapsed_time,
                remaining_time: record.remaining_time,
            },
        }
    }
}

impl TryFrom<CouchRecordDocument> for RecordEntity {
    type Error = CouchDaoError;

    fn try_from(doc: CouchRecordDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: extract_uuid(&doc.id)?,
            team_name: doc.record.team_name,
            completed_at: doc.record.completed_at,
            password_entered_at: doc.record.password_entered_at,
            elapsed_time: doc.record.elapsed_time,
            remaining_time: doc.record.remaining_time,
        })
    }
}

pub fn record_doc_id(id: Uuid) -> String {
    format!("{}{}", RECORD_PREFIX, id)
}

pub fn extract_uuid(doc_id: &str) -> Result<Uuid, CouchDaoError> {
    let (_, id) = doc_id
        .split_once("::")
        .ok_or_else(|| CouchDaoError::InvalidDocId {
            doc_id: doc_id.to_string(),
            kind: "missing separator",
        })?;

    Uuid::parse_str(id).map_err(|_| CouchDaoError::InvalidDocId {
        doc_id: doc_id.to_string(),
        kind: "invalid UUID",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ids_round_trip_through_prefix() {
        let id = Uuid::new_v4();
        assert_eq!(extract_uuid(&record_doc_id(id)).unwrap(), id);
        assert!(extract_uuid("record-no-separator").is_err());
        assert!(extract_uuid("record::not-a-uuid").is_err());
    }

    #[test]
    fn timer_document_flattens_entity_fields() {
        let document = CouchTimerDocument::new(TimerEntity::default(), Some("1-abc".into()));
        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["_id"], TIMER_DOC_ID);
        assert_eq!(value["_rev"], "1-abc");
        assert_eq!(value["remaining_seconds"], 900);
        assert!(value.get("password").is_none());

        let back: CouchTimerDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back.timer, TimerEntity::default());
    }
}
