use mongodb::bson::{Bson, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{NewRecordEntity, RecordEntity, TimerEntity, TimerPatch};

/// Fixed `_id` of the timer singleton.
pub const TIMER_DOC_ID: &str = "current";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTimerDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    team_name: String,
    #[serde(default)]
    anchor_time: Option<DateTime>,
    #[serde(default)]
    is_running: bool,
    #[serde(default)]
    is_paused: bool,
    remaining_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    updated_at: DateTime,
}

impl From<MongoTimerDocument> for TimerEntity {
    fn from(value: MongoTimerDocument) -> Self {
        Self {
            team_name: value.team_name,
            anchor_time: value.anchor_time.map(DateTime::to_system_time),
            is_running: value.is_running,
            is_paused: value.is_paused,
            remaining_seconds: u32::try_from(value.remaining_seconds.max(0)).unwrap_or(u32::MAX),
            password: value.password,
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

/// Translate a patch into an upsert: patched fields go to `$set`, the
/// remaining defaults to `$setOnInsert` so a first write creates a full document.
pub fn merge_update(patch: &TimerPatch) -> Document {
    let mut set = Document::new();
    if let Some(team_name) = &patch.team_name {
        set.insert("team_name", team_name.clone());
    }
    if let Some(anchor_time) = patch.anchor_time {
        let value = anchor_time
            .map(|at| Bson::DateTime(DateTime::from_system_time(at)))
            .unwrap_or(Bson::Null);
        set.insert("anchor_time", value);
    }
    if let Some(is_running) = patch.is_running {
        set.insert("is_running", is_running);
    }
    if let Some(is_paused) = patch.is_paused {
        set.insert("is_paused", is_paused);
    }
    if let Some(remaining) = patch.remaining_seconds {
        set.insert("remaining_seconds", i64::from(remaining));
    }
    if let Some(password) = &patch.password {
        set.insert("password", password.clone());
    }
    if let Some(updated_at) = patch.updated_at {
        set.insert("updated_at", DateTime::from_system_time(updated_at));
    }

    let defaults = TimerEntity::default();
    let on_insert: Document = [
        ("team_name", Bson::String(defaults.team_name)),
        ("anchor_time", Bson::Null),
        ("is_running", Bson::Boolean(defaults.is_running)),
        ("is_paused", Bson::Boolean(defaults.is_paused)),
        (
            "remaining_seconds",
            Bson::Int64(i64::from(defaults.remaining_seconds)),
        ),
        (
            "updated_at",
            Bson::DateTime(DateTime::from_system_time(defaults.updated_at)),
        ),
    ]
    .into_iter()
    .filter(|(key, _)| !set.contains_key(*key))
    .map(|(key, value)| (key.to_owned(), value))
    .collect();

    let mut update = Document::new();
    if !set.is_empty() {
        update.insert("$set", set);
    }
    if !on_insert.is_empty() {
        update.insert("$setOnInsert", on_insert);
    }
    update
}

pub fn timer_filter() -> Document {
    doc! { "_id": TIMER_DOC_ID }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRecordDocument {
    #[serde(rename = "_id")]
    id: String,
    team_name: String,
    completed_at: DateTime,
    password_entered_at: DateTime,
    elapsed_time: i64,
    remaining_time: i64,
}

impl MongoRecordDocument {
    pub fn new(id: Uuid, record: NewRecordEntity) -> Self {
        Self {
            id: id.to_string(),
            team_name: record.team_name,
            completed_at: DateTime::from_system_time(record.completed_at),
            password_entered_at: DateTime::from_system_time(record.password_entered_at),
            elapsed_time: i64::from(record.elapsed_time),
            remaining_time: i64::from(record.remaining_time),
        }
    }

    pub fn try_into_entity(self) -> MongoResult<RecordEntity> {
        let id = Uuid::parse_str(&self.id).map_err(|source| MongoDaoError::InvalidRecordId {
            value: self.id.clone(),
            source,
        })?;
        Ok(RecordEntity {
            id,
            team_name: self.team_name,
            completed_at: self.completed_at.to_system_time(),
            password_entered_at: self.password_entered_at.to_system_time(),
            elapsed_time: clamp_u32(self.elapsed_time),
            remaining_time: clamp_u32(self.remaining_time),
        })
    }
}

pub fn record_filter(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

fn clamp_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
