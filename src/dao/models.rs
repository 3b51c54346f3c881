use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::timer::DURATION_SECS;

/// Singleton timer document persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerEntity {
    /// Team currently on the clock; empty when idle.
    pub team_name: String,
    /// Instant from which elapsed time is measured while running.
    pub anchor_time: Option<SystemTime>,
    /// Countdown is live.
    pub is_running: bool,
    /// Countdown is frozen.
    pub is_paused: bool,
    /// Remaining seconds snapshot.
    pub remaining_seconds: u32,
    /// Early-stop secret; absent means the built-in default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Last time a merge-write touched the document.
    pub updated_at: SystemTime,
}

impl Default for TimerEntity {
    fn default() -> Self {
        Self {
            team_name: String::new(),
            anchor_time: None,
            is_running: false,
            is_paused: false,
            remaining_seconds: DURATION_SECS,
            password: None,
            updated_at: SystemTime::UNIX_EPOCH,
        }
    }
}

/// Field-level merge-write against the timer document.
///
/// `None` leaves the stored field untouched. `anchor_time` is doubly optional so
/// a patch can clear the anchor (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerPatch {
    /// New team name.
    pub team_name: Option<String>,
    /// New anchor; `Some(None)` clears it.
    pub anchor_time: Option<Option<SystemTime>>,
    /// New running flag.
    pub is_running: Option<bool>,
    /// New paused flag.
    pub is_paused: Option<bool>,
    /// New remaining snapshot.
    pub remaining_seconds: Option<u32>,
    /// New early-stop secret.
    pub password: Option<String>,
    /// Write time stamped by the caller.
    pub updated_at: Option<SystemTime>,
}

impl TimerPatch {
    /// Merge the patch into an existing (or freshly defaulted) document.
    pub fn apply_to(&self, entity: &mut TimerEntity) {
        if let Some(team_name) = &self.team_name {
            entity.team_name = team_name.clone();
        }
        if let Some(anchor_time) = self.anchor_time {
            entity.anchor_time = anchor_time;
        }
        if let Some(is_running) = self.is_running {
            entity.is_running = is_running;
        }
        if let Some(is_paused) = self.is_paused {
            entity.is_paused = is_paused;
        }
        if let Some(remaining) = self.remaining_seconds {
            entity.remaining_seconds = remaining;
        }
        if let Some(password) = &self.password {
            entity.password = Some(password.clone());
        }
        if let Some(updated_at) = self.updated_at {
            entity.updated_at = updated_at;
        }
    }
}

/// Completion record persisted in the append-only records collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordEntity {
    /// Store-assigned identifier.
    pub id: Uuid,
    /// Team that entered the password.
    pub team_name: String,
    /// When the run was completed.
    pub completed_at: SystemTime,
    /// When the password was accepted.
    pub password_entered_at: SystemTime,
    /// Seconds used.
    pub elapsed_time: u32,
    /// Seconds left on the clock.
    pub remaining_time: u32,
}

/// Record payload before the store assigns an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecordEntity {
    /// Team that finished.
    pub team_name: String,
    /// Commit time.
    pub completed_at: SystemTime,
    /// When the password was accepted.
    pub password_entered_at: SystemTime,
    /// Seconds used.
    pub elapsed_time: u32,
    /// Seconds left.
    pub remaining_time: u32,
}

impl NewRecordEntity {
    /// Attach the identifier chosen by the store.
    pub fn with_id(self, id: Uuid) -> RecordEntity {
        RecordEntity {
            id,
            team_name: self.team_name,
            completed_at: self.completed_at,
            password_entered_at: self.password_entered_at,
            elapsed_time: self.elapsed_time,
            remaining_time: self.remaining_time,
        }
    }
}

/// Sort records newest first and keep at most `limit` entries.
pub fn newest_first(mut records: Vec<RecordEntity>, limit: usize) -> Vec<RecordEntity> {
    records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    records.truncate(limit);
    records
}
