use std::time::SystemTime;

use uuid::Uuid;

use crate::dao::models::RecordEntity;

/// Maximum number of records exposed by listings and subscriptions.
pub const RECORD_LIST_LIMIT: usize = 50;

/// Completion of a run, written when a team enters the password in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Store-assigned identifier.
    pub id: Uuid,
    /// Team that finished.
    pub team_name: String,
    /// When the record was committed.
    pub completed_at: SystemTime,
    /// When the winning password was accepted.
    pub password_entered_at: SystemTime,
    /// Seconds used, always `DURATION_SECS - remaining_time`.
    pub elapsed_time: u32,
    /// Seconds left on the clock at the stop.
    pub remaining_time: u32,
}

impl From<RecordEntity> for Record {
    fn from(value: RecordEntity) -> Self {
        Self {
            id: value.id,
            team_name: value.team_name,
            completed_at: value.completed_at,
            password_entered_at: value.password_entered_at,
            elapsed_time: value.elapsed_time,
            remaining_time: value.remaining_time,
        }
    }
}
