//! Timer and record projections shared by the REST and SSE surfaces.

use std::time::SystemTime;

use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    state::{
        record::Record,
        timer::{DURATION_SECS, TimerPhase, TimerState},
    },
};

/// Phase label rendered by views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl From<TimerPhase> for TimerStatus {
    fn from(value: TimerPhase) -> Self {
        match value {
            TimerPhase::Idle => TimerStatus::Idle,
            TimerPhase::Running => TimerStatus::Running,
            TimerPhase::Paused => TimerStatus::Paused,
            TimerPhase::Stopped => TimerStatus::Stopped,
        }
    }
}

/// Timer document as seen by a view at a given instant.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TimerSnapshot {
    pub team_name: String,
    pub status: TimerStatus,
    /// Remaining seconds derived at snapshot time.
    pub remaining_seconds: u32,
    /// Full run length, in seconds.
    pub duration_seconds: u32,
    pub is_running: bool,
    pub is_paused: bool,
    /// RFC 3339 anchor the countdown is derived from, while one is set.
    pub anchor_time: Option<String>,
    pub updated_at: String,
}

impl TimerSnapshot {
    /// Project `state`, deriving the remaining time at `now`.
    pub fn at(state: &TimerState, now: SystemTime) -> Self {
        Self {
            team_name: state.team_name.clone(),
            status: state.phase().into(),
            remaining_seconds: state.remaining_at(now),
            duration_seconds: DURATION_SECS,
            is_running: state.is_running,
            is_paused: state.is_paused,
            anchor_time: state.anchor_time.map(format_system_time),
            updated_at: format_system_time(state.updated_at),
        }
    }
}

/// Completion record returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RecordSummary {
    pub id: Uuid,
    pub team_name: String,
    pub completed_at: String,
    pub password_entered_at: String,
    pub elapsed_time: u32,
    pub remaining_time: u32,
}

impl From<Record> for RecordSummary {
    fn from(value: Record) -> Self {
        Self {
            id: value.id,
            team_name: value.team_name,
            completed_at: format_system_time(value.completed_at),
            password_entered_at: format_system_time(value.password_entered_at),
            elapsed_time: value.elapsed_time,
            remaining_time: value.remaining_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn snapshot_derives_remaining_and_formats_times() {
        let anchor = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let state = TimerState {
            team_name: "Team A".into(),
            anchor_time: Some(anchor),
            is_running: true,
            updated_at: anchor,
            ..TimerState::default()
        };

        let snapshot = TimerSnapshot::at(&state, anchor + Duration::from_secs(300));
        assert_eq!(snapshot.status, TimerStatus::Running);
        assert_eq!(snapshot.remaining_seconds, 600);
        assert_eq!(
            snapshot.anchor_time.as_deref(),
            Some("2023-11-14T22:13:20Z")
        );

        let json = serde_json::to_value(TimerSnapshot::at(&TimerState::default(), anchor)).unwrap();
        assert_eq!(json["status"], "idle");
        assert!(json.get("anchor_time").is_none());
        assert!(json.get("password").is_none());
    }
}
