use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        sse::{ServerEvent, SystemStatus, TimerCompletedEvent},
        timer::RecordSummary,
    },
    state::{SharedState, SseHub, record::Record},
};

/// Full timer snapshot pushed on every published change.
pub const EVENT_TIMER_STATE: &str = "timer.state";
/// Locally derived remaining seconds, once per second.
pub const EVENT_TIMER_TICK: &str = "timer.tick";
/// The countdown reached zero.
pub const EVENT_TIMER_EXPIRED: &str = "timer.expired";
/// A team entered the password in time.
pub const EVENT_TIMER_COMPLETED: &str = "timer.completed";
/// Fresh record listing (admin only).
pub const EVENT_RECORDS_UPDATED: &str = "records.updated";
/// The admin session behind the stream was closed.
pub const EVENT_SESSION_ENDED: &str = "session.ended";
/// Degraded flag changes (admin only).
pub const EVENT_SYSTEM_STATUS: &str = "system.status";
/// Free-form operator message.
pub const EVENT_INFO: &str = "info";

/// Announce a password completion to every view.
pub fn broadcast_completed(state: &SharedState, record: &Record) {
    let payload = TimerCompletedEvent {
        record: RecordSummary::from(record.clone()),
    };
    send_public_event(state, EVENT_TIMER_COMPLETED, &payload);
    send_admin_event(state, EVENT_TIMER_COMPLETED, &payload);
}

/// Send a human-readable info message onto both streams.
pub fn broadcast_info(state: &SharedState, message: &str) {
    let event = || ServerEvent::new(Some(EVENT_INFO.to_string()), message.to_string());
    state.public_sse().broadcast(event());
    state.admin_sse().broadcast(event());
}

/// Tell admins whether timer commands are currently refused.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_admin_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

/// Serialize `payload` into a named event, logging instead of failing.
pub fn encode(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(encoded) => Some(encoded),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    send(state.public_sse(), event, payload);
}

fn send_admin_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    send(state.admin_sse(), event, payload);
}

fn send(hub: &SseHub, event: &str, payload: &impl Serialize) {
    if let Some(encoded) = encode(event, payload) {
        hub.broadcast(encoded);
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use uuid::Uuid;

    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[tokio::test]
    async fn completion_reaches_both_streams() {
        let state = AppState::new(&AppConfig::default());
        let mut public = state.public_sse().subscribe();
        let mut admin = state.admin_sse().subscribe();

        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let record = Record {
            id: Uuid::nil(),
            team_name: "Team A".into(),
            completed_at: at,
            password_entered_at: at,
            elapsed_time: 600,
            remaining_time: 300,
        };
        broadcast_completed(&state, &record);

        for event in [public.recv().await.unwrap(), admin.recv().await.unwrap()] {
            assert_eq!(event.event.as_deref(), Some(EVENT_TIMER_COMPLETED));
            let body: serde_json::Value = serde_json::from_str(&event.data).unwrap();
            assert_eq!(body["record"]["team_name"], "Team A");
            assert_eq!(body["record"]["remaining_time"], 300);
        }
    }

    #[tokio::test]
    async fn system_status_is_admin_only() {
        let state = AppState::new(&AppConfig::default());
        let mut public = state.public_sse().subscribe();
        let mut admin = state.admin_sse().subscribe();

        broadcast_system_status(&state, true);
        let event = admin.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some(EVENT_SYSTEM_STATUS));
        assert_eq!(event.data, r#"{"degraded":true}"#);
        assert!(public.try_recv().is_err());
    }
}
