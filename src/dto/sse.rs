use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::timer::{RecordSummary, TimerSnapshot};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Plain-text event.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`public` or `admin`).
    pub stream: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// `timer.state`: a new document was pushed.
pub struct TimerStateEvent(pub TimerSnapshot);

#[derive(Debug, Serialize, ToSchema)]
/// `timer.tick`: locally derived countdown value.
pub struct TimerTickEvent {
    pub remaining_seconds: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// `timer.expired`: the countdown reached zero.
pub struct TimerExpiredEvent {
    pub team_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// `timer.completed`: a team stopped the clock with the password.
pub struct TimerCompletedEvent {
    pub record: RecordSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// `records.updated`: the newest-first record listing changed.
pub struct RecordsUpdatedEvent {
    pub records: Vec<RecordSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
/// `session.ended`: the admin session behind this stream was closed.
pub struct SessionEndedEvent {
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}
