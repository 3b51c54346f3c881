//! SSE views: each connection owns a tick driver plus the shared hub feeds.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dto::{
        sse::{
            Handshake, RecordsUpdatedEvent, ServerEvent, SessionEndedEvent, TimerExpiredEvent,
            TimerStateEvent, TimerTickEvent,
        },
        timer::{RecordSummary, TimerSnapshot},
    },
    error::ServiceError,
    services::{
        auth_service,
        sse_events::{
            EVENT_RECORDS_UPDATED, EVENT_SESSION_ENDED, EVENT_TIMER_EXPIRED, EVENT_TIMER_STATE,
            EVENT_TIMER_TICK, encode,
        },
        tick_driver::{self, ViewEvent},
        timer_service::AutoStop,
    },
    state::{
        SharedState,
        auth::AuthChange,
        record::Record,
        store::Subscription,
        timer::TimerState,
    },
};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
const VIEW_CHANNEL_CAPACITY: usize = 16;

/// Which stream a connection is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamKind {
    Public,
    /// Bound to the admin session that opened it.
    Admin { token: String },
}

impl StreamKind {
    fn label(&self) -> &'static str {
        match self {
            StreamKind::Public => "public",
            StreamKind::Admin { .. } => "admin",
        }
    }
}

/// Open the public view.
pub fn open_public(state: &SharedState) -> mpsc::Receiver<ServerEvent> {
    open_stream(state, StreamKind::Public)
}

/// Open an admin view after checking its session token.
pub fn open_admin(
    state: &SharedState,
    token: &str,
) -> Result<mpsc::Receiver<ServerEvent>, ServiceError> {
    auth_service::authenticate(state, token)?;
    Ok(open_stream(
        state,
        StreamKind::Admin {
            token: token.to_string(),
        },
    ))
}

/// Spawn the forwarder for one view and return its event feed.
///
/// The forwarder owns the view's tick driver, so the ticks stop as soon as the
/// client goes away.
pub fn open_stream(state: &SharedState, kind: StreamKind) -> mpsc::Receiver<ServerEvent> {
    let (tx, rx) = mpsc::channel::<ServerEvent>(VIEW_CHANNEL_CAPACITY);

    let handshake = Handshake {
        stream: kind.label().to_string(),
        degraded: state.is_degraded(),
    };
    if let Some(event) = encode("handshake", &handshake) {
        let _ = tx.try_send(event);
    }

    let (view_tx, view_rx) = mpsc::channel(VIEW_CHANNEL_CAPACITY);
    let ticks = tick_driver::spawn(
        state.store().subscribe_timer_state(),
        state.clock(),
        Arc::new(AutoStop::new(state.clone())),
        view_tx,
    );

    let feeds = Feeds {
        view: view_rx,
        hub: match kind {
            StreamKind::Public => state.public_sse().subscribe(),
            StreamKind::Admin { .. } => state.admin_sse().subscribe(),
        },
        records: matches!(kind, StreamKind::Admin { .. })
            .then(|| state.store().subscribe_records()),
        auth: state.sessions().on_auth_change(),
    };

    info!(
        stream = kind.label(),
        views = state.public_sse().subscriber_count(),
        "SSE stream connected"
    );

    let state = state.clone();
    tokio::spawn(async move {
        let _ticks = ticks;
        forward(&state, &kind, feeds, tx).await;
        info!(stream = kind.label(), "SSE stream disconnected");
    });

    rx
}

struct Feeds {
    view: mpsc::Receiver<ViewEvent>,
    hub: broadcast::Receiver<ServerEvent>,
    records: Option<Subscription<Vec<Record>>>,
    auth: broadcast::Receiver<AuthChange>,
}

async fn forward(
    state: &SharedState,
    kind: &StreamKind,
    mut feeds: Feeds,
    tx: mpsc::Sender<ServerEvent>,
) {
    if let Some(records) = feeds.records.as_mut() {
        let initial = records.current();
        if !send(&tx, records_event(initial)).await {
            return;
        }
    }

    loop {
        tokio::select! {
            _ = tx.closed() => break,
            view = feeds.view.recv() => {
                let Some(view) = view else { break };
                if !send(&tx, view_event(state, view)).await {
                    break;
                }
            }
            hub = feeds.hub.recv() => match hub {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, stream = kind.label(), "SSE subscriber lagged");
                }
            },
            records = next_records(&mut feeds.records) => {
                let Some(records) = records else { break };
                if !send(&tx, records_event(records)).await {
                    break;
                }
            }
            change = feeds.auth.recv() => match change {
                Ok(AuthChange::SignedOut { token, .. }) if ends_stream(kind, &token) => {
                    let payload = SessionEndedEvent { reason: "signed out".into() };
                    send(&tx, encode(EVENT_SESSION_ENDED, &payload)).await;
                    break;
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }
}

/// Wait for the next records listing; pending forever on public streams.
async fn next_records(records: &mut Option<Subscription<Vec<Record>>>) -> Option<Vec<Record>> {
    match records {
        Some(subscription) => subscription.changed().await,
        None => std::future::pending().await,
    }
}

fn ends_stream(kind: &StreamKind, signed_out: &str) -> bool {
    matches!(kind, StreamKind::Admin { token } if token == signed_out)
}

fn view_event(state: &SharedState, view: ViewEvent) -> Option<ServerEvent> {
    match view {
        ViewEvent::State { state: timer, .. } => state_event(&timer, state),
        ViewEvent::Tick { remaining } => encode(
            EVENT_TIMER_TICK,
            &TimerTickEvent {
                remaining_seconds: remaining,
            },
        ),
        ViewEvent::Expired { team_name } => {
            encode(EVENT_TIMER_EXPIRED, &TimerExpiredEvent { team_name })
        }
    }
}

fn state_event(timer: &TimerState, state: &SharedState) -> Option<ServerEvent> {
    let snapshot = TimerSnapshot::at(timer, state.now());
    encode(EVENT_TIMER_STATE, &TimerStateEvent(snapshot))
}

fn records_event(records: Vec<Record>) -> Option<ServerEvent> {
    let payload = RecordsUpdatedEvent {
        records: records.into_iter().map(RecordSummary::from).collect(),
    };
    encode(EVENT_RECORDS_UPDATED, &payload)
}

/// Returns `false` once the client is gone. Unencodable events are skipped.
async fn send(tx: &mpsc::Sender<ServerEvent>, event: Option<ServerEvent>) -> bool {
    match event {
        Some(event) => tx.send(event).await.is_ok(),
        None => true,
    }
}

/// Wrap a view feed into an axum SSE response.
pub fn to_sse_stream(
    receiver: mpsc::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    use futures::StreamExt;

    let stream = ReceiverStream::new(receiver).map(|payload| {
        let mut event = Event::default().data(payload.data);
        if let Some(name) = payload.event {
            event = event.event(name);
        }
        Ok(event)
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}
