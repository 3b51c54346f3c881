//! Per-view countdown driver.
//!
//! Views never receive an authoritative tick from elsewhere: each one runs its
//! own driver that re-derives the remaining time from the shared anchor once
//! per second and reacts to pushed documents. When the countdown reaches zero
//! the driver asks its [`ExpiryHandler`] to stop the timer, once per anchor.

use std::{sync::Arc, time::Duration, time::SystemTime};

use futures::future::BoxFuture;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::debug;

use crate::state::{clock::Clock, store::Subscription, timer::TimerState};

/// Cadence at which a running countdown is re-derived.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// What a view should render next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// A new document was pushed (also sent once on start).
    State { state: TimerState, remaining: u32 },
    /// Derived countdown value while running.
    Tick { remaining: u32 },
    /// The countdown reached zero for this anchor.
    Expired { team_name: String },
}

/// Reaction to a countdown reaching zero.
pub trait ExpiryHandler: Send + Sync + 'static {
    /// Called once per anchor. Failures stay inside the handler.
    fn on_expired(&self, anchor: SystemTime) -> BoxFuture<'static, ()>;
}

/// Owns the driver task; dropping it stops the ticks.
pub struct TickHandle {
    task: JoinHandle<()>,
}

impl TickHandle {
    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a driver feeding `events` until the receiver or the store goes away.
pub fn spawn(
    subscription: Subscription<Option<TimerState>>,
    clock: Arc<dyn Clock>,
    expiry: Arc<dyn ExpiryHandler>,
    events: mpsc::Sender<ViewEvent>,
) -> TickHandle {
    let task = tokio::spawn(drive(subscription, clock, expiry, events));
    TickHandle { task }
}

async fn drive(
    mut subscription: Subscription<Option<TimerState>>,
    clock: Arc<dyn Clock>,
    expiry: Arc<dyn ExpiryHandler>,
    events: mpsc::Sender<ViewEvent>,
) {
    let mut state = subscription.current().unwrap_or_default();
    let mut expired_anchor: Option<SystemTime> = None;

    let mut ticker = interval(TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if !emit_state(&events, &state, clock.as_ref()).await {
        return;
    }
    ticker.reset();

    loop {
        if state.is_ticking() {
            tokio::select! {
                _ = events.closed() => break,
                changed = subscription.changed() => {
                    let Some(next) = changed else { break };
                    state = next.unwrap_or_default();
                    if !emit_state(&events, &state, clock.as_ref()).await {
                        break;
                    }
                    ticker.reset();
                }
                _ = ticker.tick() => {
                    let remaining = state.remaining_at(clock.now());
                    if remaining > 0 {
                        if events.send(ViewEvent::Tick { remaining }).await.is_err() {
                            break;
                        }
                        continue;
                    }

                    let Some(anchor) = state.anchor_time else { continue };
                    if expired_anchor == Some(anchor) {
                        continue;
                    }
                    expired_anchor = Some(anchor);
                    debug!(team = %state.team_name, "countdown reached zero");

                    // The stop must outlive this view, so it runs detached.
                    tokio::spawn(expiry.on_expired(anchor));

                    let sent = events.send(ViewEvent::Tick { remaining: 0 }).await.is_ok()
                        && events
                            .send(ViewEvent::Expired {
                                team_name: state.team_name.clone(),
                            })
                            .await
                            .is_ok();
                    if !sent {
                        break;
                    }
                }
            }
        } else {
            tokio::select! {
                _ = events.closed() => break,
                changed = subscription.changed() => {
                    let Some(next) = changed else { break };
                    state = next.unwrap_or_default();
                    if !emit_state(&events, &state, clock.as_ref()).await {
                        break;
                    }
                    ticker.reset();
                }
            }
        }
    }
}

async fn emit_state(
    events: &mpsc::Sender<ViewEvent>,
    state: &TimerState,
    clock: &dyn Clock,
) -> bool {
    let remaining = state.remaining_at(clock.now());
    events
        .send(ViewEvent::State {
            state: state.clone(),
            remaining,
        })
        .await
        .is_ok()
}
