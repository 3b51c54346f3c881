//! Admin timer commands: start, pause, resume, reset, stop and the password update.
//!
//! Every command goes through the transition gate on [`AppState`]; the state
//! machine decides the field-level write and the store adapter pushes the
//! result to every view.

use std::time::SystemTime;

use futures::future::BoxFuture;
use tracing::{info, warn};

use crate::{
    dto::timer::TimerSnapshot,
    error::ServiceError,
    services::tick_driver::ExpiryHandler,
    state::{SharedState, state_machine::TimerCommand, timer::TimerState},
};

/// Current document with the remaining time derived now.
pub async fn snapshot(state: &SharedState) -> Result<TimerSnapshot, ServiceError> {
    let current = state.store().read_timer_state().await?.unwrap_or_default();
    Ok(TimerSnapshot::at(&current, state.now()))
}

/// Put `team_name` on the clock, replacing whoever was there.
pub async fn start(state: &SharedState, team_name: &str) -> Result<TimerState, ServiceError> {
    let team_name = team_name.trim();
    if team_name.is_empty() {
        return Err(ServiceError::InvalidInput("team name must not be blank".into()));
    }

    let outcome = state
        .run_commands(vec![
            TimerCommand::Reset,
            TimerCommand::Start {
                team_name: team_name.to_owned(),
            },
        ])
        .await?;
    Ok(outcome.into_state())
}

/// Freeze the countdown. Without an explicit value the remaining time is derived under the gate.
pub async fn pause(
    state: &SharedState,
    remaining: Option<u32>,
) -> Result<TimerState, ServiceError> {
    let outcome = state
        .run_planned(move |current, now| {
            vec![TimerCommand::Pause {
                remaining: remaining.unwrap_or_else(|| current.remaining_at(now)),
            }]
        })
        .await?;
    Ok(outcome.into_state())
}

/// Continue a paused run from its frozen remaining time.
pub async fn resume(state: &SharedState) -> Result<TimerState, ServiceError> {
    Ok(state.run_command(TimerCommand::Resume).await?.into_state())
}

/// Clear the team and return to a full, idle countdown.
pub async fn reset(state: &SharedState) -> Result<TimerState, ServiceError> {
    Ok(state.run_command(TimerCommand::Reset).await?.into_state())
}

/// Finish the run. A no-op when nothing is running or paused.
pub async fn stop(state: &SharedState, remaining: Option<u32>) -> Result<TimerState, ServiceError> {
    let outcome = state
        .run_planned(move |current, now| {
            vec![TimerCommand::Stop {
                remaining: remaining.unwrap_or_else(|| current.remaining_at(now)),
            }]
        })
        .await?;
    Ok(outcome.into_state())
}

/// Stop the run anchored at `anchor` once its countdown has reached zero.
///
/// Every ticking view calls this independently. Only the first call writes;
/// later ones find the timer stopped (or re-anchored) and do nothing.
pub async fn auto_stop(state: &SharedState, anchor: SystemTime) -> Result<bool, ServiceError> {
    let outcome = state
        .run_planned(move |current, now| {
            let same_run = current.is_ticking() && current.anchor_time == Some(anchor);
            if same_run && current.remaining_at(now) == 0 {
                vec![TimerCommand::Stop { remaining: 0 }]
            } else {
                Vec::new()
            }
        })
        .await?;

    if outcome.was_applied() {
        info!(team = %outcome.state().team_name, "countdown expired; timer stopped");
    }
    Ok(outcome.was_applied())
}

/// Replace the early-stop password, stored trimmed.
pub async fn set_password(state: &SharedState, password: &str) -> Result<(), ServiceError> {
    let password = password.trim();
    if password.is_empty() {
        return Err(ServiceError::InvalidInput("password must not be blank".into()));
    }

    state
        .run_command(TimerCommand::SetPassword {
            password: password.to_owned(),
        })
        .await?;
    info!("early-stop password updated");
    Ok(())
}

/// [`ExpiryHandler`] issuing [`auto_stop`] against the shared state.
pub struct AutoStop {
    state: SharedState,
}

impl AutoStop {
    /// Handler stopping the run in `state` when a view sees zero.
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

impl ExpiryHandler for AutoStop {
    fn on_expired(&self, anchor: SystemTime) -> BoxFuture<'static, ()> {
        let state = self.state.clone();
        Box::pin(async move {
            if let Err(err) = auto_stop(&state, anchor).await {
                warn!(error = %err, "automatic stop at zero failed");
            }
        })
    }
}
