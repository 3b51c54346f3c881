use std::time::SystemTime;

use thiserror::Error;

use crate::{
    dao::models::{TimerEntity, TimerPatch},
    state::timer::{DURATION_SECS, TimerPhase, TimerState, backdated_anchor},
};

/// Commands the admin console and the views can issue against the timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCommand {
    /// Put a team on the clock with the full duration.
    Start {
        /// Non-empty, already trimmed team name.
        team_name: String,
    },
    /// Freeze the countdown on the caller's freshest derived value.
    Pause {
        /// Seconds left when the pause was requested.
        remaining: u32,
    },
    /// Continue a paused countdown from its snapshot.
    Resume,
    /// Clear the team and return to a full, idle timer.
    Reset,
    /// Finish the run, keeping the team name on display.
    Stop {
        /// Seconds left when the run finished.
        remaining: u32,
    },
    /// Replace the early-stop secret.
    SetPassword {
        /// Non-empty, already trimmed secret.
        password: String,
    },
}

/// Error returned when a command does not apply to the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {command:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// Phase the timer was in when the command was received.
    pub from: TimerPhase,
    /// The rejected command.
    pub command: TimerCommand,
}

/// Outcome of planning a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Merge-write to issue against the store.
    Write(TimerPatch),
    /// The command is already satisfied; nothing to write.
    Noop,
}

/// Compute the merge-write a command produces from `state` at `now`.
///
/// The state machine holds no clock: `now` is supplied by the caller and
/// stamped into the patch, and `Pause`/`Stop` carry the remaining time the
/// caller derived.
pub fn plan(
    state: &TimerState,
    command: TimerCommand,
    now: SystemTime,
) -> Result<Transition, InvalidTransition> {
    let from = state.phase();
    let patch = match (&command, from) {
        (TimerCommand::Start { team_name }, _) => TimerPatch {
            team_name: Some(team_name.clone()),
            anchor_time: Some(Some(now)),
            is_running: Some(true),
            is_paused: Some(false),
            remaining_seconds: Some(DURATION_SECS),
            ..TimerPatch::default()
        },
        (TimerCommand::Pause { remaining }, TimerPhase::Running) => TimerPatch {
            is_running: Some(false),
            is_paused: Some(true),
            remaining_seconds: Some((*remaining).min(DURATION_SECS)),
            ..TimerPatch::default()
        },
        (TimerCommand::Resume, TimerPhase::Paused) => TimerPatch {
            anchor_time: Some(Some(backdated_anchor(now, state.remaining_seconds))),
            is_running: Some(true),
            is_paused: Some(false),
            ..TimerPatch::default()
        },
        (TimerCommand::Reset, _) => TimerPatch {
            team_name: Some(String::new()),
            anchor_time: Some(None),
            is_running: Some(false),
            is_paused: Some(false),
            remaining_seconds: Some(DURATION_SECS),
            ..TimerPatch::default()
        },
        (TimerCommand::Stop { remaining }, TimerPhase::Running | TimerPhase::Paused) => {
            TimerPatch {
                is_running: Some(false),
                is_paused: Some(false),
                remaining_seconds: Some((*remaining).min(DURATION_SECS)),
                ..TimerPatch::default()
            }
        }
        (TimerCommand::Stop { .. }, TimerPhase::Idle | TimerPhase::Stopped) => {
            return Ok(Transition::Noop);
        }
        (TimerCommand::SetPassword { password }, _) => TimerPatch {
            password: Some(password.clone()),
            ..TimerPatch::default()
        },
        _ => {
            return Err(InvalidTransition {
                from,
                command: command.clone(),
            });
        }
    };

    Ok(Transition::Write(TimerPatch {
        updated_at: Some(now),
        ..patch
    }))
}

/// Merge a patch into a state the same way the store would.
pub fn apply_patch(state: &TimerState, patch: &TimerPatch) -> TimerState {
    let mut entity: TimerEntity = state.clone().into();
    patch.apply_to(&mut entity);
    entity.into()
}
