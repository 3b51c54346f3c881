use std::time::SystemTime;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    state::{
        AppState,
        state_machine::{TimerCommand, Transition, plan},
        timer::TimerState,
    },
};

/// Result of running commands through the transition gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// At least one command wrote to the store.
    Applied(TimerState),
    /// Every command was already satisfied; nothing was written.
    Unchanged(TimerState),
}

impl CommandOutcome {
    /// Document after the batch.
    pub fn state(&self) -> &TimerState {
        match self {
            CommandOutcome::Applied(state) | CommandOutcome::Unchanged(state) => state,
        }
    }

    /// Consume the outcome, keeping the document.
    pub fn into_state(self) -> TimerState {
        match self {
            CommandOutcome::Applied(state) | CommandOutcome::Unchanged(state) => state,
        }
    }

    /// Whether at least one write reached the store.
    pub fn was_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied(_))
    }
}

impl AppState {
    /// Apply a single command. See [`AppState::run_planned`].
    pub async fn run_command(&self, command: TimerCommand) -> Result<CommandOutcome, ServiceError> {
        self.run_planned(move |_, _| vec![command]).await
    }

    /// Apply a fixed batch of commands. See [`AppState::run_planned`].
    pub async fn run_commands(
        &self,
        commands: Vec<TimerCommand>,
    ) -> Result<CommandOutcome, ServiceError> {
        self.run_planned(move |_, _| commands).await
    }

    /// Apply the commands chosen by `choose` while holding the transition gate.
    ///
    /// `choose` sees the stored document and the current time under the gate, so
    /// it can derive values or bail out (empty batch) without racing other
    /// commands. Each command is then planned against the freshest document. The
    /// whole batch is bounded by the transition timeout; writes already issued
    /// when the timeout fires are kept.
    pub async fn run_planned<F>(&self, choose: F) -> Result<CommandOutcome, ServiceError>
    where
        F: FnOnce(&TimerState, SystemTime) -> Vec<TimerCommand>,
    {
        let _gate = self.transition_gate.lock().await;

        let work = async {
            let mut state = self.store.read_timer_state().await?.unwrap_or_default();
            let commands = choose(&state, self.clock.now());
            let mut applied = false;

            for command in commands {
                let now = self.clock.now();
                match plan(&state, command.clone(), now)? {
                    Transition::Noop => {
                        debug!(command = ?command, phase = ?state.phase(), "timer command already satisfied");
                    }
                    Transition::Write(patch) => {
                        state = self.store.write_timer_state(patch).await?;
                        applied = true;
                        info!(command = ?command, phase = ?state.phase(), "timer command applied");
                    }
                }
            }

            Ok::<_, ServiceError>(if applied {
                CommandOutcome::Applied(state)
            } else {
                CommandOutcome::Unchanged(state)
            })
        };

        match self.transition_timeout {
            Some(limit) => match timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(?limit, "timer command timed out waiting for the store");
                    Err(ServiceError::Timeout)
                }
            },
            None => work.await,
        }
    }
}
