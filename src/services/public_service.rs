//! Password gate exposed to the teams playing the room.

use tracing::{info, warn};

use crate::{
    error::ServiceError,
    services::{ledger_service, sse_events},
    state::{SharedState, password, record::Record, state_machine::TimerCommand},
};

/// Whether `candidate` matches the stored early-stop secret.
pub async fn check_password(state: &SharedState, candidate: &str) -> Result<bool, ServiceError> {
    let current = state.store().read_timer_state().await?.unwrap_or_default();
    Ok(password::matches(current.effective_password(), candidate))
}

/// Stop the running countdown with the team's password and record the completion.
///
/// The stop and the record are two writes; if the second fails the timer stays
/// stopped without a record.
pub async fn submit_password(state: &SharedState, candidate: &str) -> Result<Record, ServiceError> {
    let current = state.store().read_timer_state().await?.unwrap_or_default();
    if !current.is_ticking() {
        return Err(ServiceError::InvalidState("the timer is not running".into()));
    }
    if !password::matches(current.effective_password(), candidate) {
        info!("incorrect password submitted");
        return Err(ServiceError::Unauthorized("incorrect password".into()));
    }

    let anchor = current.anchor_time;
    let outcome = state
        .run_planned(move |latest, now| {
            let remaining = latest.remaining_at(now);
            if latest.is_ticking() && latest.anchor_time == anchor && remaining > 0 {
                vec![TimerCommand::Stop { remaining }]
            } else {
                Vec::new()
            }
        })
        .await?;

    if !outcome.was_applied() {
        return Err(ServiceError::InvalidState(
            "the timer stopped before the password was accepted".into(),
        ));
    }

    let stopped = outcome.into_state();
    let record = match ledger_service::commit(state, &stopped.team_name, stopped.remaining_seconds)
        .await
    {
        Ok(record) => record,
        Err(err) => {
            warn!(error = %err, team = %stopped.team_name, "timer stopped but the record was not written");
            return Err(err);
        }
    };

    sse_events::broadcast_completed(state, &record);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::timer_store::memory::MemoryTimerStore,
        services::timer_service,
        state::{AppState, clock::ManualClock, timer::TimerPhase},
    };

    async fn setup() -> (SharedState, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_secs(50_000));
        let state = AppState::with_clock(&AppConfig::default(), clock.clone());
        state
            .store()
            .install(Arc::new(MemoryTimerStore::new()))
            .await;
        (state, clock)
    }

    #[tokio::test]
    async fn default_password_matches_loosely() {
        let (state, _) = setup().await;
        assert!(check_password(&state, "EscapeNeon ").await.unwrap());
        assert!(!check_password(&state, "escape").await.unwrap());
    }

    #[tokio::test]
    async fn correct_password_stops_and_records() {
        let (state, clock) = setup().await;
        let mut public = state.public_sse().subscribe();
        timer_service::start(&state, "Team A").await.unwrap();
        clock.advance(Duration::from_secs(600));

        let record = submit_password(&state, "escapeneon").await.unwrap();
        assert_eq!(record.team_name, "Team A");
        assert_eq!(record.remaining_time, 300);
        assert_eq!(record.elapsed_time, 600);

        let stopped = state.store().read_timer_state().await.unwrap().unwrap();
        assert_eq!(stopped.phase(), TimerPhase::Stopped);
        assert_eq!(stopped.remaining_seconds, 300);

        let event = public.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("timer.completed"));
    }

    #[tokio::test]
    async fn second_submission_writes_no_duplicate() {
        let (state, clock) = setup().await;
        timer_service::start(&state, "Team A").await.unwrap();
        clock.advance(Duration::from_secs(60));

        submit_password(&state, "escapeneon").await.unwrap();
        assert!(matches!(
            submit_password(&state, "escapeneon").await,
            Err(ServiceError::InvalidState(_))
        ));
        assert_eq!(ledger_service::list(&state).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrong_password_changes_nothing() {
        let (state, clock) = setup().await;
        timer_service::start(&state, "Team A").await.unwrap();
        clock.advance(Duration::from_secs(60));

        assert!(matches!(
            submit_password(&state, "wrong").await,
            Err(ServiceError::Unauthorized(_))
        ));
        let current = state.store().read_timer_state().await.unwrap().unwrap();
        assert_eq!(current.phase(), TimerPhase::Running);
        assert!(ledger_service::list(&state).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn paused_timer_refuses_submission() {
        let (state, _) = setup().await;
        timer_service::start(&state, "Team A").await.unwrap();
        timer_service::pause(&state, None).await.unwrap();

        assert!(matches!(
            submit_password(&state, "escapeneon").await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn custom_password_replaces_default() {
        let (state, _) = setup().await;
        timer_service::set_password(&state, "Vault").await.unwrap();
        timer_service::start(&state, "Team A").await.unwrap();

        assert!(!check_password(&state, "escapeneon").await.unwrap());
        assert!(submit_password(&state, " vault").await.is_ok());
    }
}
