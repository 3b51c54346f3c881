//! Append-only completion log.

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::NewRecordEntity,
    error::ServiceError,
    state::{
        SharedState,
        record::Record,
        timer::{DURATION_SECS, elapsed_for},
    },
};

/// Record that `team_name` finished with `remaining` seconds left, stamped now.
pub async fn commit(
    state: &SharedState,
    team_name: &str,
    remaining: u32,
) -> Result<Record, ServiceError> {
    let completed_at = state.now();
    let record = state
        .store()
        .append_record(NewRecordEntity {
            team_name: team_name.to_owned(),
            completed_at,
            password_entered_at: completed_at,
            elapsed_time: elapsed_for(remaining),
            remaining_time: remaining.min(DURATION_SECS),
        })
        .await?;
    info!(
        id = %record.id,
        team = %record.team_name,
        elapsed = record.elapsed_time,
        "completion recorded"
    );
    Ok(record)
}

/// Delete one record; `NotFound` when the identifier is unknown.
pub async fn remove(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    if state.store().delete_record(id).await? {
        info!(%id, "record deleted");
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!("record `{id}` not found")))
    }
}

/// Newest first, at most fifty.
pub async fn list(state: &SharedState) -> Result<Vec<Record>, ServiceError> {
    state.store().list_records().await
}
