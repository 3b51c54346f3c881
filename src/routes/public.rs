use axum::{Json, Router, extract::State, routing::{get, post}};

use crate::{
    dto::{
        public::PasswordSubmission,
        timer::{RecordSummary, TimerSnapshot},
    },
    error::AppError,
    services::{public_service, timer_service},
    state::SharedState,
};

/// Read-only timer view plus the password gate used by the teams.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/timer", get(get_timer))
        .route("/public/password", post(submit_password))
}

/// Current timer document with the remaining time derived server-side.
#[utoipa::path(
    get,
    path = "/public/timer",
    tag = "public",
    responses(
        (status = 200, description = "Timer snapshot", body = TimerSnapshot),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn get_timer(State(state): State<SharedState>) -> Result<Json<TimerSnapshot>, AppError> {
    Ok(Json(timer_service::snapshot(&state).await?))
}

/// Stop the running countdown with the room password.
#[utoipa::path(
    post,
    path = "/public/password",
    tag = "public",
    request_body = PasswordSubmission,
    responses(
        (status = 200, description = "Password accepted; completion recorded", body = RecordSummary),
        (status = 401, description = "Incorrect password"),
        (status = 409, description = "The timer is not running")
    )
)]
pub async fn submit_password(
    State(state): State<SharedState>,
    Json(payload): Json<PasswordSubmission>,
) -> Result<Json<RecordSummary>, AppError> {
    let record = public_service::submit_password(&state, &payload.password).await?;
    Ok(Json(record.into()))
}
