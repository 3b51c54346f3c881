use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
};
use axum_valid::Valid;
use tracing::debug;
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            ActionResponse, RecordsResponse, RemainingRequest, SetPasswordRequest,
            StartTimerRequest,
        },
        timer::{RecordSummary, TimerSnapshot},
    },
    error::AppError,
    services::{auth_service, ledger_service, timer_service},
    state::{SharedState, timer::TimerState},
};

pub(crate) const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only endpoints driving the timer and curating the records.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/timer", get(get_timer))
        .route("/admin/timer/start", post(start_timer))
        .route("/admin/timer/pause", post(pause_timer))
        .route("/admin/timer/resume", post(resume_timer))
        .route("/admin/timer/reset", post(reset_timer))
        .route("/admin/timer/stop", post(stop_timer))
        .route("/admin/password", put(set_password))
        .route("/admin/records", get(list_records))
        .route("/admin/records/{id}", delete(delete_record))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Current timer document, as the public view sees it.
#[utoipa::path(
    get,
    path = "/admin/timer",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token issued by POST /admin/session")),
    responses((status = 200, description = "Timer snapshot", body = TimerSnapshot))
)]
pub async fn get_timer(State(state): State<SharedState>) -> Result<Json<TimerSnapshot>, AppError> {
    Ok(Json(timer_service::snapshot(&state).await?))
}

/// Put a team on the clock with a fresh 15 minutes.
#[utoipa::path(
    post,
    path = "/admin/timer/start",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token issued by POST /admin/session")),
    request_body = StartTimerRequest,
    responses(
        (status = 200, description = "Timer started", body = TimerSnapshot),
        (status = 400, description = "Blank team name")
    )
)]
pub async fn start_timer(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<StartTimerRequest>>,
) -> Result<Json<TimerSnapshot>, AppError> {
    let updated = timer_service::start(&state, &payload.team_name).await?;
    Ok(render(&state, &updated))
}

/// Freeze the countdown, optionally at an explicit remaining value.
#[utoipa::path(
    post,
    path = "/admin/timer/pause",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token issued by POST /admin/session")),
    request_body(content = RemainingRequest, description = "Omit to derive the remaining time server-side"),
    responses(
        (status = 200, description = "Timer paused", body = TimerSnapshot),
        (status = 409, description = "The timer is not running")
    )
)]
pub async fn pause_timer(
    State(state): State<SharedState>,
    payload: Option<Json<RemainingRequest>>,
) -> Result<Json<TimerSnapshot>, AppError> {
    let remaining = payload.and_then(|Json(body)| body.remaining_seconds);
    let updated = timer_service::pause(&state, remaining).await?;
    Ok(render(&state, &updated))
}

/// Continue a paused countdown.
#[utoipa::path(
    post,
    path = "/admin/timer/resume",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token issued by POST /admin/session")),
    responses(
        (status = 200, description = "Timer resumed", body = TimerSnapshot),
        (status = 409, description = "The timer is not paused")
    )
)]
pub async fn resume_timer(
    State(state): State<SharedState>,
) -> Result<Json<TimerSnapshot>, AppError> {
    let updated = timer_service::resume(&state).await?;
    Ok(render(&state, &updated))
}

/// Clear the team and return to a full, idle countdown.
#[utoipa::path(
    post,
    path = "/admin/timer/reset",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token issued by POST /admin/session")),
    responses((status = 200, description = "Timer reset", body = TimerSnapshot))
)]
pub async fn reset_timer(
    State(state): State<SharedState>,
) -> Result<Json<TimerSnapshot>, AppError> {
    let updated = timer_service::reset(&state).await?;
    Ok(render(&state, &updated))
}

/// Finish the run without writing a record.
#[utoipa::path(
    post,
    path = "/admin/timer/stop",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token issued by POST /admin/session")),
    request_body(content = RemainingRequest, description = "Omit to derive the remaining time server-side"),
    responses((status = 200, description = "Timer stopped", body = TimerSnapshot))
)]
pub async fn stop_timer(
    State(state): State<SharedState>,
    payload: Option<Json<RemainingRequest>>,
) -> Result<Json<TimerSnapshot>, AppError> {
    let remaining = payload.and_then(|Json(body)| body.remaining_seconds);
    let updated = timer_service::stop(&state, remaining).await?;
    Ok(render(&state, &updated))
}

/// Replace the early-stop password.
#[utoipa::path(
    put,
    path = "/admin/password",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token issued by POST /admin/session")),
    request_body = SetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = ActionResponse),
        (status = 400, description = "Blank password")
    )
)]
pub async fn set_password(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SetPasswordRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    timer_service::set_password(&state, &payload.password).await?;
    Ok(Json(ActionResponse::new("password updated")))
}

/// Newest-first completion records.
#[utoipa::path(
    get,
    path = "/admin/records",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token issued by POST /admin/session")),
    responses((status = 200, description = "Completion records", body = RecordsResponse))
)]
pub async fn list_records(
    State(state): State<SharedState>,
) -> Result<Json<RecordsResponse>, AppError> {
    let records = ledger_service::list(&state).await?;
    Ok(Json(RecordsResponse {
        records: records.into_iter().map(RecordSummary::from).collect(),
    }))
}

/// Remove a completion record.
#[utoipa::path(
    delete,
    path = "/admin/records/{id}",
    tag = "admin",
    params(
        ("X-Admin-Token" = String, Header, description = "Token issued by POST /admin/session"),
        ("id" = String, Path, description = "Identifier of the record to delete")
    ),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Unknown record")
    )
)]
pub async fn delete_record(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ledger_service::remove(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn render(state: &SharedState, updated: &TimerState) -> Json<TimerSnapshot> {
    Json(TimerSnapshot::at(updated, state.now()))
}

/// Read the admin token header.
pub(crate) fn admin_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing admin token header `X-Admin-Token`".into()))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let principal = {
        let token = admin_token(req.headers())?;
        auth_service::authenticate(&state, token)?
    };
    debug!(email = %principal.email, path = %req.uri().path(), "admin request");
    Ok(next.run(req).await)
}
