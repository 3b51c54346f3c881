use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};

use crate::{
    dto::admin::SessionResponse,
    error::AppError,
    routes::admin::admin_token,
    services::auth_service,
    state::SharedState,
};

/// Sign-in and sign-out for admin consoles. Not behind the token middleware.
pub fn router() -> Router<SharedState> {
    Router::new().route("/admin/session", post(sign_in).delete(sign_out))
}

/// Open an admin session for the identity forwarded by the proxy.
#[utoipa::path(
    post,
    path = "/admin/session",
    tag = "admin",
    params(("X-Forwarded-Email" = String, Header, description = "Verified email set by the authenticating proxy")),
    responses(
        (status = 200, description = "Session opened", body = SessionResponse),
        (status = 401, description = "Missing identity or not on the allow-list")
    )
)]
pub async fn sign_in(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(auth_service::sign_in(&state, &headers)?))
}

/// Close the session identified by the admin token.
#[utoipa::path(
    delete,
    path = "/admin/session",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token issued by POST /admin/session")),
    responses(
        (status = 204, description = "Session closed"),
        (status = 401, description = "Unknown session")
    )
)]
pub async fn sign_out(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = admin_token(&headers)?;
    auth_service::sign_out(&state, token)?;
    Ok(StatusCode::NO_CONTENT)
}
