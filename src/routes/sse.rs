use std::convert::Infallible;

use axum::{
    Router,
    extract::{Query, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{error::AppError, services::sse_service, state::SharedState};

/// Query string of the admin stream; `EventSource` cannot send custom headers.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminStreamQuery {
    /// Token issued by `POST /admin/session`.
    pub token: String,
}

#[utoipa::path(
    get,
    path = "/sse/public",
    tag = "sse",
    responses((status = 200, description = "Public SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream timer pushes and locally derived ticks to a view.
pub async fn public_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    sse_service::to_sse_stream(sse_service::open_public(&state))
}

#[utoipa::path(
    get,
    path = "/sse/admin",
    tag = "sse",
    params(AdminStreamQuery),
    responses(
        (status = 200, description = "Admin SSE stream", content_type = "text/event-stream", body = String),
        (status = 401, description = "Unknown admin session")
    )
)]
/// Stream the public events plus record listings to an admin console.
pub async fn admin_stream(
    State(state): State<SharedState>,
    Query(query): Query<AdminStreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let receiver = sse_service::open_admin(&state, &query.token)?;
    Ok(sse_service::to_sse_stream(receiver))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/public", get(public_stream))
        .route("/sse/admin", get(admin_stream))
}
