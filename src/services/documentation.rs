use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Neon Countdown Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::get_timer,
        crate::routes::public::submit_password,
        crate::routes::session::sign_in,
        crate::routes::session::sign_out,
        crate::routes::admin::get_timer,
        crate::routes::admin::start_timer,
        crate::routes::admin::pause_timer,
        crate::routes::admin::resume_timer,
        crate::routes::admin::reset_timer,
        crate::routes::admin::stop_timer,
        crate::routes::admin::set_password,
        crate::routes::admin::list_records,
        crate::routes::admin::delete_record,
        crate::routes::sse::public_stream,
        crate::routes::sse::admin_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::timer::TimerStatus,
            crate::dto::timer::TimerSnapshot,
            crate::dto::timer::RecordSummary,
            crate::dto::public::PasswordSubmission,
            crate::dto::admin::StartTimerRequest,
            crate::dto::admin::RemainingRequest,
            crate::dto::admin::SetPasswordRequest,
            crate::dto::admin::SessionResponse,
            crate::dto::admin::RecordsResponse,
            crate::dto::admin::ActionResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::TimerStateEvent,
            crate::dto::sse::TimerTickEvent,
            crate::dto::sse::TimerExpiredEvent,
            crate::dto::sse::TimerCompletedEvent,
            crate::dto::sse::RecordsUpdatedEvent,
            crate::dto::sse::SessionEndedEvent,
            crate::dto::sse::SystemStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Timer view and password gate for the teams"),
        (name = "admin", description = "Timer control and record curation"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
