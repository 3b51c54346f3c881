/// Admin sign-in and token checks.
pub mod auth_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Completion records.
pub mod ledger_service;
/// Password gate used by the teams.
pub mod public_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events views.
pub mod sse_service;
/// Storage connection supervision and degraded mode.
pub mod storage_supervisor;
/// Per-view countdown driver.
pub mod tick_driver;
/// Timer commands.
pub mod timer_service;
