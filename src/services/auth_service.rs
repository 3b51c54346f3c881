//! Admin sign-in, sign-out and per-request token checks.

use axum::http::HeaderMap;
use tracing::{info, warn};

use crate::{
    dto::admin::SessionResponse,
    error::ServiceError,
    state::{
        SharedState,
        auth::{AuthError, Principal},
    },
};

/// Open an admin session for the identity carried by `headers`.
pub fn sign_in(state: &SharedState, headers: &HeaderMap) -> Result<SessionResponse, ServiceError> {
    let principal = state
        .identity()
        .principal(headers)
        .ok_or(AuthError::MissingIdentity)?;
    let email = principal.email.clone();

    match state
        .sessions()
        .sign_in(principal, state.allow_list(), state.now())
    {
        Ok(token) => {
            info!(%email, "admin signed in");
            Ok(SessionResponse { token, email })
        }
        Err(err) => {
            warn!(%email, "admin sign-in refused");
            Err(err.into())
        }
    }
}

/// Close the session behind `token`.
pub fn sign_out(state: &SharedState, token: &str) -> Result<Principal, ServiceError> {
    let principal = state
        .sessions()
        .sign_out(token)
        .ok_or(AuthError::UnknownSession)?;
    info!(email = %principal.email, "admin signed out");
    Ok(principal)
}

/// Resolve `token` to its principal, re-checking the allow-list on every call.
///
/// A principal dropped from the allow-list, or a session left idle too long,
/// loses its session here.
pub fn authenticate(state: &SharedState, token: &str) -> Result<Principal, AuthError> {
    let principal = state
        .sessions()
        .touch(token, state.now())
        .ok_or(AuthError::UnknownSession)?;

    if !state.allow_list().is_authorized(&principal) {
        warn!(email = %principal.email, "session owner is no longer allowed; signing out");
        state.sessions().sign_out(token);
        return Err(AuthError::NotAllowed {
            email: principal.email,
        });
    }
    Ok(principal)
}
