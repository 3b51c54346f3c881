use serde::Deserialize;
use utoipa::ToSchema;

/// Password typed by a team to stop the clock early.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordSubmission {
    pub password: String,
}
