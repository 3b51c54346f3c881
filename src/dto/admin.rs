//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::dto::{
    timer::RecordSummary,
    validation::{validate_password, validate_team_name},
};

/// Put a team on the clock.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StartTimerRequest {
    pub team_name: String,
}

impl Validate for StartTimerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_team_name(&self.team_name) {
            errors.add("team_name", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Optional remaining time for pause and stop; derived server-side when absent.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RemainingRequest {
    #[serde(default)]
    pub remaining_seconds: Option<u32>,
}

/// Replace the early-stop password.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPasswordRequest {
    pub password: String,
}

impl Validate for SetPasswordRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_password(&self.password) {
            errors.add("password", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Issued on sign-in; send it back in `X-Admin-Token`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub email: String,
}

/// Newest-first completion records.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordsResponse {
    pub records: Vec<RecordSummary>,
}

/// Generic acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

impl ActionResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_rejects_blank_team() {
        let request = StartTimerRequest {
            team_name: "   ".into(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("team_name"));

        let request = StartTimerRequest {
            team_name: "Team A".into(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn password_request_rejects_blank_password() {
        let request = SetPasswordRequest {
            password: "\t".into(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn remaining_is_optional() {
        let request: RemainingRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.remaining_seconds, None);
        let request: RemainingRequest =
            serde_json::from_str(r#"{"remaining_seconds": 120}"#).unwrap();
        assert_eq!(request.remaining_seconds, Some(120));
    }
}
