//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted team name, in characters.
pub const TEAM_NAME_MAX_CHARS: usize = 64;

/// Validates that a team name is non-blank once trimmed and reasonably short.
///
/// # Examples
///
/// ```ignore
/// validate_team_name("Team A")   // Ok
/// validate_team_name("   ")      // Err - blank
/// ```
pub fn validate_team_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("team_name_blank");
        err.message = Some("Team name must not be blank".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > TEAM_NAME_MAX_CHARS {
        let mut err = ValidationError::new("team_name_length");
        err.message = Some(
            format!("Team name must be at most {TEAM_NAME_MAX_CHARS} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that a new early-stop password is non-blank once trimmed.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.trim().is_empty() {
        let mut err = ValidationError::new("password_blank");
        err.message = Some("Password must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_team_name_valid() {
        assert!(validate_team_name("Team A").is_ok());
        assert!(validate_team_name("  Les Néons  ").is_ok());
        assert!(validate_team_name(&"x".repeat(TEAM_NAME_MAX_CHARS)).is_ok());
    }

    #[test]
    fn test_validate_team_name_invalid() {
        assert!(validate_team_name("").is_err());
        assert!(validate_team_name(" \t ").is_err());
        assert!(validate_team_name(&"x".repeat(TEAM_NAME_MAX_CHARS + 1)).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("vault").is_ok());
        assert!(validate_password("   ").is_err());
    }
}
