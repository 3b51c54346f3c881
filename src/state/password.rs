//! Early-stop password comparison.

/// Compare a submitted password against the stored secret.
///
/// Only the submitted value is trimmed; the comparison ignores case.
pub fn matches(stored: &str, candidate: &str) -> bool {
    let candidate = candidate.trim();
    !candidate.is_empty() && candidate.to_lowercase() == stored.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::timer::DEFAULT_PASSWORD;

    #[test]
    fn trailing_space_and_case_are_ignored() {
        assert!(matches(DEFAULT_PASSWORD, "EscapeNeon "));
        assert!(matches(DEFAULT_PASSWORD, "  ESCAPENEON"));
    }

    #[test]
    fn stored_value_is_not_trimmed() {
        assert!(!matches(" vault", "vault"));
    }

    #[test]
    fn mismatches_are_denied() {
        assert!(!matches(DEFAULT_PASSWORD, "escape neon"));
        assert!(!matches(DEFAULT_PASSWORD, ""));
        assert!(!matches("", "   "));
    }
}
