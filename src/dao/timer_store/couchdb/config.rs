use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "neon_countdown";

/// Basic-auth pair sent with every CouchDB request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchCredentials {
    pub username: String,
    pub password: String,
}

/// Where the timer database lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchConfig {
    /// Server root without a trailing slash.
    pub base_url: String,
    pub database: String,
    pub credentials: Option<CouchCredentials>,
}

impl CouchConfig {
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            database: database.into(),
            credentials: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(CouchCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Read `COUCH_BASE_URL` (required), `COUCH_DB` and the optional
    /// `COUCH_USERNAME`/`COUCH_PASSWORD` pair.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let base_url = lookup("COUCH_BASE_URL").ok_or(CouchDaoError::MissingEnvVar {
            var: "COUCH_BASE_URL",
        })?;
        let database = lookup("COUCH_DB")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_owned());

        let config = Self::new(base_url, database);
        Ok(match (lookup("COUCH_USERNAME"), lookup("COUCH_PASSWORD")) {
            (Some(username), Some(password)) => config.with_credentials(username, password),
            _ => config,
        })
    }

    /// `base_url/database/path`, with `path` already percent-safe.
    pub fn document_url(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}/{}", self.base_url, self.database)
        } else {
            format!("{}/{}/{}", self.base_url, self.database, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn base_url_is_required() {
        let err = CouchConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(
            err,
            CouchDaoError::MissingEnvVar {
                var: "COUCH_BASE_URL"
            }
        ));
    }

    #[test]
    fn database_defaults_and_slash_is_trimmed() {
        let config =
            CouchConfig::from_lookup(lookup(&[("COUCH_BASE_URL", "http://couch:5984/")])).unwrap();
        assert_eq!(config.base_url, "http://couch:5984");
        assert_eq!(config.database, DEFAULT_DATABASE);
        assert_eq!(config.credentials, None);
        assert_eq!(
            config.document_url("timer::current"),
            "http://couch:5984/neon_countdown/timer::current"
        );
    }

    #[test]
    fn credentials_need_both_halves() {
        let half = CouchConfig::from_lookup(lookup(&[
            ("COUCH_BASE_URL", "http://couch:5984"),
            ("COUCH_USERNAME", "admin"),
        ]))
        .unwrap();
        assert_eq!(half.credentials, None);

        let full = CouchConfig::from_lookup(lookup(&[
            ("COUCH_BASE_URL", "http://couch:5984"),
            ("COUCH_USERNAME", "admin"),
            ("COUCH_PASSWORD", "secret"),
        ]))
        .unwrap();
        assert_eq!(
            full.credentials.map(|creds| creds.username),
            Some("admin".to_string())
        );
    }
}
