//! Admin identity and session bookkeeping.
//!
//! Authentication itself happens upstream: an authenticating proxy forwards the
//! verified email in a header. This module only decides whether that email may
//! administer the timer and tracks the sessions handed out to it.

use std::{
    collections::HashSet,
    time::{Duration, SystemTime},
};

use axum::http::{HeaderMap, HeaderName};
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Header carrying the verified email when none is configured.
pub const DEFAULT_IDENTITY_HEADER: &str = "x-forwarded-email";

/// Authenticated caller as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Verified email, as received.
    pub email: String,
}

impl Principal {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

/// Source of verified identities for incoming requests.
pub trait IdentityProvider: Send + Sync {
    /// Principal attached to the request, if any.
    fn principal(&self, headers: &HeaderMap) -> Option<Principal>;
}

/// Reads the verified email from a header set by the upstream proxy.
#[derive(Debug, Clone)]
pub struct HeaderIdentity {
    header: HeaderName,
}

impl HeaderIdentity {
    /// Falls back to [`DEFAULT_IDENTITY_HEADER`] when `header` is not a valid header name.
    pub fn new(header: &str) -> Self {
        let header = HeaderName::try_from(header)
            .unwrap_or_else(|_| HeaderName::from_static(DEFAULT_IDENTITY_HEADER));
        Self { header }
    }
}

impl Default for HeaderIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTITY_HEADER)
    }
}

impl IdentityProvider for HeaderIdentity {
    fn principal(&self, headers: &HeaderMap) -> Option<Principal> {
        let email = headers.get(&self.header)?.to_str().ok()?.trim();
        (!email.is_empty()).then(|| Principal::new(email))
    }
}

/// Static list of emails allowed to drive the timer.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowList {
    emails: HashSet<String>,
}

impl AdminAllowList {
    /// Normalize and keep the non-blank emails.
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|email| normalize(email.as_ref()))
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    /// Case-insensitive membership check.
    pub fn is_authorized(&self, principal: &Principal) -> bool {
        self.emails.contains(&normalize(&principal.email))
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Authentication failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no verified identity on the request")]
    MissingIdentity,
    #[error("`{email}` is not allowed to administer the timer")]
    NotAllowed { email: String },
    #[error("unknown or expired admin session")]
    UnknownSession,
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn { token: String, email: String },
    SignedOut { token: String, email: String },
}

/// Sessions untouched for this long are closed.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

struct Session {
    principal: Principal,
    last_seen: SystemTime,
}

/// Active admin sessions keyed by their opaque token.
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
    changes: broadcast::Sender<AuthChange>,
    idle_timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Registry closing sessions after [`SESSION_IDLE_TIMEOUT`] without use.
    pub fn new() -> Self {
        Self::with_idle_timeout(SESSION_IDLE_TIMEOUT)
    }

    /// Registry with a custom idle limit.
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            sessions: DashMap::new(),
            changes,
            idle_timeout,
        }
    }

    /// Open a session for an allowed principal and return its token.
    ///
    /// Idle sessions are swept first, so the registry stays bounded by recent use.
    pub fn sign_in(
        &self,
        principal: Principal,
        allow_list: &AdminAllowList,
        now: SystemTime,
    ) -> Result<String, AuthError> {
        if !allow_list.is_authorized(&principal) {
            return Err(AuthError::NotAllowed {
                email: principal.email,
            });
        }
        self.expire_idle(now);

        let token = Uuid::new_v4().simple().to_string();
        let email = principal.email.clone();
        self.sessions.insert(
            token.clone(),
            Session {
                principal,
                last_seen: now,
            },
        );
        let _ = self.changes.send(AuthChange::SignedIn {
            token: token.clone(),
            email,
        });
        Ok(token)
    }

    /// Close a session. Returns the principal that owned it.
    pub fn sign_out(&self, token: &str) -> Option<Principal> {
        let (token, session) = self.sessions.remove(token)?;
        let _ = self.changes.send(AuthChange::SignedOut {
            token,
            email: session.principal.email.clone(),
        });
        Some(session.principal)
    }

    /// Resolve `token` and mark it used at `now`. An idle session is closed instead.
    pub fn touch(&self, token: &str, now: SystemTime) -> Option<Principal> {
        {
            let mut session = self.sessions.get_mut(token)?;
            if !self.is_idle(session.last_seen, now) {
                session.last_seen = now;
                return Some(session.principal.clone());
            }
        }
        self.sign_out(token);
        None
    }

    /// Close every session idle at `now`. Returns how many were closed.
    pub fn expire_idle(&self, now: SystemTime) -> usize {
        let idle: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| self.is_idle(entry.last_seen, now))
            .map(|entry| entry.key().clone())
            .collect();
        for token in &idle {
            self.sign_out(token);
        }
        idle.len()
    }

    /// Subscribe to sign-in and sign-out notifications.
    pub fn on_auth_change(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn is_idle(&self, last_seen: SystemTime, now: SystemTime) -> bool {
        now.duration_since(last_seen)
            .is_ok_and(|idle| idle >= self.idle_timeout)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn allow() -> AdminAllowList {
        AdminAllowList::new([" GameMaster@Neon.Example ", ""])
    }

    #[test]
    fn allow_list_ignores_case_and_whitespace() {
        let list = allow();
        assert!(!list.is_authorized(&Principal::new("")));
        assert!(list.is_authorized(&Principal::new("gamemaster@neon.example")));
        assert!(list.is_authorized(&Principal::new("  GAMEMASTER@neon.example")));
        assert!(!list.is_authorized(&Principal::new("visitor@neon.example")));
    }

    #[test]
    fn header_identity_reads_trimmed_email() {
        let identity = HeaderIdentity::default();
        let mut headers = HeaderMap::new();
        assert_eq!(identity.principal(&headers), None);

        headers.insert(
            DEFAULT_IDENTITY_HEADER,
            HeaderValue::from_static(" gamemaster@neon.example "),
        );
        assert_eq!(
            identity.principal(&headers),
            Some(Principal::new("gamemaster@neon.example"))
        );

        headers.insert(DEFAULT_IDENTITY_HEADER, HeaderValue::from_static("   "));
        assert_eq!(identity.principal(&headers), None);
    }

    #[test]
    fn sign_in_rejects_unknown_emails() {
        let registry = SessionRegistry::new();
        let err = registry
            .sign_in(Principal::new("visitor@neon.example"), &allow(), at(0))
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAllowed { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn session_changes_are_broadcast() {
        let registry = SessionRegistry::new();
        let mut changes = registry.on_auth_change();

        let token = registry
            .sign_in(Principal::new("gamemaster@neon.example"), &allow(), at(0))
            .unwrap();
        assert!(registry.touch(&token, at(1)).is_some());
        assert!(matches!(
            changes.recv().await.unwrap(),
            AuthChange::SignedIn { token: ref t, .. } if *t == token
        ));

        assert!(registry.sign_out(&token).is_some());
        assert!(registry.sign_out(&token).is_none());
        assert!(registry.touch(&token, at(2)).is_none());
        assert!(matches!(
            changes.recv().await.unwrap(),
            AuthChange::SignedOut { token: ref t, .. } if *t == token
        ));
    }

    #[tokio::test]
    async fn idle_sessions_are_closed_on_use() {
        let registry = SessionRegistry::with_idle_timeout(Duration::from_secs(60));
        let token = registry
            .sign_in(Principal::new("gamemaster@neon.example"), &allow(), at(0))
            .unwrap();
        let mut changes = registry.on_auth_change();

        assert!(registry.touch(&token, at(50)).is_some());
        assert!(registry.touch(&token, at(100)).is_some());
        assert!(registry.touch(&token, at(160)).is_none());
        assert!(registry.is_empty());
        assert!(matches!(
            changes.recv().await.unwrap(),
            AuthChange::SignedOut { token: ref t, .. } if *t == token
        ));
    }

    #[test]
    fn sign_in_sweeps_idle_sessions() {
        let registry = SessionRegistry::with_idle_timeout(Duration::from_secs(60));
        let stale = registry
            .sign_in(Principal::new("gamemaster@neon.example"), &allow(), at(0))
            .unwrap();
        let fresh = registry
            .sign_in(Principal::new("gamemaster@neon.example"), &allow(), at(30))
            .unwrap();

        registry
            .sign_in(Principal::new("gamemaster@neon.example"), &allow(), at(70))
            .unwrap();
        assert!(registry.touch(&stale, at(70)).is_none());
        assert!(registry.touch(&fresh, at(70)).is_some());
        assert_eq!(registry.expire_idle(at(1_000)), 2);
        assert!(registry.is_empty());
    }
}
