pub mod auth;
pub mod clock;
pub mod password;
pub mod record;
mod sse;
pub mod state_machine;
pub mod store;
pub mod timer;
pub mod transitions;

use std::{sync::Arc, time::Duration, time::SystemTime};

use tokio::sync::Mutex;

use crate::config::AppConfig;

pub use self::sse::SseHub;
use self::{
    auth::{AdminAllowList, HeaderIdentity, IdentityProvider, SessionRegistry},
    clock::{Clock, SystemClock},
    sse::SseState,
    store::SharedStore,
};

/// Cheaply cloneable handle shared by handlers and background tasks.
pub type SharedState = Arc<AppState>;
/// Upper bound on one gated command batch.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

/// Central application state: the store adapter, SSE hubs and admin sessions.
pub struct AppState {
    store: SharedStore,
    sse: SseState,
    sessions: SessionRegistry,
    allow_list: AdminAllowList,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    transition_gate: Mutex<()>,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: &AppConfig) -> SharedState {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`AppState::new`] with an explicit time source.
    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> SharedState {
        Arc::new(Self {
            store: SharedStore::new(),
            sse: SseState::default(),
            sessions: SessionRegistry::new(),
            allow_list: AdminAllowList::new(&config.admin_emails),
            identity: Arc::new(HeaderIdentity::new(&config.identity_header)),
            clock,
            transition_gate: Mutex::new(()),
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
        })
    }

    /// Store adapter shared by every view.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        self.store.is_degraded()
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    /// Broadcast hub used for the admin SSE stream.
    pub fn admin_sse(&self) -> &SseHub {
        self.sse.admin()
    }

    /// Open admin sessions.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Emails allowed to sign in.
    pub fn allow_list(&self) -> &AdminAllowList {
        &self.allow_list
    }

    /// Source of verified request identities.
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    /// Shared handle to the wall clock.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Current wall-clock time.
    pub fn now(&self) -> SystemTime {
        self.clock.now()
    }
}
