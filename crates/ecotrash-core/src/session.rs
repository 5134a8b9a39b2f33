// ── Session context ──
//
// The logged-in user, passed explicitly to whatever needs it. Storage is
// pluggable: the console persists to a file, tests keep it in memory.

use std::sync::{Arc, Mutex, RwLock};

use ecotrash_api::ApiClient;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::error::CoreError;
use crate::model::CurrentUser;

/// Where the current user record is kept between runs.
///
/// `load` never fails: unreadable or corrupt records are discarded and
/// reported as "no session".
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Option<CurrentUser>;
    fn store(&self, user: &CurrentUser) -> Result<(), CoreError>;
    fn clear(&self) -> Result<(), CoreError>;
}

/// Non-persistent storage.
#[derive(Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<CurrentUser>>,
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Option<CurrentUser> {
        self.slot.lock().expect("session slot poisoned").clone()
    }

    fn store(&self, user: &CurrentUser) -> Result<(), CoreError> {
        *self.slot.lock().expect("session slot poisoned") = Some(user.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        *self.slot.lock().expect("session slot poisoned") = None;
        Ok(())
    }
}

/// Current user plus the client whose bearer token follows it.
pub struct SessionContext<S: SessionStorage> {
    api: Arc<ApiClient>,
    storage: S,
    current: RwLock<Option<CurrentUser>>,
}

impl<S: SessionStorage> SessionContext<S> {
    pub fn new(api: Arc<ApiClient>, storage: S) -> Self {
        Self {
            api,
            storage,
            current: RwLock::new(None),
        }
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    /// Restore a persisted session, installing its token on the client.
    /// Returns the restored user, if any.
    pub fn init(&self) -> Option<CurrentUser> {
        let user = self.storage.load()?;
        self.api.set_token(Some(user.token.clone()));
        info!(user = %user.username, "restored session");
        *self.current.write().expect("session lock poisoned") = Some(user.clone());
        Some(user)
    }

    /// Log in and persist the new session.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<CurrentUser, CoreError> {
        let data = self.api.login(email, password).await?;
        let user = CurrentUser::from_login(data);
        self.storage.store(&user)?;
        info!(user = %user.username, role = %user.role, "logged in");
        *self.current.write().expect("session lock poisoned") = Some(user.clone());
        Ok(user)
    }

    /// End the session: forget the user, the token and the stored record.
    pub fn logout(&self) -> Result<(), CoreError> {
        let previous = self.current.write().expect("session lock poisoned").take();
        self.api.set_token(None);
        self.storage.clear()?;
        if let Some(user) = previous {
            info!(user = %user.username, "logged out");
        }
        Ok(())
    }

    /// Drop a session the server no longer accepts (HTTP 401). Storage
    /// failures are logged, not returned.
    pub fn invalidate(&self) {
        warn!("session rejected by server, clearing it");
        if let Err(e) = self.logout() {
            warn!(error = %e, "failed to clear stored session");
        }
    }

    pub fn current(&self) -> Option<CurrentUser> {
        self.current.read().expect("session lock poisoned").clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().expect("session lock poisoned").is_some()
    }

    /// The current user, or `NotLoggedIn`.
    pub fn require(&self) -> Result<CurrentUser, CoreError> {
        self.current().ok_or(CoreError::NotLoggedIn)
    }

    /// Whether the token looks present. The server stays the judge of
    /// validity.
    pub fn has_token(&self) -> bool {
        self.current
            .read()
            .expect("session lock poisoned")
            .as_ref()
            .is_some_and(|u| !u.token.expose_secret().is_empty())
    }
}
