// ── File-backed session store ──
//
// One JSON `CurrentUser` record per machine, under a fixed file name in
// the data directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ecotrash_core::{CoreError, CurrentUser, SessionStorage};
use tracing::{debug, warn};

/// File name of the persisted session record.
pub const SESSION_KEY: &str = "ecotrash_user";

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Store in the platform data directory.
    pub fn new() -> Self {
        Self::in_dir(&crate::data_dir())
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(SESSION_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn discard(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "could not remove session record");
        }
    }
}

impl Default for FileSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn storage_error(e: &impl std::fmt::Display) -> CoreError {
    CoreError::Storage {
        message: e.to_string(),
    }
}

impl SessionStorage for FileSessionStore {
    fn load(&self) -> Option<CurrentUser> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable session record");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding corrupt session record");
                self.discard();
                None
            }
        }
    }

    fn store(&self, user: &CurrentUser) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| storage_error(&e))?;
        }
        let json = serde_json::to_string(user).map_err(|e| storage_error(&e))?;
        std::fs::write(&self.path, json).map_err(|e| storage_error(&e))?;
        debug!(path = %self.path.display(), "session stored");
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ecotrash_core::Role;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn user() -> CurrentUser {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "username": "ana",
            "email": "ana@example.com",
            "role": "admin",
            "token": "tok-1"
        }))
        .unwrap()
    }

    #[test]
    fn store_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::in_dir(&dir.path().join("data"));
        assert!(store.load().is_none());

        store.store(&user()).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.role, Role::Admin);
        assert_eq!(loaded.token.expose_secret(), "tok-1");

        store.clear().unwrap();
        assert!(store.load().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_record_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::in_dir(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();

        assert!(store.load().is_none());
        assert!(!store.path().exists());
    }
}
