//! Persistence for the selected-user anchor.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::domain::{AppError, SessionError, SessionStore};

/// Default file name for [`FileSessionStore`]
pub const DEFAULT_SESSION_FILE: &str = ".peer-transfer-session";

/// Keeps the anchor as plain text in a single file
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn storage_error(action: &str, path: &Path, e: &std::io::Error) -> AppError {
    AppError::Session(SessionError::Storage(format!(
        "failed to {} {}: {}",
        action,
        path.display(),
        e
    )))
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<String>, AppError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let value = raw.trim();
                Ok((!value.is_empty()).then(|| value.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("read", &self.path, &e)),
        }
    }

    fn save(&self, value: &str) -> Result<(), AppError> {
        fs::write(&self.path, value).map_err(|e| storage_error("write", &self.path, &e))?;
        debug!(path = %self.path.display(), "Session anchor saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Session anchor cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("remove", &self.path, &e)),
        }
    }
}

/// In-process store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    value: Mutex<Option<String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<String>, AppError> {
        Ok(self
            .value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, value: &str) -> Result<(), AppError> {
        *self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        *self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemorySessionStore::new();
        assert_eq!(store.load().unwrap(), None);

        store.save("4").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("4"));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_missing_file_is_no_selection() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session"));

        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_trims_and_treats_blank_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        let store = FileSessionStore::new(&path);

        fs::write(&path, "  12\n").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("12"));

        fs::write(&path, "\n").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_unwritable_path_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("missing").join("session"));

        let err = store.save("1").unwrap_err();
        assert!(matches!(err, AppError::Session(SessionError::Storage(_))));
    }
}
