//! Single-slot credential storage, persisted as JSON when a path is set.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("credential file is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    api_key: String,
}

#[derive(Debug, Default)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    slot: RwLock<Option<String>>,
}

impl CredentialStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the file-backed store, loading any existing credential.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let initial = if path.exists() {
            let stored: StoredCredential = serde_json::from_str(&fs::read_to_string(&path)?)?;
            Some(stored.api_key)
        } else {
            None
        };
        info!(
            path = %path.display(),
            present = initial.is_some(),
            "Credential store opened"
        );
        Ok(Self {
            path: Some(path),
            slot: RwLock::new(initial),
        })
    }

    pub fn get(&self) -> Option<String> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_present(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn set(&self, api_key: &str) -> Result<(), CredentialError> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let body = serde_json::to_string(&StoredCredential {
                api_key: api_key.to_string(),
            })?;
            fs::write(path, body)?;
        }
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(api_key.to_string());
        Ok(())
    }

    pub fn remove(&self) -> Result<(), CredentialError> {
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_set_and_remove() {
        let store = CredentialStore::in_memory();
        assert!(store.get().is_none());
        store.set("abc").unwrap();
        assert_eq!(store.get().as_deref(), Some("abc"));
        store.remove().unwrap();
        assert!(!store.is_present());
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credential.json");

        let store = CredentialStore::open(&path).unwrap();
        assert!(store.get().is_none());
        store.set("secret").unwrap();

        let reopened = CredentialStore::open(&path).unwrap();
        assert_eq!(reopened.get().as_deref(), Some("secret"));

        reopened.remove().unwrap();
        assert!(!path.exists());
        // Removing twice is fine.
        reopened.remove().unwrap();
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "not json").unwrap();
        assert!(matches!(
            CredentialStore::open(file.path()),
            Err(CredentialError::Format(_))
        ));
    }
}
