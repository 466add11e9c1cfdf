//! Session token storage.
//!
//! Exactly one token is kept per installation, under [`TOKEN_KEY`]:
//! - Native targets: the OS keyring (libsecret/keyutils, Keychain,
//!   Credential Manager) via [`KeyringTokenStore`]
//! - Web-style key/value storage: a JSON file via [`FileTokenStore`]
//! - Tests: [`MemoryTokenStore`]
//!
//! Never log the token value.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use keyring::Entry;

use crate::error::StorageError;
use crate::fs_util::write_atomic;

/// Fixed key the session token lives under.
pub const TOKEN_KEY: &str = "voxa_auth_token";

const SERVICE_NAME: &str = "voxa";

/// A single-slot store for the session token.
pub trait TokenStore: Send + Sync {
    /// Current token, `None` if absent.
    fn get(&self) -> Result<Option<String>, StorageError>;
    fn set(&self, token: &str) -> Result<(), StorageError>;
    /// Remove the token. Removing an absent token is not an error.
    fn delete(&self) -> Result<(), StorageError>;
}

/// Token stored in the system keyring.
pub struct KeyringTokenStore;

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(&self) -> Result<Entry, StorageError> {
        Entry::new(SERVICE_NAME, TOKEN_KEY).map_err(|e| {
            StorageError::Unavailable(format!("failed to create keyring entry: {}", e))
        })
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self) -> Result<Option<String>, StorageError> {
        match self.entry()?.get_password() {
            Ok(token) if token.is_empty() => Ok(None),
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::Read(e.to_string())),
        }
    }

    fn set(&self, token: &str) -> Result<(), StorageError> {
        self.entry()?
            .set_password(token)
            .map_err(|e| StorageError::Write(e.to_string()))?;
        log::info!("TokenStore: stored session token in keyring");
        Ok(())
    }

    fn delete(&self) -> Result<(), StorageError> {
        match self.entry()?.delete_credential() {
            Ok(()) => {
                log::info!("TokenStore: deleted session token from keyring");
                Ok(())
            }
            // Already gone
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StorageError::Delete(e.to_string())),
        }
    }
}

/// Key/value JSON file, the local-storage flavour of token persistence.
///
/// The file holds a flat string map so it can share space with other keys;
/// only [`TOKEN_KEY`] is touched.
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| StorageError::Read(format!("parse {:?}: {}", self.path, e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::Read(format!("read {:?}: {}", self.path, e))),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), String> {
        let contents = serde_json::to_string_pretty(map).map_err(|e| e.to_string())?;
        write_atomic(&self.path, &contents)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self
            .read_map()?
            .remove(TOKEN_KEY)
            .filter(|token| !token.is_empty()))
    }

    fn set(&self, token: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        map.insert(TOKEN_KEY.to_string(), token.to_string());
        self.write_map(&map).map_err(StorageError::Write)?;
        log::info!("TokenStore: stored session token in {:?}", self.path);
        Ok(())
    }

    fn delete(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map().map_err(|e| StorageError::Delete(e.to_string()))?;
        if map.remove(TOKEN_KEY).is_none() {
            return Ok(());
        }
        self.write_map(&map).map_err(StorageError::Delete)?;
        log::info!("TokenStore: deleted session token from {:?}", self.path);
        Ok(())
    }
}

/// In-process store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            slot: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<String>, StorageError> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        Ok(slot.clone().filter(|token| !token.is_empty()))
    }

    fn set(&self, token: &str) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn delete(&self) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get().unwrap(), None);
        store.set("t1").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("t1"));
        store.delete().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn memory_store_treats_empty_token_as_absent() {
        let store = MemoryTokenStore::with_token("");
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn file_store_missing_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().join("storage.json"));
        assert_eq!(store.get().unwrap(), None);
        // Deleting from a missing file must not create it
        store.delete().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        FileTokenStore::new(&path).set("abc").unwrap();

        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.get().unwrap().as_deref(), Some("abc"));
        reopened.delete().unwrap();
        assert_eq!(FileTokenStore::new(&path).get().unwrap(), None);
    }

    #[test]
    fn file_store_keeps_unrelated_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let store = FileTokenStore::new(&path);
        store.set("abc").unwrap();
        store.delete().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("theme"));
        assert!(!contents.contains(TOKEN_KEY));
    }

    #[test]
    fn file_store_corrupt_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileTokenStore::new(&path);
        assert!(matches!(store.get(), Err(StorageError::Read(_))));
        assert!(store.set("abc").is_err());
    }
}
