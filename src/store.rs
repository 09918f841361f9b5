//! Persistent session store
//!
//! Three independently addressable string slots hold the access token, the
//! refresh token and the serialized identity. [`SessionStore`] is a thin typed
//! accessor over a [`Storage`] backend and carries no session logic of its own.

use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::auth::{CredentialPair, Identity};
use crate::error::Result;

/// Slot holding the access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Slot holding the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Slot holding the serialized identity
pub const USER_KEY: &str = "user";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// String key/value persistence backend
pub trait Storage: Send + Sync {
    /// Read a slot. A missing slot is `None`, never an error.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a single slot
    fn set(&self, key: &str, value: &str) -> io::Result<()>;

    /// Write several slots in one step
    fn set_many(&self, entries: &[(&str, &str)]) -> io::Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Remove every listed slot in one step
    fn remove(&self, keys: &[&str]) -> io::Result<()>;
}

/// Storage that lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> io::Result<()> {
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> io::Result<()> {
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// Storage backed by a single JSON file.
///
/// Every change rewrites the whole file through a temporary sibling and a
/// rename, so readers after a restart see either the old or the new content.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Ignoring corrupt session file {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        debug!("Opened session file {} ({} slots)", path.display(), entries.len());

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> io::Result<()> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => {
                    // Unlinking can fail where overwriting does not
                    warn!("Failed to remove {}: {}", self.path.display(), e);
                    fs::write(&self.path, b"{}").map_err(|_| e)
                }
                _ => Ok(()),
            };
        }

        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)
    }

    fn update<F>(&self, change: F) -> io::Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = entries.clone();
        change(&mut next);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn set_many(&self, pairs: &[(&str, &str)]) -> io::Result<()> {
        self.update(|entries| {
            for (key, value) in pairs {
                entries.insert(key.to_string(), value.to_string());
            }
        })
    }

    /// Removed keys are gone from memory even when the file cannot be
    /// rewritten; the error is still reported.
    fn remove(&self, keys: &[&str]) -> io::Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            entries.remove(*key);
        }
        self.persist(&entries)
    }
}

/// Typed accessor for the persisted session
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Store kept in memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::default()))
    }

    fn slot(&self, key: &str) -> Option<String> {
        self.storage.get(key).filter(|value| !value.is_empty())
    }

    pub fn access_token(&self) -> Option<String> {
        self.slot(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.slot(REFRESH_TOKEN_KEY)
    }

    /// Both tokens, or `None` when either slot is empty
    pub fn credentials(&self) -> Option<CredentialPair> {
        Some(CredentialPair {
            access_token: self.access_token()?,
            refresh_token: self.refresh_token()?,
        })
    }

    /// The persisted identity. An undecodable record reads as absent.
    pub fn identity(&self) -> Option<Identity> {
        let raw = self.slot(USER_KEY)?;
        match Identity::decode(&raw) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!("Discarding undecodable identity record: {}", e);
                None
            }
        }
    }

    pub fn set_access_token(&self, token: &str) -> Result<()> {
        self.storage.set(ACCESS_TOKEN_KEY, token)?;
        Ok(())
    }

    pub fn set_refresh_token(&self, token: &str) -> Result<()> {
        self.storage.set(REFRESH_TOKEN_KEY, token)?;
        Ok(())
    }

    pub fn set_identity(&self, identity: &Identity) -> Result<()> {
        self.storage.set(USER_KEY, &identity.encode()?)?;
        Ok(())
    }

    /// Write tokens and identity together
    pub fn save(&self, identity: &Identity, credentials: &CredentialPair) -> Result<()> {
        let user = identity.encode()?;
        self.storage.set_many(&[
            (ACCESS_TOKEN_KEY, credentials.access_token.as_str()),
            (REFRESH_TOKEN_KEY, credentials.refresh_token.as_str()),
            (USER_KEY, user.as_str()),
        ])?;
        Ok(())
    }

    /// Remove all three slots
    pub fn clear(&self) -> Result<()> {
        self.storage.remove(&SESSION_KEYS)?;
        Ok(())
    }

    /// `true` when no slot holds a value
    pub fn is_empty(&self) -> bool {
        SESSION_KEYS.iter().all(|key| self.slot(key).is_none())
    }
}
