//! Key-value persistence backends.
//!
//! Defines the [`KeyValueStore`] trait the device identity is persisted
//! through, and provides [`FileKeyStore`], which keeps one file per key under
//! `~/.clawlink/identity/`, plus the in-memory [`MemoryKeyStore`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::StoreError;

/// Maximum allowed length for a key name.
const MAX_NAME_LEN: usize = 128;

/// Minimal persistence interface for identity material.
///
/// Synchronous on purpose: identity loading happens once at startup and must
/// not depend on a runtime.
pub trait KeyValueStore: Send + Sync {
    /// Load the bytes stored under `key`, or `None` if nothing is stored.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `value` under `key`, replacing any previous value atomically.
    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

/// A file-system-backed key-value store.
///
/// Each key is stored as an individual file at `{base_dir}/{key}`. The
/// directory is created with mode `0700` and files with mode `0600` on Unix.
pub struct FileKeyStore {
    base_dir: PathBuf,
}

impl FileKeyStore {
    /// Create a new store rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The directory this store writes into.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Ensure the base directory exists with restrictive permissions.
    fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(&self.base_dir, perms)?;
        }

        Ok(())
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(key)
    }
}

/// Validate that a key name contains only safe characters.
///
/// Allowed: ASCII alphanumeric, underscore, hyphen. Max length 128.
fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() {
        return Err(StoreError::InvalidName("name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(StoreError::InvalidName(format!(
            "name exceeds maximum length of {MAX_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(StoreError::InvalidName(format!(
            "name contains invalid characters (allowed: alphanumeric, underscore, hyphen): {name}"
        )));
    }
    Ok(())
}

/// Write `data` to a temp file beside `path` (mode 0600 on Unix), then
/// rename it into place.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&temp_path, perms)?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

impl KeyValueStore for FileKeyStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        validate_name(key)?;

        let path = self.key_path(key);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(key, path = %path.display(), "loaded stored value");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        validate_name(key)?;
        self.ensure_dir()?;

        let path = self.key_path(key);
        debug!(key, path = %path.display(), "writing stored value");
        write_atomic(&path, value)
    }
}

/// An in-memory key-value store.
#[derive(Default)]
pub struct MemoryKeyStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        validate_name(key)?;
        Ok(self.entries.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        validate_name(key)?;
        self.entries.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
