//! Super-header store and header validation.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{HttpError, Result};

pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(HttpError::Configuration(
            "header key cannot be empty".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_pair(key: &str, value: &str) -> Result<()> {
    validate_key(key)?;
    if value.is_empty() {
        return Err(HttpError::Configuration(
            "header value cannot be empty; use remove_super_header() or remove_header() to delete a header"
                .to_string(),
        ));
    }
    Ok(())
}

/// Key/value pairs added to every request constructed after they are set.
///
/// The store belongs to an [`HttpContext`](super::HttpContext) and lives as
/// long as it does. Each new request deep-copies the current snapshot at
/// construction time, so later mutations never affect already-built requests.
///
/// [`snapshot`](Self::snapshot) returns an independent copy; callers cannot
/// mutate the store through it.
pub struct SuperHeaders {
    entries: Mutex<HashMap<String, String>>,
}

impl SuperHeaders {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// An independent copy of the current super-header set.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries.lock().clone()
    }

    /// Insert a header, replacing the value if the key already exists.
    ///
    /// Fails with [`HttpError::Configuration`] if the key or value is empty.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let (key, value) = (key.into(), value.into());
        validate_pair(&key, &value)?;
        self.entries.lock().insert(key, value);
        Ok(())
    }

    /// Remove a header. Returns whether an entry was removed.
    ///
    /// Fails with [`HttpError::Configuration`] if the key is empty.
    pub fn remove(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.entries.lock().remove(key).is_some())
    }
}

impl std::fmt::Debug for SuperHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuperHeaders")
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}
