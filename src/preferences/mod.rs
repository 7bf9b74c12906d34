//! Persisted key/value preferences
//!
//! The engine stores exactly one value here: the last mode it was switched to,
//! under [`MODE_PREFERENCE_KEY`].

mod file;

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

pub use file::FilePreferences;

/// Key under which the engine persists its current mode.
pub const MODE_PREFERENCE_KEY: &str = "recording_mode";

#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("Failed to write preferences: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A string key/value store that survives process restarts.
pub trait PreferenceStore: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;

    fn set_string(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// Volatile [`PreferenceStore`] for tests and embedders that do not persist.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one value.
    pub fn with_value(key: &str, value: &str) -> Self {
        let prefs = Self::new();
        prefs.values.lock().insert(key.to_string(), value.to_string());
        prefs
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
