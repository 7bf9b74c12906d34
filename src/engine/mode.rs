use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::preferences::{PreferenceStore, MODE_PREFERENCE_KEY};

/// What the engine does with bytes passed to
/// [`SnapshotEngine::capture_or_serve`](super::SnapshotEngine::capture_or_serve).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Pass bytes through untouched.
    #[default]
    Disabled,
    /// Write bytes to the store, then pass them through.
    Recording,
    /// Serve bytes from the store instead of the caller's.
    Replaying,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Disabled, Mode::Recording, Mode::Replaying];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Disabled => "disabled",
            Mode::Recording => "recording",
            Mode::Replaying => "replaying",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown mode: {0:?} (expected disabled, recording or replaying)")]
pub struct ParseModeError(pub String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(Mode::Disabled),
            "recording" => Ok(Mode::Recording),
            "replaying" => Ok(Mode::Replaying),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Resolve the mode the engine starts in.
///
/// With `restore_previous`, a persisted mode wins when it parses; anything
/// else falls back to `default_mode`.
pub fn resolve_start_mode(
    default_mode: Mode,
    restore_previous: bool,
    preferences: &dyn PreferenceStore,
) -> Mode {
    if !restore_previous {
        return default_mode;
    }

    match preferences.get_string(MODE_PREFERENCE_KEY) {
        Some(raw) => raw.parse().unwrap_or_else(|e: ParseModeError| {
            tracing::debug!(error = %e, "Ignoring persisted mode");
            default_mode
        }),
        None => default_mode,
    }
}
