//! State that survives a full page reload
//!
//! Immediately before a forced reload the session records a human-readable
//! "why I reloaded" message and, per target, the timestamp of the compile
//! it expected the reload to deliver. The next startup consumes and clears
//! both. The timestamp is what makes reload-loop detection possible: if
//! the freshly loaded page still runs code with the recorded timestamp, the
//! reload did not actually deliver new code.
//!
//! Storage errors are never fatal; a session without persisted state simply
//! loses reload-loop detection for one cycle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use elmlink_core::prelude::*;

/// File name inside the state directory
const STATE_FILE_NAME: &str = "elmlink-state.json";

/// What gets written across a reload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Why the previous session forced a reload
    #[serde(default)]
    pub reload_message: Option<String>,
    /// Per-target compiled timestamp expected after the reload
    #[serde(default)]
    pub compiled_timestamps: HashMap<String, i64>,
}

/// File-backed store for [`PersistedState`]
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store backed by `<dir>/elmlink-state.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STATE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the persisted state: read it and clear the file.
    ///
    /// Missing or unreadable state is logged and treated as empty.
    pub fn take(&self) -> PersistedState {
        let state = match self.load() {
            Ok(state) => state,
            Err(Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                PersistedState::default()
            }
            Err(err) => {
                warn!("ignoring unreadable persisted state: {err}");
                PersistedState::default()
            }
        };
        if self.path.exists() {
            if let Err(err) = std::fs::remove_file(&self.path) {
                warn!("failed to clear persisted state: {err}");
            }
        }
        state
    }

    /// Record one target's expected post-reload timestamp (read-modify-write)
    pub fn record_timestamp(&self, target: &str, timestamp: i64) -> Result<()> {
        self.update(|state| {
            state.compiled_timestamps.insert(target.to_string(), timestamp);
        })
    }

    /// Record the "why I reloaded" message (read-modify-write)
    pub fn record_reload_message(&self, message: &str) -> Result<()> {
        self.update(|state| {
            state.reload_message = Some(message.to_string());
        })
    }

    fn load(&self) -> Result<PersistedState> {
        let text = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&text)
            .map_err(|err| Error::storage(format!("{}: {err}", self.path.display())))
    }

    fn update(&self, mutate: impl FnOnce(&mut PersistedState)) -> Result<()> {
        let mut state = match self.load() {
            Ok(state) => state,
            Err(Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                PersistedState::default()
            }
            Err(err) => {
                warn!("replacing unreadable persisted state: {err}");
                PersistedState::default()
            }
        };
        mutate(&mut state);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&state)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}
