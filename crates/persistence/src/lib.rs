// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]

//! Checkpoint persistence for dispute sessions.
//!
//! The runtime checkpoints a session after every committed mutation so
//! a process restart can resume from the last durably committed state:
//! current item, full bid history, and the remaining countdown at the
//! time of the checkpoint. Deadlines are stored as remaining durations,
//! not absolute instants, so downtime does not silently consume dispute
//! time — and a restored random window keeps its original draw, never a
//! re-draw or a duplicate item re-opening.

use pregao::{Session, TimerState};
use pregao_domain::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Errors from the checkpoint layer.
#[derive(Debug)]
pub enum PersistenceError {
    /// Filesystem operation failed.
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error message.
        message: String,
    },
    /// Checkpoint (de)serialization failed.
    Serialization {
        /// The underlying error message.
        message: String,
    },
    /// A lock was poisoned by a panicking writer.
    LockPoisoned,
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "I/O error at {}: {message}", path.display())
            }
            Self::Serialization { message } => {
                write!(f, "Checkpoint serialization error: {message}")
            }
            Self::LockPoisoned => write!(f, "Checkpoint store lock poisoned"),
        }
    }
}

impl std::error::Error for PersistenceError {}

/// A durable record of one session at a point in time.
///
/// The active countdown is captured as a remaining duration together
/// with its kind, and re-armed relative to the restore instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCheckpoint {
    /// The full session state.
    pub session: Session,
    /// Remaining seconds on the active countdown at capture, if one was
    /// running.
    pub remaining_secs: Option<i64>,
    /// Whether the active countdown was a random closing window.
    pub in_random_window: bool,
    /// When the checkpoint was captured (unix seconds, UTC).
    pub captured_at_unix: i64,
}

impl SessionCheckpoint {
    /// Captures a checkpoint of the session at `now`.
    #[must_use]
    pub fn capture(session: &Session, now: OffsetDateTime) -> Self {
        let (remaining_secs, in_random_window) = match session.timer {
            TimerState::Inactivity { deadline_unix } => {
                (Some((deadline_unix - now.unix_timestamp()).max(0)), false)
            }
            TimerState::RandomWindow { deadline_unix } => {
                (Some((deadline_unix - now.unix_timestamp()).max(0)), true)
            }
            TimerState::Frozen { .. } | TimerState::Idle => (None, false),
        };

        Self {
            session: session.clone(),
            remaining_secs,
            in_random_window,
            captured_at_unix: now.unix_timestamp(),
        }
    }

    /// Restores the session, re-arming the captured countdown relative
    /// to `now`.
    #[must_use]
    pub fn restore(self, now: OffsetDateTime) -> Session {
        let mut session: Session = self.session;
        if let Some(remaining) = self.remaining_secs {
            let deadline_unix: i64 = now.unix_timestamp() + remaining;
            session.timer = if self.in_random_window {
                TimerState::RandomWindow { deadline_unix }
            } else {
                TimerState::Inactivity { deadline_unix }
            };
        }
        session
    }

    /// The checkpointed session's identifier.
    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        &self.session.id
    }
}

/// Storage abstraction for session checkpoints.
pub trait CheckpointStore: Send + Sync {
    /// Persists a checkpoint, replacing any previous one for the same
    /// session.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be made durable.
    fn save(&self, checkpoint: &SessionCheckpoint) -> Result<(), PersistenceError>;

    /// Loads the checkpoint for one session, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint exists but cannot be read.
    fn load(&self, session_id: &SessionId) -> Result<Option<SessionCheckpoint>, PersistenceError>;

    /// Lists all stored checkpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be enumerated.
    fn list(&self) -> Result<Vec<SessionCheckpoint>, PersistenceError>;

    /// Removes the checkpoint for one session. Removing a missing
    /// checkpoint is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    fn remove(&self, session_id: &SessionId) -> Result<(), PersistenceError>;
}

/// File-backed checkpoint store: one JSON document per session,
/// written to a temporary file and renamed into place so readers never
/// observe a torn checkpoint.
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Opens (creating if needed) a checkpoint directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: &Path) -> Result<Self, PersistenceError> {
        fs::create_dir_all(dir).map_err(|e| PersistenceError::Io {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, session_id: &SessionId) -> PathBuf {
        // Session ids come from the workflow layer; keep only filename-
        // safe characters.
        let safe: String = session_id
            .value()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    fn read_checkpoint(path: &Path) -> Result<SessionCheckpoint, PersistenceError> {
        let data: Vec<u8> = fs::read(path).map_err(|e| PersistenceError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_slice(&data).map_err(|e| PersistenceError::Serialization {
            message: e.to_string(),
        })
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, checkpoint: &SessionCheckpoint) -> Result<(), PersistenceError> {
        let path: PathBuf = self.path_for(checkpoint.session_id());
        let tmp: PathBuf = path.with_extension("json.tmp");

        let data: Vec<u8> =
            serde_json::to_vec_pretty(checkpoint).map_err(|e| PersistenceError::Serialization {
                message: e.to_string(),
            })?;

        let mut file = fs::File::create(&tmp).map_err(|e| PersistenceError::Io {
            path: tmp.clone(),
            message: e.to_string(),
        })?;
        file.write_all(&data).map_err(|e| PersistenceError::Io {
            path: tmp.clone(),
            message: e.to_string(),
        })?;
        file.sync_all().map_err(|e| PersistenceError::Io {
            path: tmp.clone(),
            message: e.to_string(),
        })?;
        drop(file);

        fs::rename(&tmp, &path).map_err(|e| PersistenceError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;

        debug!(
            session_id = %checkpoint.session_id(),
            revision = checkpoint.session.revision,
            "Checkpoint persisted"
        );
        Ok(())
    }

    fn load(&self, session_id: &SessionId) -> Result<Option<SessionCheckpoint>, PersistenceError> {
        let path: PathBuf = self.path_for(session_id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_checkpoint(&path).map(Some)
    }

    fn list(&self) -> Result<Vec<SessionCheckpoint>, PersistenceError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| PersistenceError::Io {
            path: self.dir.clone(),
            message: e.to_string(),
        })?;

        let mut checkpoints: Vec<SessionCheckpoint> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PersistenceError::Io {
                path: self.dir.clone(),
                message: e.to_string(),
            })?;
            let path: PathBuf = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match Self::read_checkpoint(&path) {
                Ok(checkpoint) => checkpoints.push(checkpoint),
                Err(e) => {
                    // One corrupt file must not block recovery of the
                    // remaining sessions.
                    warn!(path = %path.display(), error = %e, "Skipping unreadable checkpoint");
                }
            }
        }
        Ok(checkpoints)
    }

    fn remove(&self, session_id: &SessionId) -> Result<(), PersistenceError> {
        let path: PathBuf = self.path_for(session_id);
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(&path).map_err(|e| PersistenceError::Io {
            path,
            message: e.to_string(),
        })
    }
}

/// In-memory checkpoint store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    checkpoints: Mutex<HashMap<String, SessionCheckpoint>>,
}

impl MemoryCheckpointStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&self, checkpoint: &SessionCheckpoint) -> Result<(), PersistenceError> {
        let mut map = self
            .checkpoints
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        map.insert(
            checkpoint.session_id().value().to_string(),
            checkpoint.clone(),
        );
        Ok(())
    }

    fn load(&self, session_id: &SessionId) -> Result<Option<SessionCheckpoint>, PersistenceError> {
        let map = self
            .checkpoints
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(map.get(session_id.value()).cloned())
    }

    fn list(&self) -> Result<Vec<SessionCheckpoint>, PersistenceError> {
        let map = self
            .checkpoints
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(map.values().cloned().collect())
    }

    fn remove(&self, session_id: &SessionId) -> Result<(), PersistenceError> {
        let mut map = self
            .checkpoints
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        map.remove(session_id.value());
        Ok(())
    }
}

#[cfg(test)]
mod tests;
