//! Durable storage for the last confirmed `StateRecord`.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::atomic::write_atomic;
use crate::error::PowerdError;
use crate::state::StateRecord;

pub trait StateStore {
    /// Last saved record, or `None` when nothing usable is stored.
    fn load(&self) -> Option<StateRecord>;
    fn save(&mut self, record: &StateRecord) -> Result<(), PowerdError>;
}

impl<T: StateStore + ?Sized> StateStore for Box<T> {
    fn load(&self) -> Option<StateRecord> {
        (**self).load()
    }

    fn save(&mut self, record: &StateRecord) -> Result<(), PowerdError> {
        (**self).save(record)
    }
}

/// One JSON document on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open a store at `path`, creating the parent directory if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PowerdError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                PowerdError::Persistence(format!("create {}: {e}", parent.display()))
            })?;
        }
        Ok(Self { path })
    }

    /// Store handle for reading only; touches nothing on disk.
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Option<StateRecord> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file unreadable; treating as unknown");
                return None;
            }
        };
        match serde_json::from_str::<StateRecord>(&text) {
            Ok(rec) => Some(rec),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file corrupt; treating as unknown");
                None
            }
        }
    }

    fn save(&mut self, record: &StateRecord) -> Result<(), PowerdError> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| PowerdError::Persistence(format!("encode state: {e}")))?;
        write_atomic(&self.path, &bytes)
            .map_err(|e| PowerdError::Persistence(format!("write {}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), state = %record.state, "state saved");
        Ok(())
    }
}
