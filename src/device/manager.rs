//! Lifecycle of the single device database handle.

use parking_lot::{Mutex, MutexGuard};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{DeviceBackend, DeviceDatabase, DeviceError};

/// Owns at most one live [`DeviceDatabase`] for a configured mount point.
///
/// Loading again frees the current handle before parsing. A failed parse
/// leaves no handle. Holders of [`lock`](DeviceManager::lock) are the only
/// writers for as long as they keep the guard.
pub struct DeviceManager {
    backend: Arc<dyn DeviceBackend>,
    mountpoint: PathBuf,
    database: Mutex<Option<Box<dyn DeviceDatabase>>>,
}

impl DeviceManager {
    pub fn new(backend: Arc<dyn DeviceBackend>, mountpoint: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            mountpoint: mountpoint.into(),
            database: Mutex::new(None),
        }
    }

    pub fn mountpoint(&self) -> &Path {
        &self.mountpoint
    }

    /// Parse the device database, replacing any loaded one.
    pub fn load(&self) -> Result<(), DeviceError> {
        let mut database = self.database.lock();

        if database.take().is_some() {
            tracing::debug!(target: "podsync::device", "Freed previous device database");
        }

        match self.backend.parse(&self.mountpoint) {
            Ok(db) => {
                tracing::info!(
                    target: "podsync::device",
                    "Loaded device database at {:?} ({} tracks)",
                    self.mountpoint,
                    db.track_count()
                );
                *database = Some(db);
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    target: "podsync::device",
                    "Failed to load device database at {:?}: {}",
                    self.mountpoint,
                    e
                );
                Err(e)
            }
        }
    }

    /// Drop the loaded database, if any.
    pub fn free(&self) {
        if self.database.lock().take().is_some() {
            tracing::info!(target: "podsync::device", "Released device database");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.database.lock().is_some()
    }

    /// Exclusive access to the handle slot.
    pub fn lock(&self) -> MutexGuard<'_, Option<Box<dyn DeviceDatabase>>> {
        self.database.lock()
    }

    /// Run `f` against the loaded database; `None` when nothing is loaded.
    pub fn with_database<T>(&self, f: impl FnOnce(&mut dyn DeviceDatabase) -> T) -> Option<T> {
        let mut database = self.database.lock();
        database.as_mut().map(|db| f(db.as_mut()))
    }
}
