//! Device database seam.
//!
//! The persistence engine is external: a [`DeviceBackend`] parses the
//! database found at a mount point into a [`DeviceDatabase`] handle, which
//! owns the track records, the master playlist and the copied files.
//! [`DeviceManager`] owns the single live handle; [`build_track`] maps
//! resolved metadata onto a [`DeviceTrack`].
//!
//! [`FsDevice`] is a reference engine that keeps its database as JSON on
//! the device itself.

mod builder;
pub mod fs;
mod manager;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use builder::build_track;
pub use fs::{FsDevice, init_device};
pub use manager::DeviceManager;

/// Identifier the device database assigns on [`DeviceDatabase::add_track`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceTrackId(pub u32);

impl fmt::Display for DeviceTrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One track record in the device schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceTrack {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub track_nr: i32,
    pub cd_nr: i32,
    pub comment: String,
    /// Length in milliseconds
    pub tracklen: u32,

    /// Source image for the thumbnail, consumed by the engine
    #[serde(skip)]
    pub thumbnail: Option<PathBuf>,

    // Filled in by the engine
    /// Device-side thumbnail path
    pub artwork: Option<String>,
    /// Colon-separated path of the audio file on the device
    pub ipod_path: Option<String>,
    pub filetype: Option<String>,
    /// File size in bytes
    pub size: u64,
    /// RFC 3339 timestamp
    pub time_added: Option<String>,
}

/// Errors raised by a device persistence engine.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Not a device mount point: {0}")]
    NotADevice(PathBuf),

    #[error("Failed to parse device database {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to copy {source_path} to device: {message}")]
    Copy { source_path: PathBuf, message: String },

    #[error("Failed to write device database {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown device track {0}")]
    UnknownTrack(DeviceTrackId),
}

impl DeviceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A parsed, mutable device database.
///
/// Changes live in memory until [`write`](DeviceDatabase::write).
pub trait DeviceDatabase: Send {
    /// Take ownership of a record, attach it to the master playlist and
    /// return its id.
    fn add_track(&mut self, track: DeviceTrack) -> DeviceTrackId;

    /// Detach a record from the master playlist and drop it.
    fn remove_track(&mut self, id: DeviceTrackId) -> Result<DeviceTrack, DeviceError>;

    /// Copy the audio for `id` onto the device and update its record.
    fn copy_to_device(&mut self, id: DeviceTrackId, source: &Path) -> Result<(), DeviceError>;

    /// Persist the database to the device.
    fn write(&mut self) -> Result<(), DeviceError>;

    fn track(&self, id: DeviceTrackId) -> Option<&DeviceTrack>;

    /// Track ids in master playlist order.
    fn master_playlist(&self) -> &[DeviceTrackId];

    fn track_count(&self) -> usize {
        self.master_playlist().len()
    }

    /// Records in master playlist order.
    fn tracks(&self) -> Vec<(DeviceTrackId, &DeviceTrack)> {
        self.master_playlist()
            .iter()
            .filter_map(|&id| self.track(id).map(|t| (id, t)))
            .collect()
    }
}

/// Opens device databases.
pub trait DeviceBackend: Send + Sync {
    /// Parse the database at `mountpoint` into a fresh handle.
    fn parse(&self, mountpoint: &Path) -> Result<Box<dyn DeviceDatabase>, DeviceError>;
}
