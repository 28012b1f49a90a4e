//! JSON-backed device engine.
//!
//! A device is any directory with this layout:
//!
//! ```text
//! <mountpoint>/iPod_Control/
//!     iTunes/podsync.json   track records and master playlist
//!     Music/F00 .. F19/     audio files under random four-letter names
//!     Artwork/              128x128 PNG thumbnails
//! ```
//!
//! Device paths stored in records are colon-separated and relative to the
//! mount point, e.g. `:iPod_Control:Music:F07:QX3Z.mp3`.

use chrono::Utc;
use image::ImageFormat;
use image::imageops::FilterType;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::{DeviceBackend, DeviceDatabase, DeviceError, DeviceTrack, DeviceTrackId};

/// Top-level control directory that marks a mount point as a device.
pub const CONTROL_DIR: &str = "iPod_Control";

/// Number of `Fnn` music folders.
pub const MUSIC_FOLDERS: u32 = 20;

/// Edge length of stored thumbnails.
pub const THUMBNAIL_SIZE: u32 = 128;

const DATABASE_FILE: &str = "podsync.json";

/// Path of the database file under a mount point.
pub fn database_path(mountpoint: &Path) -> PathBuf {
    mountpoint.join(CONTROL_DIR).join("iTunes").join(DATABASE_FILE)
}

fn music_dir(mountpoint: &Path) -> PathBuf {
    mountpoint.join(CONTROL_DIR).join("Music")
}

fn artwork_dir(mountpoint: &Path) -> PathBuf {
    mountpoint.join(CONTROL_DIR).join("Artwork")
}

/// On-disk form of the database.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DatabaseFile {
    name: Option<String>,
    last_synced: Option<String>,
    next_id: u32,
    tracks: Vec<StoredTrack>,
    master_playlist: Vec<DeviceTrackId>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredTrack {
    id: DeviceTrackId,
    #[serde(flatten)]
    track: DeviceTrack,
}

/// [`DeviceBackend`] for the JSON layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDevice;

impl DeviceBackend for FsDevice {
    fn parse(&self, mountpoint: &Path) -> Result<Box<dyn DeviceDatabase>, DeviceError> {
        Ok(Box::new(FsDatabase::open(mountpoint)?))
    }
}

/// In-memory view of a device database.
#[derive(Debug)]
pub struct FsDatabase {
    mountpoint: PathBuf,
    name: Option<String>,
    last_synced: Option<String>,
    next_id: u32,
    tracks: BTreeMap<DeviceTrackId, DeviceTrack>,
    master: Vec<DeviceTrackId>,
}

impl FsDatabase {
    /// Read the database at `mountpoint`. A device without a database
    /// file opens empty.
    pub fn open(mountpoint: &Path) -> Result<Self, DeviceError> {
        if !mountpoint.join(CONTROL_DIR).is_dir() {
            return Err(DeviceError::NotADevice(mountpoint.to_path_buf()));
        }

        let path = database_path(mountpoint);
        let file = if path.exists() {
            let content =
                fs::read_to_string(&path).map_err(|e| DeviceError::io(&path, e))?;
            serde_json::from_str::<DatabaseFile>(&content).map_err(|e| DeviceError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?
        } else {
            tracing::debug!(target: "podsync::device", "No database at {:?}, starting empty", path);
            DatabaseFile::default()
        };

        let tracks: BTreeMap<_, _> = file.tracks.into_iter().map(|t| (t.id, t.track)).collect();
        let master = file
            .master_playlist
            .into_iter()
            .filter(|id| tracks.contains_key(id))
            .collect();
        let highest = tracks.keys().next_back().map(|id| id.0 + 1).unwrap_or(1);

        Ok(Self {
            mountpoint: mountpoint.to_path_buf(),
            name: file.name,
            last_synced: file.last_synced,
            next_id: file.next_id.max(highest),
            tracks,
            master,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// RFC 3339 time of the last successful write.
    pub fn last_synced(&self) -> Option<&str> {
        self.last_synced.as_deref()
    }

    fn to_file(&self) -> DatabaseFile {
        DatabaseFile {
            name: self.name.clone(),
            last_synced: self.last_synced.clone(),
            next_id: self.next_id,
            tracks: self
                .tracks
                .iter()
                .map(|(&id, track)| StoredTrack {
                    id,
                    track: track.clone(),
                })
                .collect(),
            master_playlist: self.master.clone(),
        }
    }

    /// Turn pending thumbnail sources into stored thumbnails.
    ///
    /// A thumbnail that can't be made is skipped with a warning.
    fn store_thumbnails(&mut self) {
        for (id, track) in self.tracks.iter_mut() {
            let Some(source) = track.thumbnail.take() else {
                continue;
            };
            match write_thumbnail(&self.mountpoint, *id, &source) {
                Ok(device_path) => track.artwork = Some(device_path),
                Err(e) => tracing::warn!(
                    target: "podsync::device",
                    "No thumbnail for {:?} from {:?}: {}",
                    track.title,
                    source,
                    e
                ),
            }
        }
    }
}

impl DeviceDatabase for FsDatabase {
    fn add_track(&mut self, mut track: DeviceTrack) -> DeviceTrackId {
        let id = DeviceTrackId(self.next_id);
        self.next_id += 1;

        track.time_added = Some(Utc::now().to_rfc3339());
        tracing::debug!(target: "podsync::device", "Adding track {} ({:?})", id, track.title);
        self.tracks.insert(id, track);
        self.master.push(id);
        id
    }

    fn remove_track(&mut self, id: DeviceTrackId) -> Result<DeviceTrack, DeviceError> {
        let track = self
            .tracks
            .remove(&id)
            .ok_or(DeviceError::UnknownTrack(id))?;
        self.master.retain(|&t| t != id);

        if let Some(path) = track.ipod_path.as_deref().map(|p| host_path(&self.mountpoint, p))
            && path.exists()
            && let Err(e) = fs::remove_file(&path)
        {
            tracing::warn!(target: "podsync::device", "Failed to remove {:?}: {}", path, e);
        }

        tracing::debug!(target: "podsync::device", "Removed track {}", id);
        Ok(track)
    }

    fn copy_to_device(&mut self, id: DeviceTrackId, source: &Path) -> Result<(), DeviceError> {
        let track = self
            .tracks
            .get_mut(&id)
            .ok_or(DeviceError::UnknownTrack(id))?;

        let copy_error = |message: String| DeviceError::Copy {
            source_path: source.to_path_buf(),
            message,
        };

        if !source.is_file() {
            return Err(copy_error("source file does not exist".to_string()));
        }

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let dest = unique_destination(&self.mountpoint, &extension)
            .map_err(|e| copy_error(e.to_string()))?;
        let size = copy_or_discard(source, &dest, |from, to| fs::copy(from, to))
            .map_err(|e| copy_error(e.to_string()))?;

        track.ipod_path = Some(device_path(&self.mountpoint, &dest));
        track.filetype = Some(filetype_for_extension(&extension));
        track.size = size;

        tracing::debug!(target: "podsync::device", "Copied {:?} -> {:?} ({} bytes)", source, dest, size);
        Ok(())
    }

    fn write(&mut self) -> Result<(), DeviceError> {
        self.store_thumbnails();
        self.last_synced = Some(Utc::now().to_rfc3339());

        let path = database_path(&self.mountpoint);
        let write_error = |message: String| DeviceError::Write {
            path: path.clone(),
            message,
        };

        let json =
            serde_json::to_string_pretty(&self.to_file()).map_err(|e| write_error(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        }

        // Write to temp file first, then rename (atomic on most systems)
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(|e| write_error(e.to_string()))?;
        fs::rename(&temp_path, &path).map_err(|e| write_error(e.to_string()))?;

        tracing::info!(
            target: "podsync::device",
            "Wrote device database {:?} ({} tracks)",
            path,
            self.tracks.len()
        );
        Ok(())
    }

    fn track(&self, id: DeviceTrackId) -> Option<&DeviceTrack> {
        self.tracks.get(&id)
    }

    fn master_playlist(&self) -> &[DeviceTrackId] {
        &self.master
    }
}

/// Create the directory layout of a blank device and an empty database.
///
/// Existing tracks are kept; only the name is updated when given.
pub fn init_device(mountpoint: &Path, name: Option<&str>) -> Result<(), DeviceError> {
    let music = music_dir(mountpoint);
    for n in 0..MUSIC_FOLDERS {
        let folder = music.join(format!("F{:02}", n));
        fs::create_dir_all(&folder).map_err(|e| DeviceError::io(&folder, e))?;
    }
    for dir in [
        artwork_dir(mountpoint),
        mountpoint.join(CONTROL_DIR).join("iTunes"),
    ] {
        fs::create_dir_all(&dir).map_err(|e| DeviceError::io(&dir, e))?;
    }

    let mut db = FsDatabase::open(mountpoint)?;
    if let Some(name) = name {
        db.name = Some(name.to_string());
    }
    db.write()?;

    tracing::info!(target: "podsync::device", "Initialized device at {:?}", mountpoint);
    Ok(())
}

/// Run `copy` from `source` to `dest`. On failure, whatever it left at
/// `dest` is deleted before the error is returned.
fn copy_or_discard(
    source: &Path,
    dest: &Path,
    copy: impl FnOnce(&Path, &Path) -> io::Result<u64>,
) -> io::Result<u64> {
    copy(source, dest).inspect_err(|_| {
        if dest.exists()
            && let Err(e) = fs::remove_file(dest)
        {
            tracing::warn!(target: "podsync::device", "Failed to remove partial copy {:?}: {}", dest, e);
        }
    })
}

/// Pick an unused `Music/Fnn/XXXX.ext` path, creating the folder if needed.
fn unique_destination(mountpoint: &Path, extension: &str) -> io::Result<PathBuf> {
    let mut rng = rand::rng();
    loop {
        let folder = music_dir(mountpoint).join(format!("F{:02}", rng.random_range(0..MUSIC_FOLDERS)));
        fs::create_dir_all(&folder)?;

        let stem: String = (0..4)
            .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_uppercase())
            .collect();
        let file_name = if extension.is_empty() {
            stem
        } else {
            format!("{}.{}", stem, extension)
        };

        let candidate = folder.join(file_name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
}

fn write_thumbnail(
    mountpoint: &Path,
    id: DeviceTrackId,
    source: &Path,
) -> Result<String, image::ImageError> {
    let thumb = image::open(source)?.resize_to_fill(
        THUMBNAIL_SIZE,
        THUMBNAIL_SIZE,
        FilterType::Lanczos3,
    );

    let dir = artwork_dir(mountpoint);
    fs::create_dir_all(&dir)?;
    let dest = dir.join(format!("T{:05}.png", id.0));
    thumb.save_with_format(&dest, ImageFormat::Png)?;

    Ok(device_path(mountpoint, &dest))
}

/// Colon-separated device path of a file under the mount point.
pub fn device_path(mountpoint: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(mountpoint).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(format!(":{}", part.to_string_lossy())),
            _ => None,
        })
        .collect()
}

/// Host path for a colon-separated device path.
pub fn host_path(mountpoint: &Path, device_path: &str) -> PathBuf {
    device_path
        .split(':')
        .filter(|part| !part.is_empty())
        .fold(mountpoint.to_path_buf(), |path, part| path.join(part))
}

fn filetype_for_extension(extension: &str) -> String {
    match extension {
        "mp3" => "MPEG audio file".to_string(),
        "m4a" | "m4b" | "mp4" | "aac" => "AAC audio file".to_string(),
        "" => "Audio file".to_string(),
        other => format!("{} audio file", other.to_uppercase()),
    }
}
