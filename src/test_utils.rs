//! Test utilities and fixtures for podsync tests.
//!
//! Recording fakes for every collaborator of a batch, plus playlist
//! builders, so tests can observe exactly what the sync core did.
//!
//! # Example
//!
//! ```ignore
//! use podsync::test_utils::{FakeConverter, RecordingBackend, context, native_track, playlist_of};
//!
//! #[test]
//! fn test_something() {
//!     let backend = RecordingBackend::new();
//!     let playlist = playlist_of(&[native_track("A")]);
//!     // ... build a DeviceManager over `backend` and run a batch
//!     assert_eq!(backend.log().writes, 1);
//! }
//! ```

use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::default_presets;
use crate::convert::{ConversionOutcome, ConvertRequest, Converter, EncoderPreset};
use crate::cover::{ArtSize, ArtworkProvider, NoArtwork};
use crate::device::{
    DeviceBackend, DeviceDatabase, DeviceError, DeviceManager, DeviceTrack, DeviceTrackId,
};
use crate::host::{LocalPlaylist, PlaylistEntry, PlaylistHost};
use crate::sync::{SyncContext, SyncSettings};

// ============================================================================
// Playlists
// ============================================================================

/// A device-ready MP3 entry by "Artist", unselected.
pub fn native_track(title: &str) -> PlaylistEntry {
    PlaylistEntry::new()
        .with_meta("title", title)
        .with_meta("artist", "Artist")
        .with_meta("album", "Album")
        .with_meta(":URI", format!("/music/{}.mp3", title))
        .with_meta(":FILETYPE", "MP3")
        .with_duration(200.0)
}

/// Playlist holding clones of `entries` in order.
pub fn playlist_of(entries: &[PlaylistEntry]) -> Arc<LocalPlaylist> {
    let playlist = Arc::new(LocalPlaylist::new());
    for entry in entries {
        playlist.push(entry.clone());
    }
    playlist
}

/// Sync context over a playlist with no artwork and default settings.
pub fn context(
    playlist: &Arc<LocalPlaylist>,
    device: Arc<DeviceManager>,
    converter: FakeConverter,
) -> SyncContext {
    let host: Arc<dyn PlaylistHost> = playlist.clone();
    SyncContext {
        host,
        device,
        converter: Arc::new(converter),
        artwork: Arc::new(NoArtwork),
        settings: SyncSettings::default(),
    }
}

// ============================================================================
// Converter
// ============================================================================

/// Converter returning a fixed outcome.
///
/// The succeeding variant writes a small file at the requested output
/// path, like a real encoder would.
pub struct FakeConverter {
    presets: Vec<EncoderPreset>,
    outcome: Option<ConversionOutcome>,
    calls: AtomicUsize,
    last_artwork: Mutex<Option<PathBuf>>,
}

impl FakeConverter {
    pub fn succeeding() -> Self {
        Self {
            presets: default_presets(),
            outcome: None,
            calls: AtomicUsize::new(0),
            last_artwork: Mutex::new(None),
        }
    }

    pub fn with_outcome(outcome: ConversionOutcome) -> Self {
        Self {
            outcome: Some(outcome),
            ..Self::succeeding()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_artwork(&self) -> Option<PathBuf> {
        self.last_artwork.lock().clone()
    }
}

impl Converter for FakeConverter {
    fn presets(&self) -> &[EncoderPreset] {
        &self.presets
    }

    fn convert(&self, request: &ConvertRequest<'_>) -> ConversionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_artwork.lock() = request.artwork.map(Path::to_path_buf);

        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        let output = self.output_path(request);
        match std::fs::write(&output, b"converted audio") {
            Ok(()) => ConversionOutcome::Converted(output),
            Err(e) => ConversionOutcome::Failed(e.to_string()),
        }
    }
}

// ============================================================================
// Artwork
// ============================================================================

/// Artwork provider answering every lookup with the same path.
pub struct FixedArtwork {
    path: Option<PathBuf>,
    calls: AtomicUsize,
}

impl FixedArtwork {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ArtworkProvider for FixedArtwork {
    fn cover_path(&self, _uri: &str, _artist: &str, _album: &str, _size: ArtSize) -> Option<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.path.clone()
    }
}

// ============================================================================
// Device engine
// ============================================================================

/// Everything the recording device engine saw, plus failure switches.
#[derive(Debug, Default)]
pub struct DeviceLog {
    /// Titles passed to `add_track`, in call order
    pub added: Vec<String>,
    /// Thumbnail source of each added record
    pub thumbnails: Vec<Option<PathBuf>>,
    pub removed: Vec<DeviceTrackId>,
    /// Titles currently in the master playlist
    pub remaining: Vec<String>,
    /// Sources of successful copies
    pub copies: Vec<PathBuf>,
    pub copy_attempts: usize,
    pub writes: usize,
    pub parses: usize,
    /// Handles parsed and not yet dropped
    pub live_handles: usize,
    /// `live_handles` at the moment of each parse
    pub live_at_parse: Vec<usize>,

    /// Fail the n-th copy attempt (0-based)
    pub fail_copy_at: Option<usize>,
    pub fail_write: bool,
    pub fail_parse: bool,
}

/// Device backend whose databases record into a shared [`DeviceLog`].
#[derive(Clone, Default)]
pub struct RecordingBackend {
    log: Arc<Mutex<DeviceLog>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> MutexGuard<'_, DeviceLog> {
        self.log.lock()
    }

    pub fn log_mut(&self) -> MutexGuard<'_, DeviceLog> {
        self.log.lock()
    }
}

impl DeviceBackend for RecordingBackend {
    fn parse(&self, mountpoint: &Path) -> Result<Box<dyn DeviceDatabase>, DeviceError> {
        let mut log = self.log.lock();
        log.parses += 1;
        let live = log.live_handles;
        log.live_at_parse.push(live);

        if log.fail_parse {
            return Err(DeviceError::Parse {
                path: mountpoint.to_path_buf(),
                message: "corrupt database".to_string(),
            });
        }

        log.live_handles += 1;
        Ok(Box::new(RecordingDatabase {
            log: Arc::clone(&self.log),
            tracks: BTreeMap::new(),
            master: Vec::new(),
            next_id: 1,
        }))
    }
}

struct RecordingDatabase {
    log: Arc<Mutex<DeviceLog>>,
    tracks: BTreeMap<DeviceTrackId, DeviceTrack>,
    master: Vec<DeviceTrackId>,
    next_id: u32,
}

impl RecordingDatabase {
    fn sync_remaining(&self, log: &mut DeviceLog) {
        log.remaining = self
            .master
            .iter()
            .filter_map(|id| self.tracks.get(id))
            .map(|t| t.title.clone())
            .collect();
    }
}

impl DeviceDatabase for RecordingDatabase {
    fn add_track(&mut self, track: DeviceTrack) -> DeviceTrackId {
        let id = DeviceTrackId(self.next_id);
        self.next_id += 1;

        let log = Arc::clone(&self.log);
        let mut log = log.lock();
        log.added.push(track.title.clone());
        log.thumbnails.push(track.thumbnail.clone());

        self.tracks.insert(id, track);
        self.master.push(id);
        self.sync_remaining(&mut log);
        id
    }

    fn remove_track(&mut self, id: DeviceTrackId) -> Result<DeviceTrack, DeviceError> {
        let track = self
            .tracks
            .remove(&id)
            .ok_or(DeviceError::UnknownTrack(id))?;
        self.master.retain(|&t| t != id);

        let log = Arc::clone(&self.log);
        let mut log = log.lock();
        log.removed.push(id);
        self.sync_remaining(&mut log);
        Ok(track)
    }

    fn copy_to_device(&mut self, id: DeviceTrackId, source: &Path) -> Result<(), DeviceError> {
        let mut log = self.log.lock();
        let attempt = log.copy_attempts;
        log.copy_attempts += 1;

        if log.fail_copy_at == Some(attempt) {
            return Err(DeviceError::Copy {
                source_path: source.to_path_buf(),
                message: "device full".to_string(),
            });
        }

        let track = self
            .tracks
            .get_mut(&id)
            .ok_or(DeviceError::UnknownTrack(id))?;
        track.ipod_path = Some(format!(":iPod_Control:Music:F00:T{:03}", id.0));
        log.copies.push(source.to_path_buf());
        Ok(())
    }

    fn write(&mut self) -> Result<(), DeviceError> {
        let mut log = self.log.lock();
        log.writes += 1;
        if log.fail_write {
            return Err(DeviceError::Write {
                path: PathBuf::from("/media/IPOD"),
                message: "read-only filesystem".to_string(),
            });
        }
        Ok(())
    }

    fn track(&self, id: DeviceTrackId) -> Option<&DeviceTrack> {
        self.tracks.get(&id)
    }

    fn master_playlist(&self) -> &[DeviceTrackId] {
        &self.master
    }
}

impl Drop for RecordingDatabase {
    fn drop(&mut self) {
        self.log.lock().live_handles -= 1;
    }
}
