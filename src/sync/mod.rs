//! Batch copy orchestration.
//!
//! One batch copies a [`SelectionSnapshot`] onto the device:
//!
//! ```text
//! for each track, in playlist order:
//!     resolve metadata -> resolve artwork -> build record -> add to database
//!     -> convert if needed -> copy to device
//! write the database once
//! ```
//!
//! The first failing track stops the batch. Its record is removed again;
//! tracks copied before it stay. The database is written exactly once per
//! batch whenever one is loaded, including for an empty selection.

mod worker;

use crossbeam_channel::Sender;
use std::path::PathBuf;
use std::sync::Arc;

pub use worker::{BatchTicket, SyncWorker};

use crate::convert::{self, ConversionSettings, Converter};
use crate::cover::{ArtSize, ArtworkProvider};
use crate::device::{DeviceDatabase, DeviceManager, DeviceTrackId, build_track};
use crate::error::{Error, Result};
use crate::host::{ItemId, PlaylistHost, SelectionSnapshot, TrackHandle};
use crate::metadata::ResolvedMetadata;

/// Per-batch settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Preset and output naming for tracks that need conversion
    pub conversion: ConversionSettings,
    /// Look up artwork for thumbnails and embedding
    pub artwork: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            conversion: ConversionSettings::default(),
            artwork: true,
        }
    }
}

/// Collaborators a batch runs against.
pub struct SyncContext {
    pub host: Arc<dyn PlaylistHost>,
    pub device: Arc<DeviceManager>,
    pub converter: Arc<dyn Converter>,
    pub artwork: Arc<dyn ArtworkProvider>,
    pub settings: SyncSettings,
}

/// Progress notifications, in the order they happen.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    BatchStarted { selected: usize },
    TrackCopied { index: usize, id: DeviceTrackId, title: String },
    TrackFailed(TrackFailure),
    Committed { copied: usize },
    CommitFailed { message: String },
    BatchFinished(BatchReport),
}

/// The track that stopped a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFailure {
    /// Position in the snapshot
    pub index: usize,
    pub item: ItemId,
    pub message: String,
}

/// How the final database write went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Written,
    Failed(String),
    /// No database was loaded, nothing was attempted
    NoDatabase,
}

/// Summary of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Tracks in the snapshot
    pub selected: usize,
    /// Tracks copied and kept in the database
    pub copied: usize,
    pub failure: Option<TrackFailure>,
    pub commit: CommitOutcome,
}

impl BatchReport {
    /// Every selected track was copied and the database was written.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.copied == self.selected && self.commit == CommitOutcome::Written
    }
}

fn emit(events: Option<&Sender<SyncEvent>>, event: SyncEvent) {
    if let Some(tx) = events {
        // Nobody listening is fine
        let _ = tx.send(event);
    }
}

/// Run one batch to completion on the calling thread.
///
/// Holds the device database guard for the whole batch. The snapshot is
/// consumed: every reference it holds is released before the commit.
pub fn run_batch(
    ctx: &SyncContext,
    snapshot: SelectionSnapshot,
    events: Option<&Sender<SyncEvent>>,
) -> BatchReport {
    let selected = snapshot.len();
    tracing::info!(target: "podsync::sync", "Starting batch of {} tracks", selected);
    emit(events, SyncEvent::BatchStarted { selected });

    let mut guard = ctx.device.lock();
    let Some(db) = guard.as_deref_mut() else {
        tracing::warn!(
            target: "podsync::sync",
            "No device database loaded, skipping {} tracks",
            selected
        );
        drop(snapshot);
        let report = BatchReport {
            selected,
            copied: 0,
            failure: None,
            commit: CommitOutcome::NoDatabase,
        };
        emit(events, SyncEvent::BatchFinished(report.clone()));
        return report;
    };

    let mut copied = 0;
    let mut failure = None;

    for (index, track) in snapshot.iter().enumerate() {
        match copy_track(ctx, db, track) {
            Ok((id, title)) => {
                copied += 1;
                tracing::info!(target: "podsync::sync", "Copied {:?} ({}/{})", title, index + 1, selected);
                emit(events, SyncEvent::TrackCopied { index, id, title });
            }
            Err(e) => {
                tracing::warn!(
                    target: "podsync::sync",
                    "Track {} failed, stopping batch: {}",
                    track.item(),
                    e
                );
                let track_failure = TrackFailure {
                    index,
                    item: track.item(),
                    message: e.to_string(),
                };
                emit(events, SyncEvent::TrackFailed(track_failure.clone()));
                failure = Some(track_failure);
                break;
            }
        }
    }

    drop(snapshot);

    let commit = match db.write() {
        Ok(()) => {
            tracing::info!(target: "podsync::sync", "Committed device database ({} copied)", copied);
            emit(events, SyncEvent::Committed { copied });
            CommitOutcome::Written
        }
        Err(e) => {
            tracing::error!(target: "podsync::sync", "Failed to write device database: {}", e);
            emit(
                events,
                SyncEvent::CommitFailed {
                    message: e.to_string(),
                },
            );
            CommitOutcome::Failed(e.to_string())
        }
    };

    let report = BatchReport {
        selected,
        copied,
        failure,
        commit,
    };
    emit(events, SyncEvent::BatchFinished(report.clone()));
    report
}

/// Copy one track. On error the record, if added, is removed again.
fn copy_track(
    ctx: &SyncContext,
    db: &mut dyn DeviceDatabase,
    track: &TrackHandle,
) -> Result<(DeviceTrackId, String)> {
    let metadata = ResolvedMetadata::resolve(track);
    let artwork = find_artwork(ctx, track, &metadata);

    let id = db.add_track(build_track(&metadata, artwork.clone()));

    let copied = convert::prepare_source(
        track,
        &metadata,
        ctx.converter.as_ref(),
        &ctx.settings.conversion,
        artwork.as_deref(),
    )
    .and_then(|source| {
        // The conversion workspace lives until the bytes are on the device
        db.copy_to_device(id, source.path()).map_err(Error::from)
    });

    if let Err(e) = copied {
        if let Err(remove_err) = db.remove_track(id) {
            tracing::warn!(target: "podsync::sync", "Failed to remove record {}: {}", id, remove_err);
        }
        return Err(e);
    }

    Ok((id, metadata.title))
}

fn find_artwork(
    ctx: &SyncContext,
    track: &TrackHandle,
    metadata: &ResolvedMetadata,
) -> Option<PathBuf> {
    if !ctx.settings.artwork {
        return None;
    }

    let uri = track.meta(":URI")?;
    let found = ctx
        .artwork
        .cover_path(&uri, &metadata.artist, &metadata.album, ArtSize::Native);
    if found.is_none() {
        tracing::debug!(target: "podsync::sync", "No artwork for {}", uri);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConversionOutcome;
    use crate::host::LocalPlaylist;
    use crate::test_utils::{
        FakeConverter, FixedArtwork, RecordingBackend, context, native_track, playlist_of,
    };

    fn loaded(backend: &RecordingBackend) -> Arc<DeviceManager> {
        let manager = Arc::new(DeviceManager::new(Arc::new(backend.clone()), "/media/IPOD"));
        manager.load().unwrap();
        manager
    }

    fn snapshot(playlist: &Arc<LocalPlaylist>) -> SelectionSnapshot {
        let host: Arc<dyn PlaylistHost> = playlist.clone();
        SelectionSnapshot::capture(&host)
    }

    #[test]
    fn test_copies_all_and_commits_once() {
        let backend = RecordingBackend::new();
        let playlist = playlist_of(&[native_track("A"), native_track("B"), native_track("C")]);
        playlist.select_all();
        let ctx = context(&playlist, loaded(&backend), FakeConverter::succeeding());

        let report = run_batch(&ctx, snapshot(&playlist), None);

        assert!(report.is_complete());
        assert_eq!(report.copied, 3);
        let log = backend.log();
        assert_eq!(log.added, vec!["A", "B", "C"]);
        assert_eq!(log.copies.len(), 3);
        assert_eq!(log.writes, 1);
        assert!(log.removed.is_empty());
    }

    #[test]
    fn test_fail_fast_on_copy_error() {
        let backend = RecordingBackend::new();
        backend.log_mut().fail_copy_at = Some(1);
        let playlist = playlist_of(&[native_track("A"), native_track("B"), native_track("C")]);
        playlist.select_all();
        let ids = snapshot(&playlist).items();
        let ctx = context(&playlist, loaded(&backend), FakeConverter::succeeding());

        let report = run_batch(&ctx, snapshot(&playlist), None);

        assert_eq!(report.copied, 1);
        let failure = report.failure.clone().unwrap();
        assert_eq!(failure.index, 1);
        assert_eq!(failure.item, ids[1]);
        assert_eq!(report.commit, CommitOutcome::Written);

        let log = backend.log();
        // C was never attempted
        assert_eq!(log.added, vec!["A", "B"]);
        assert_eq!(log.removed.len(), 1);
        assert_eq!(log.remaining, vec!["A"]);
        assert_eq!(log.writes, 1);
    }

    #[test]
    fn test_fail_fast_on_conversion_error() {
        let backend = RecordingBackend::new();
        let playlist = playlist_of(&[
            native_track("A"),
            native_track("B").with_meta(":FILETYPE", "FLAC"),
            native_track("C"),
        ]);
        playlist.select_all();
        let converter =
            FakeConverter::with_outcome(ConversionOutcome::Failed("bad stream".to_string()));
        let ctx = context(&playlist, loaded(&backend), converter);

        let report = run_batch(&ctx, snapshot(&playlist), None);

        assert_eq!(report.copied, 1);
        assert!(report.failure.unwrap().message.contains("bad stream"));
        let log = backend.log();
        assert_eq!(log.remaining, vec!["A"]);
        assert_eq!(log.copies.len(), 1);
        assert_eq!(log.writes, 1);
    }

    #[test]
    fn test_missing_preset_stops_batch() {
        let backend = RecordingBackend::new();
        let playlist = playlist_of(&[native_track("A").with_meta(":FILETYPE", "OggVorbis")]);
        playlist.select_all();
        let mut ctx = context(&playlist, loaded(&backend), FakeConverter::succeeding());
        ctx.settings.conversion.preset = "Nope".to_string();

        let report = run_batch(&ctx, snapshot(&playlist), None);

        assert_eq!(report.copied, 0);
        assert!(report.failure.unwrap().message.contains("Nope"));
        assert!(backend.log().remaining.is_empty());
        assert_eq!(backend.log().writes, 1);
    }

    #[test]
    fn test_converted_track_is_copied_from_workdir() {
        let backend = RecordingBackend::new();
        let playlist = playlist_of(&[native_track("A").with_meta(":FILETYPE", "FLAC")]);
        playlist.select_all();
        let converter = FakeConverter::succeeding();
        let ctx = context(&playlist, loaded(&backend), converter);

        let report = run_batch(&ctx, snapshot(&playlist), None);
        assert!(report.is_complete());

        let log = backend.log();
        let copied_from = &log.copies[0];
        assert_eq!(
            copied_from.file_name().and_then(|n| n.to_str()),
            Some("Artist - A.m4a")
        );
        // Temporary directory is gone once the track is on the device
        assert!(!copied_from.exists());
    }

    #[test]
    fn test_empty_selection_still_commits() {
        let backend = RecordingBackend::new();
        let playlist = playlist_of(&[native_track("A")]);
        let ctx = context(&playlist, loaded(&backend), FakeConverter::succeeding());

        let report = run_batch(&ctx, snapshot(&playlist), None);

        assert_eq!(report.selected, 0);
        assert_eq!(report.commit, CommitOutcome::Written);
        assert_eq!(backend.log().writes, 1);
    }

    #[test]
    fn test_no_database_skips_everything() {
        let backend = RecordingBackend::new();
        let playlist = playlist_of(&[native_track("A"), native_track("B")]);
        playlist.select_all();
        let device = Arc::new(DeviceManager::new(Arc::new(backend.clone()), "/media/IPOD"));
        let ctx = context(&playlist, device, FakeConverter::succeeding());

        let report = run_batch(&ctx, snapshot(&playlist), None);

        assert_eq!(report.commit, CommitOutcome::NoDatabase);
        assert_eq!(report.copied, 0);
        assert_eq!(backend.log().writes, 0);
        assert_eq!(playlist.refs_taken(), playlist.refs_released());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let backend = RecordingBackend::new();
        backend.log_mut().fail_write = true;
        let playlist = playlist_of(&[native_track("A")]);
        playlist.select_all();
        let ctx = context(&playlist, loaded(&backend), FakeConverter::succeeding());

        let report = run_batch(&ctx, snapshot(&playlist), None);

        assert!(matches!(report.commit, CommitOutcome::Failed(_)));
        // No rollback of in-memory records
        assert_eq!(backend.log().remaining, vec!["A"]);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_references_balanced_on_every_path() {
        for fail_at in [None, Some(0), Some(2)] {
            let backend = RecordingBackend::new();
            backend.log_mut().fail_copy_at = fail_at;
            let playlist =
                playlist_of(&[native_track("A"), native_track("B"), native_track("C")]);
            playlist.select_all();
            let ctx = context(&playlist, loaded(&backend), FakeConverter::succeeding());

            run_batch(&ctx, snapshot(&playlist), None);

            assert_eq!(playlist.refs_taken(), 3);
            assert_eq!(playlist.refs_released(), 3);
            assert!(!playlist.is_locked());
        }
    }

    #[test]
    fn test_artwork_reaches_record_and_converter() {
        let backend = RecordingBackend::new();
        let playlist = playlist_of(&[native_track("A").with_meta(":FILETYPE", "FLAC")]);
        playlist.select_all();
        let converter = Arc::new(FakeConverter::succeeding());
        let artwork = Arc::new(FixedArtwork::new(Some(PathBuf::from("/covers/a.jpg"))));

        let mut ctx = context(&playlist, loaded(&backend), FakeConverter::succeeding());
        ctx.converter = converter.clone();
        ctx.artwork = artwork.clone();

        run_batch(&ctx, snapshot(&playlist), None);

        assert_eq!(artwork.calls(), 1);
        assert_eq!(converter.last_artwork(), Some(PathBuf::from("/covers/a.jpg")));
        assert_eq!(
            backend.log().thumbnails,
            vec![Some(PathBuf::from("/covers/a.jpg"))]
        );
    }

    #[test]
    fn test_artwork_disabled() {
        let backend = RecordingBackend::new();
        let playlist = playlist_of(&[native_track("A")]);
        playlist.select_all();
        let artwork = Arc::new(FixedArtwork::new(Some(PathBuf::from("/covers/a.jpg"))));

        let mut ctx = context(&playlist, loaded(&backend), FakeConverter::succeeding());
        ctx.artwork = artwork.clone();
        ctx.settings.artwork = false;

        run_batch(&ctx, snapshot(&playlist), None);

        assert_eq!(artwork.calls(), 0);
        assert_eq!(backend.log().thumbnails, vec![None]);
    }

    #[test]
    fn test_events_in_order() {
        let backend = RecordingBackend::new();
        backend.log_mut().fail_copy_at = Some(1);
        let playlist = playlist_of(&[native_track("A"), native_track("B")]);
        playlist.select_all();
        let ctx = context(&playlist, loaded(&backend), FakeConverter::succeeding());
        let (tx, rx) = crossbeam_channel::unbounded();

        run_batch(&ctx, snapshot(&playlist), Some(&tx));

        let events: Vec<SyncEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], SyncEvent::BatchStarted { selected: 2 }));
        assert!(matches!(events[1], SyncEvent::TrackCopied { index: 0, .. }));
        assert!(matches!(events[2], SyncEvent::TrackFailed(TrackFailure { index: 1, .. })));
        assert!(matches!(events[3], SyncEvent::Committed { copied: 1 }));
        assert!(matches!(events[4], SyncEvent::BatchFinished(_)));
    }
}
