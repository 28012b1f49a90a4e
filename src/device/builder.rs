//! Mapping resolved metadata onto device records.

use std::path::PathBuf;

use super::DeviceTrack;
use crate::metadata::ResolvedMetadata;

/// Build a device record from resolved metadata.
///
/// Pure data mapping. The album artist is the resolver's fallback-aware
/// value. `thumbnail` is set only when artwork was found.
pub fn build_track(metadata: &ResolvedMetadata, artwork: Option<PathBuf>) -> DeviceTrack {
    DeviceTrack {
        title: metadata.title.clone(),
        artist: metadata.artist.clone(),
        album: metadata.album.clone(),
        album_artist: metadata.album_artist.clone(),
        track_nr: metadata.track_number,
        cd_nr: metadata.disc_number,
        comment: metadata.comment.clone(),
        tracklen: metadata.duration_ms,
        thumbnail: artwork,
        ..Default::default()
    }
}
