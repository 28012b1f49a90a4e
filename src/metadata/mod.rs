//! Metadata resolution for playlist tracks.
//!
//! Normalises whatever the host has for a track into the fixed set of
//! fields the device schema stores. Missing strings become [`UNKNOWN`],
//! missing numbers become 0.
//!
//! # Album artist
//!
//! Tagging formats disagree on where the album artist lives, so it is
//! resolved through a fallback chain: `band` → `album artist` →
//! `albumartist` → `artist`. The chain stops at the first non-empty value.

pub mod tags;

use crate::host::TrackHandle;

/// Placeholder for absent string metadata.
pub const UNKNOWN: &str = "?";

/// Album-artist lookup order.
pub const ALBUM_ARTIST_KEYS: [&str; 4] = ["band", "album artist", "albumartist", "artist"];

/// Device-relevant metadata for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub track_number: i32,
    pub disc_number: i32,
    pub comment: String,
    pub duration_ms: u32,
}

impl ResolvedMetadata {
    /// Read everything from the host in one pass.
    pub fn resolve(track: &TrackHandle) -> Self {
        Self {
            title: meta_str(track, "title"),
            artist: meta_str(track, "artist"),
            album: meta_str(track, "album"),
            album_artist: album_artist(track),
            track_number: meta_int(track, "track"),
            disc_number: meta_int(track, "disc"),
            comment: meta_str(track, "comment"),
            duration_ms: duration_ms(track.duration_secs()),
        }
    }
}

/// String metadata, or [`UNKNOWN`] when the key is absent.
pub fn meta_str(track: &TrackHandle, key: &str) -> String {
    track.meta(key).unwrap_or_else(|| UNKNOWN.to_string())
}

/// Integer metadata, or 0 when absent or unparsable.
pub fn meta_int(track: &TrackHandle, key: &str) -> i32 {
    track.meta(key).map(|v| parse_leading_int(&v)).unwrap_or(0)
}

/// Album artist through the fallback chain.
pub fn album_artist(track: &TrackHandle) -> String {
    resolve_album_artist(|key| track.meta(key))
}

/// Fallback chain over an arbitrary lookup. Lazy: stops at the first hit.
pub fn resolve_album_artist(mut lookup: impl FnMut(&str) -> Option<String>) -> String {
    ALBUM_ARTIST_KEYS
        .iter()
        .find_map(|key| lookup(key).filter(|v| !v.is_empty()))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Parse the leading integer of a tag value the way the host does.
///
/// Leading whitespace and an optional sign are accepted, then digits up to
/// the first non-digit: `"3/12"` is 3, `"CD2"` is 0. Saturates on overflow.
pub fn parse_leading_int(value: &str) -> i32 {
    let s = value.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut n: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        n = (n * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    let n = if negative { -n } else { n };
    n.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Seconds to whole milliseconds, truncating.
///
/// Unknown (negative) or non-finite durations map to 0.
pub fn duration_ms(seconds: f64) -> u32 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0) as u32
}
