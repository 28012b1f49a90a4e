//! Output file naming for transcoded tracks.
//!
//! Converted files are named from a metadata template such as
//! `{Artist} - {Title}`. Pattern variables: `{Artist}`, `{AlbumArtist}`,
//! `{Album}`, `{Title}`, `{TrackNum}`. Substituted values are sanitized so
//! a template always yields a single path component.

use crate::metadata::ResolvedMetadata;

/// Template used when none is configured.
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "{Artist} - {Title}";

/// Expand a template against resolved metadata.
pub fn render_template(template: &str, metadata: &ResolvedMetadata) -> String {
    // Format track number with zero padding
    let track_num = format!("{:02}", metadata.track_number.max(0));

    // {AlbumArtist} goes first so {Artist} can't eat part of it
    template
        .replace("{AlbumArtist}", &sanitize_filename(&metadata.album_artist))
        .replace("{Artist}", &sanitize_filename(&metadata.artist))
        .replace("{Album}", &sanitize_filename(&metadata.album))
        .replace("{Title}", &sanitize_filename(&metadata.title))
        .replace("{TrackNum}", &track_num)
}

/// File name for a converted track: rendered template plus extension.
pub fn output_file_name(template: &str, metadata: &ResolvedMetadata, extension: &str) -> String {
    let stem = sanitize_filename(&render_template(template, metadata));
    let stem = if stem.trim().is_empty() {
        "track".to_string()
    } else {
        stem
    };
    format!("{}.{}", stem, extension.trim_start_matches('.'))
}

/// Sanitizes a filename by removing/replacing invalid characters
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn sample_metadata() -> ResolvedMetadata {
    ResolvedMetadata {
        title: "Song Title".to_string(),
        artist: "Test Artist".to_string(),
        album: "Test Album".to_string(),
        album_artist: "Various".to_string(),
        track_number: 5,
        disc_number: 1,
        comment: String::new(),
        duration_ms: 180_000,
    }
}
