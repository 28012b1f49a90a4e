//! Reading tags from audio files into playlist entries.
//!
//! Uses the lofty crate for format-independent metadata access. Keys are
//! stored the way a player's playlist stores them, so the resolver sees
//! the same shape whether the host is a real player or a file list.

use lofty::config::ParseOptions;
use lofty::file::{AudioFile, FileType, TaggedFileExt};
use lofty::mp4::{Mp4Codec, Mp4File};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::fs::File;
use std::path::Path;

use crate::error::{Error, Result};
use crate::host::PlaylistEntry;

/// Read a file's tags and properties into an unselected playlist entry.
///
/// Sets `:URI` to the file path and `:FILETYPE` to the host-style codec
/// label (see [`filetype_label`]). MP4 files are labelled by the codec of
/// their audio track.
pub fn read_entry(path: &Path) -> Result<PlaylistEntry> {
    let tagged_file = Probe::open(path)
        .map_err(|e| Error::metadata(path, format!("Failed to open file for probing: {}", e)))?
        .read()
        .map_err(|e| Error::metadata(path, format!("Failed to read file metadata: {}", e)))?;

    let label = match tagged_file.file_type() {
        FileType::Mp4 => mp4_codec(path)
            .map(|codec| mp4_codec_label(&codec))
            .unwrap_or_else(|| filetype_label(&FileType::Mp4)),
        other => filetype_label(&other),
    };

    let mut entry = PlaylistEntry::new()
        .with_meta(":URI", path.to_string_lossy())
        .with_meta(":FILETYPE", label)
        .with_duration(tagged_file.properties().duration().as_secs_f64());

    // Get the primary tag, or fall back to the first available tag
    if let Some(tag) = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
    {
        copy_tag_fields(tag, &mut entry);
    }

    Ok(entry)
}

fn copy_tag_fields(tag: &Tag, entry: &mut PlaylistEntry) {
    let mut set = |key: &str, value: Option<String>| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            entry.meta.insert(key.to_string(), value);
        }
    };

    set("title", tag.title().map(|s| s.to_string()));
    set("artist", tag.artist().map(|s| s.to_string()));
    set("album", tag.album().map(|s| s.to_string()));
    set("comment", tag.comment().map(|s| s.to_string()));
    set("track", tag.track().map(|n| n.to_string()));
    set("disc", tag.disk().map(|n| n.to_string()));
    set(
        "album artist",
        tag.items()
            .find(|item| item.key() == &ItemKey::AlbumArtist)
            .and_then(|item| item.value().text())
            .map(|s| s.to_string()),
    );
}

fn mp4_codec(path: &Path) -> Option<Mp4Codec> {
    let mut file = File::open(path).ok()?;
    let options = ParseOptions::new().read_tags(false).read_cover_art(false);
    let mp4 = Mp4File::read_from(&mut file, options).ok()?;
    Some(*mp4.properties().codec())
}

/// Label of an MP4 file's audio codec. Codecs without a label of their
/// own come out as `MP4`, which the device never plays as is.
pub fn mp4_codec_label(codec: &Mp4Codec) -> String {
    match codec {
        Mp4Codec::AAC => "AAC".to_string(),
        Mp4Codec::ALAC => "ALAC".to_string(),
        Mp4Codec::FLAC => "FLAC".to_string(),
        _ => "MP4".to_string(),
    }
}

/// Codec label in the form player playlists report it.
///
/// Only `MP3` and `AAC` are played natively by the device. The MP4
/// container says nothing about its codec, see [`mp4_codec_label`].
pub fn filetype_label(file_type: &FileType) -> String {
    match file_type {
        FileType::Mpeg => "MP3".to_string(),
        FileType::Aac => "AAC".to_string(),
        FileType::Mp4 => "MP4".to_string(),
        FileType::Flac => "FLAC".to_string(),
        FileType::Vorbis => "OggVorbis".to_string(),
        FileType::Opus => "Opus".to_string(),
        FileType::Wav => "WAV".to_string(),
        FileType::Aiff => "AIFF".to_string(),
        FileType::WavPack => "WavPack".to_string(),
        FileType::Ape => "APE".to_string(),
        other => format!("{:?}", other),
    }
}
