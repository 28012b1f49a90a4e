//! Extract cover art embedded in audio file tags.
//!
//! Uses lofty to read picture data from:
//! - ID3v2 tags (MP3)
//! - Vorbis comments (FLAC, OGG)
//! - MP4 atoms (M4A/AAC)

use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, PictureType};
use lofty::probe::Probe;
use std::path::Path;

/// Raw picture pulled out of a file's tags.
#[derive(Debug, Clone)]
pub struct EmbeddedCover {
    pub data: Vec<u8>,
    /// File extension matching the picture format
    pub extension: &'static str,
}

/// Front cover from the file's tags, or the first picture when no front
/// cover is marked. `None` for untagged or unreadable files.
pub fn extract_embedded_cover(path: &Path) -> Option<EmbeddedCover> {
    let tagged_file = Probe::open(path).ok()?.read().ok()?;

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())?;

    // Prefer front cover, fall back to first picture
    let pictures = tag.pictures();
    let picture = pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())?;

    let extension = match picture.mime_type() {
        Some(MimeType::Png) => "png",
        Some(MimeType::Gif) => "gif",
        Some(MimeType::Bmp) => "bmp",
        Some(MimeType::Tiff) => "tiff",
        _ => "jpg", // Default assumption
    };

    Some(EmbeddedCover {
        data: picture.data().to_vec(),
        extension,
    })
}
