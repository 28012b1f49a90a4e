//! Artwork lookup for device thumbnails.
//!
//! The sync core only needs a path to an image file for a track. The
//! local provider resolves it with this priority:
//!
//! 1. **Sidecar files** - folder.jpg, cover.png, etc. next to the audio file
//! 2. **Disk cache** - covers extracted earlier for the same artist/album
//! 3. **Embedded tags** - picture extracted from the file into the cache
//!
//! Missing art is not an error: providers return `None` and the track is
//! copied without a thumbnail.

mod cache;
mod embedded;
mod resolver;
mod sidecar;

use std::path::PathBuf;

pub use cache::CoverCache;
pub use embedded::{EmbeddedCover, extract_embedded_cover};
pub use resolver::LocalArtwork;
pub use sidecar::find_sidecar_cover;

/// Requested image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtSize {
    /// Unscaled, as stored
    #[default]
    Native,
    /// Square edge length in pixels
    Square(u32),
}

/// Artwork lookup seam.
pub trait ArtworkProvider: Send + Sync {
    /// Path of a cover image for the track at `uri`, if one can be found.
    ///
    /// Synchronous: may extract or fetch before returning.
    fn cover_path(&self, uri: &str, artist: &str, album: &str, size: ArtSize) -> Option<PathBuf>;
}

/// Provider that never finds artwork.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoArtwork;

impl ArtworkProvider for NoArtwork {
    fn cover_path(&self, _uri: &str, _artist: &str, _album: &str, _size: ArtSize) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_artwork() {
        assert_eq!(
            NoArtwork.cover_path("/music/a.mp3", "Artist", "Album", ArtSize::Native),
            None
        );
    }

    #[test]
    fn test_default_size_is_native() {
        assert_eq!(ArtSize::default(), ArtSize::Native);
    }
}
