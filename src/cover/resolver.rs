//! Local artwork provider.
//!
//! Resolves cover art from files on disk with this priority:
//! 1. Sidecar files in the track's directory
//! 2. Disk cache (covers extracted before for the same artist/album)
//! 3. Embedded in file tags, extracted into the cache
//!
//! Remote fetching is not attempted.

use std::path::{Path, PathBuf};

use super::cache::CoverCache;
use super::embedded::extract_embedded_cover;
use super::sidecar::find_sidecar_cover;
use super::{ArtSize, ArtworkProvider};

/// [`ArtworkProvider`] backed by the local filesystem.
pub struct LocalArtwork {
    cache: CoverCache,
}

impl LocalArtwork {
    /// Create a provider caching extracted covers in `cache_dir`.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache: CoverCache::new(cache_dir),
        }
    }
}

impl ArtworkProvider for LocalArtwork {
    fn cover_path(&self, uri: &str, artist: &str, album: &str, size: ArtSize) -> Option<PathBuf> {
        // Images are always returned unscaled; the device engine does its own scaling
        if size != ArtSize::Native {
            tracing::trace!("Ignoring requested art size {:?}", size);
        }

        let audio_path = Path::new(uri);

        // Priority 1: Sidecar file
        if let Some(path) = find_sidecar_cover(audio_path) {
            return Some(path);
        }

        // Priority 2: Previously extracted
        if let Some(path) = self.cache.get(artist, album) {
            return Some(path);
        }

        // Priority 3: Embedded in tags
        let cover = extract_embedded_cover(audio_path)?;
        match self.cache.put(artist, album, &cover) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Failed to cache embedded cover for {}: {}", uri, e);
                None
            }
        }
    }
}
