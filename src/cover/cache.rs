//! Cover art disk cache.
//!
//! Embedded pictures are written here so they can be handed out as file
//! paths. Keyed by artist and album, so every track of an album shares
//! one extracted image.

use std::fs;
use std::path::PathBuf;

use super::EmbeddedCover;
use crate::naming::sanitize_filename;

/// Extensions probed on lookup, in order
const CACHED_EXTENSIONS: &[&str] = &["jpg", "png", "gif", "bmp", "tiff"];

/// Cover art disk cache.
pub struct CoverCache {
    cache_dir: PathBuf,
}

impl CoverCache {
    /// Create a new cache in the specified directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        // Ensure cache directory exists
        let _ = fs::create_dir_all(&cache_dir);
        Self { cache_dir }
    }

    /// Cached cover for an artist/album, if present.
    pub fn get(&self, artist: &str, album: &str) -> Option<PathBuf> {
        let stem = Self::cache_key(artist, album);
        CACHED_EXTENSIONS
            .iter()
            .map(|ext| self.cache_dir.join(format!("{}.{}", stem, ext)))
            .find(|p| p.is_file())
    }

    /// Store an extracted cover and return its path.
    pub fn put(
        &self,
        artist: &str,
        album: &str,
        cover: &EmbeddedCover,
    ) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(&self.cache_dir)?;
        let path = self.cache_dir.join(format!(
            "{}.{}",
            Self::cache_key(artist, album),
            cover.extension
        ));
        fs::write(&path, &cover.data)?;
        Ok(path)
    }

    fn cache_key(artist: &str, album: &str) -> String {
        sanitize_filename(&format!("{} - {}", artist, album))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cover() -> EmbeddedCover {
        EmbeddedCover {
            data: b"fake png".to_vec(),
            extension: "png",
        }
    }

    #[test]
    fn test_put_then_get() {
        let temp = TempDir::new().unwrap();
        let cache = CoverCache::new(temp.path());

        let path = cache.put("AC/DC", "Back in Black", &cover()).unwrap();
        assert_eq!(path, temp.path().join("AC_DC - Back in Black.png"));
        assert_eq!(fs::read(&path).unwrap(), b"fake png");
        assert_eq!(cache.get("AC/DC", "Back in Black"), Some(path));
    }

    #[test]
    fn test_miss() {
        let temp = TempDir::new().unwrap();
        let cache = CoverCache::new(temp.path());
        assert_eq!(cache.get("Nobody", "Nothing"), None);
    }
}
