//! Detect sidecar cover art files in the same directory as audio files.
//!
//! Common sidecar filenames:
//! - cover.jpg, cover.png
//! - folder.jpg, folder.png
//! - album.jpg, album.png
//! - front.jpg, front.png
//! - artwork.jpg, artwork.png

use std::path::{Path, PathBuf};

/// Common cover art filenames (lowercase for matching)
const COVER_FILENAMES: &[&str] = &[
    "cover",
    "folder",
    "album",
    "front",
    "artwork",
    "albumart",
    "albumartsmall",
];

/// Image extensions the device thumbnailer can decode
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Find a sidecar cover art file in the same directory as the audio file.
///
/// Returns None if no cover art is found.
pub fn find_sidecar_cover(audio_path: &Path) -> Option<PathBuf> {
    let parent = audio_path.parent()?;

    // Try each known cover filename
    for name in COVER_FILENAMES {
        for ext in IMAGE_EXTENSIONS {
            let cover_path = parent.join(format!("{}.{}", name, ext));
            if cover_path.is_file() {
                return Some(cover_path);
            }
        }
    }

    // Also check for case variations on case-sensitive filesystems
    let entries = std::fs::read_dir(parent).ok()?;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let file_stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        if let (Some(stem), Some(ext)) = (file_stem, extension)
            && COVER_FILENAMES.contains(&stem.as_str())
            && IMAGE_EXTENSIONS.contains(&ext.as_str())
        {
            return Some(path);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_cover_jpg() {
        let temp = TempDir::new().unwrap();
        let audio = temp.path().join("track.flac");
        std::fs::write(&audio, b"audio").unwrap();
        std::fs::write(temp.path().join("cover.jpg"), b"jpeg").unwrap();

        assert_eq!(find_sidecar_cover(&audio), Some(temp.path().join("cover.jpg")));
    }

    #[test]
    fn test_priority_order() {
        let temp = TempDir::new().unwrap();
        let audio = temp.path().join("track.flac");
        std::fs::write(&audio, b"audio").unwrap();
        std::fs::write(temp.path().join("front.png"), b"png").unwrap();
        std::fs::write(temp.path().join("folder.jpg"), b"jpeg").unwrap();

        // folder comes before front
        assert_eq!(find_sidecar_cover(&audio), Some(temp.path().join("folder.jpg")));
    }

    #[test]
    fn test_case_insensitive_match() {
        let temp = TempDir::new().unwrap();
        let audio = temp.path().join("track.flac");
        std::fs::write(&audio, b"audio").unwrap();
        std::fs::write(temp.path().join("Folder.JPG"), b"jpeg").unwrap();

        let found = find_sidecar_cover(&audio).unwrap();
        assert_eq!(
            found.file_name().and_then(|n| n.to_str()).map(str::to_lowercase),
            Some("folder.jpg".to_string())
        );
    }

    #[test]
    fn test_no_cover() {
        let temp = TempDir::new().unwrap();
        let audio = temp.path().join("track.flac");
        std::fs::write(&audio, b"audio").unwrap();
        std::fs::write(temp.path().join("notes.txt"), b"text").unwrap();

        assert_eq!(find_sidecar_cover(&audio), None);
    }
}
