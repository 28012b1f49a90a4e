//! Transcoding by shelling out to the `ffmpeg` command-line tool.
//!
//! Install ffmpeg:
//! - Windows: `winget install Gyan.FFmpeg`
//! - macOS: `brew install ffmpeg`
//! - Linux: `apt install ffmpeg` or equivalent

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{ConversionOutcome, ConvertRequest, Converter, EncoderPreset};

#[cfg(windows)]
const FFMPEG_PATHS: &[&str] = &[
    "ffmpeg", // In PATH
    r"C:\Program Files\ffmpeg\bin\ffmpeg.exe",
    r"C:\ffmpeg\bin\ffmpeg.exe",
];

#[cfg(not(windows))]
const FFMPEG_PATHS: &[&str] = &[
    "ffmpeg", // In PATH
    "/usr/bin/ffmpeg",
    "/usr/local/bin/ffmpeg",
    "/opt/homebrew/bin/ffmpeg",
];

/// Find the ffmpeg executable, checking common installation paths
fn find_ffmpeg() -> Option<PathBuf> {
    FFMPEG_PATHS
        .iter()
        .find(|&path| {
            Command::new(path)
                .arg("-version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
        .map(PathBuf::from)
}

/// ffmpeg-backed [`Converter`].
pub struct FfmpegConverter {
    binary: Option<PathBuf>,
    presets: Vec<EncoderPreset>,
}

impl FfmpegConverter {
    /// Create a converter. An explicit binary wins over the search paths.
    pub fn new(binary: Option<PathBuf>, presets: Vec<EncoderPreset>) -> Self {
        let binary = binary.or_else(find_ffmpeg);
        if binary.is_none() {
            tracing::warn!(target: "podsync::convert", "ffmpeg not found, conversions will fail");
        }
        Self { binary, presets }
    }

    /// Whether an ffmpeg binary is available.
    pub fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    /// Command-line arguments for a request.
    ///
    /// Only the audio of the source is kept; an artwork image, when given,
    /// is attached as the cover picture.
    fn build_args(request: &ConvertRequest<'_>, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            request.source.into(),
        ];

        match request.artwork {
            Some(cover) => {
                args.extend([
                    "-i".into(),
                    cover.into(),
                    "-map".into(),
                    "0:a".into(),
                    "-map".into(),
                    "1:v".into(),
                    "-c:v".into(),
                    "mjpeg".into(),
                    "-disposition:v:0".into(),
                    "attached_pic".into(),
                ]);
            }
            None => args.extend(["-map".into(), "0:a".into()]),
        }

        args.extend(request.preset.args.iter().map(OsString::from));
        args.push(output.into());
        args
    }
}

impl Converter for FfmpegConverter {
    fn presets(&self) -> &[EncoderPreset] {
        &self.presets
    }

    fn convert(&self, request: &ConvertRequest<'_>) -> ConversionOutcome {
        let Some(binary) = &self.binary else {
            return ConversionOutcome::Failed(
                "ffmpeg not found. Please install ffmpeg: https://ffmpeg.org/download.html"
                    .to_string(),
            );
        };

        let output = self.output_path(request);
        tracing::info!(
            target: "podsync::convert",
            "Converting {:?} with preset {:?}",
            request.source,
            request.preset.title
        );

        let result = Command::new(binary)
            .args(Self::build_args(request, &output))
            .output();

        match result {
            Ok(out) if out.status.success() && output.exists() => {
                ConversionOutcome::Converted(output)
            }
            Ok(out) if out.status.success() => {
                ConversionOutcome::Failed(format!("ffmpeg produced no output at {:?}", output))
            }
            // Terminated by a signal rather than exiting
            Ok(out) if out.status.code().is_none() => ConversionOutcome::Cancelled,
            Ok(out) => ConversionOutcome::Failed(
                String::from_utf8_lossy(&out.stderr).trim().to_string(),
            ),
            Err(e) => ConversionOutcome::Failed(format!("Failed to run ffmpeg: {}", e)),
        }
    }
}
