//! Format classification and the converter bridge.
//!
//! The device plays MP3 and AAC natively. Everything else is transcoded
//! with a named [`EncoderPreset`] into a fresh temporary directory before
//! it is copied over. The temporary directory lives as long as the
//! returned [`SourceFile`] and is removed when it is dropped.

mod ffmpeg;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub use ffmpeg::FfmpegConverter;

use crate::error::{Error, Result, ResultExt};
use crate::host::TrackHandle;
use crate::metadata::ResolvedMetadata;
use crate::naming;

/// File types the device accepts without conversion.
pub const NATIVE_FILETYPES: [&str; 2] = ["MP3", "AAC"];

/// Whether a track with this host file type has to be transcoded.
///
/// Exact, case-sensitive match against [`NATIVE_FILETYPES`]; an absent
/// type always needs conversion.
pub fn needs_conversion(filetype: Option<&str>) -> bool {
    !matches!(filetype, Some(ft) if NATIVE_FILETYPES.contains(&ft))
}

/// A named transcoding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderPreset {
    /// Title used for lookup
    pub title: String,
    /// Output file extension
    pub extension: String,
    /// Encoder arguments
    #[serde(default)]
    pub args: Vec<String>,
}

impl EncoderPreset {
    pub fn new(title: &str, extension: &str, args: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            extension: extension.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Everything the converter needs for one track.
///
/// No DSP stage is applied between decoding and encoding.
#[derive(Debug, Clone, Copy)]
pub struct ConvertRequest<'a> {
    pub source: &'a Path,
    pub metadata: &'a ResolvedMetadata,
    pub output_dir: &'a Path,
    pub template: &'a str,
    pub preset: &'a EncoderPreset,
    /// Cover image to embed into the output
    pub artwork: Option<&'a Path>,
}

/// What the converter reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Converted(PathBuf),
    Cancelled,
    Failed(String),
}

/// Transcoder seam.
pub trait Converter: Send + Sync {
    /// All known presets.
    fn presets(&self) -> &[EncoderPreset];

    /// Preset by exact title.
    fn find_preset(&self, title: &str) -> Option<&EncoderPreset> {
        self.presets().iter().find(|p| p.title == title)
    }

    /// Where a request's output will be written.
    fn output_path(&self, request: &ConvertRequest<'_>) -> PathBuf {
        request.output_dir.join(naming::output_file_name(
            request.template,
            request.metadata,
            &request.preset.extension,
        ))
    }

    /// Run the conversion. Blocks until the encoder finishes.
    fn convert(&self, request: &ConvertRequest<'_>) -> ConversionOutcome;
}

/// Settings the bridge needs from configuration.
#[derive(Debug, Clone)]
pub struct ConversionSettings {
    /// Preset title used for non-native tracks
    pub preset: String,
    /// Output name template
    pub output_template: String,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            preset: crate::config::DEFAULT_PRESET.to_string(),
            output_template: naming::DEFAULT_OUTPUT_TEMPLATE.to_string(),
        }
    }
}

/// A file ready to be copied to the device.
#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    /// Conversion workspace, removed on drop
    workdir: Option<TempDir>,
}

impl SourceFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn was_converted(&self) -> bool {
        self.workdir.is_some()
    }
}

/// Produce a device-ready file for a track, converting when needed.
pub fn prepare_source(
    track: &TrackHandle,
    metadata: &ResolvedMetadata,
    converter: &dyn Converter,
    settings: &ConversionSettings,
    artwork: Option<&Path>,
) -> Result<SourceFile> {
    let uri = track.meta(":URI").ok_or(Error::MissingUri)?;
    let filetype = track.meta(":FILETYPE");

    if !needs_conversion(filetype.as_deref()) {
        return Ok(SourceFile {
            path: PathBuf::from(uri),
            workdir: None,
        });
    }

    tracing::debug!(
        target: "podsync::convert",
        "{} is {}, converting with preset {:?}",
        uri,
        filetype.as_deref().unwrap_or("untyped"),
        settings.preset
    );

    let preset = converter
        .find_preset(&settings.preset)
        .ok_or_else(|| Error::PresetNotFound(settings.preset.clone()))?;

    let workdir = tempfile::Builder::new()
        .prefix("podsync-")
        .tempdir()
        .with_context("Failed to create conversion directory")?;

    let request = ConvertRequest {
        source: Path::new(&uri),
        metadata,
        output_dir: workdir.path(),
        template: &settings.output_template,
        preset,
        artwork,
    };

    match converter.convert(&request) {
        ConversionOutcome::Converted(path) => {
            tracing::debug!(target: "podsync::convert", "Converted {} -> {:?}", uri, path);
            Ok(SourceFile {
                path,
                workdir: Some(workdir),
            })
        }
        ConversionOutcome::Cancelled => Err(Error::ConversionCancelled(uri)),
        ConversionOutcome::Failed(message) => Err(Error::conversion_failed(uri, message)),
    }
}
