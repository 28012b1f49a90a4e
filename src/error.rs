//! Crate-wide error types.
//!
//! Library modules return [`Result`] with the [`Error`] enum below.
//! Subsystems with richer failure modes keep their own enum
//! ([`DeviceError`](crate::device::DeviceError),
//! [`ConfigError`](crate::config::ConfigError)) which converts into it.
//! The CLI uses `anyhow` on top.
//!
//! # Example
//!
//! ```ignore
//! use podsync::error::{Error, Result, ResultExt};
//!
//! fn stage(path: &Path) -> Result<()> {
//!     std::fs::metadata(path).with_context("while staging track")?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Device persistence engine error (parse, copy, write)
    #[error("Device error: {0}")]
    Device(#[from] crate::device::DeviceError),

    /// Tag reading error
    #[error("Metadata error for {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    /// The track has no `:URI` to copy from
    #[error("Track has no source URI")]
    MissingUri,

    /// The configured encoding preset does not exist
    #[error("Encoding preset not found: {0}")]
    PresetNotFound(String),

    /// The converter reported that conversion was cancelled
    #[error("Conversion cancelled for {0}")]
    ConversionCancelled(String),

    /// The converter reported a failure
    #[error("Conversion failed for {uri}: {message}")]
    ConversionFailed { uri: String, message: String },

    /// The sync worker is not running
    #[error("Sync worker is not running")]
    WorkerStopped,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a metadata error.
    pub fn metadata(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Metadata {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a conversion failure.
    pub fn conversion_failed(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConversionFailed {
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, crate::device::DeviceError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Device(e).context(ctx))
    }
}
