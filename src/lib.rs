//! podsync - copy playlist selections onto an iPod-style device.
//!
//! The crate is organised around one batch operation: snapshot the host
//! player's current selection, map every selected track onto the device
//! schema, transcode anything the device cannot play, copy the bytes over
//! and commit the device database once at the end.
//!
//! All external collaborators sit behind traits so hosts (and tests) can
//! inject their own:
//! - [`host::PlaylistHost`] - playlist selection and metadata provider
//! - [`device::DeviceBackend`] / [`device::DeviceDatabase`] - persistence engine
//! - [`convert::Converter`] - transcoder
//! - [`cover::ArtworkProvider`] - artwork lookup

pub mod cli;
pub mod config;
pub mod convert;
pub mod cover;
pub mod device;
pub mod error;
pub mod host;
pub mod metadata;
pub mod naming;
pub mod plugin;
pub mod sync;
#[cfg(test)]
pub mod test_utils;

pub use error::{Error, Result};

/// Default `EnvFilter` directive of the binary. Every log target in the
/// crate lives under `podsync::`.
pub const DEFAULT_LOG_FILTER: &str = "podsync=info";
