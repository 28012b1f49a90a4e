//! Host-facing plugin facade.
//!
//! Ties the pieces to the host's plugin lifecycle:
//! - `start` loads the device database and starts the sync worker
//! - `actions` advertises the single "Copy to iPod" playlist action
//! - `copy_selected` is that action's callback
//! - `stop` finishes queued batches and releases the database

use bitflags::bitflags;
use crossbeam_channel::Sender;
use std::sync::Arc;

use crate::config::Config;
use crate::convert::{ConversionSettings, FfmpegConverter};
use crate::cover::{ArtworkProvider, LocalArtwork, NoArtwork};
use crate::device::{DeviceManager, FsDevice};
use crate::error::{Error, Result};
use crate::host::PlaylistHost;
use crate::sync::{BatchTicket, SyncContext, SyncEvent, SyncSettings, SyncWorker};

/// Title of the playlist action.
pub const ACTION_TITLE: &str = "Copy to iPod";

bitflags! {
    /// Where a playlist action is offered.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ActionFlags: u32 {
        /// Offered when exactly one track is selected
        const SINGLE_TRACK = 1 << 0;
        /// Offered when several tracks are selected
        const MULTIPLE_TRACKS = 1 << 1;
    }
}

/// A playlist action exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginAction {
    pub title: &'static str,
    pub flags: ActionFlags,
}

/// The plugin instance a host loads.
pub struct PodSyncPlugin {
    context: Arc<SyncContext>,
    events: Option<Sender<SyncEvent>>,
    worker: Option<SyncWorker>,
}

impl PodSyncPlugin {
    pub fn new(context: SyncContext) -> Self {
        Self {
            context: Arc::new(context),
            events: None,
            worker: None,
        }
    }

    /// Wire up the reference collaborators from configuration.
    pub fn from_config(host: Arc<dyn PlaylistHost>, config: &Config) -> Self {
        let converter = FfmpegConverter::new(
            config.conversion.ffmpeg_path.clone(),
            config.conversion.presets.clone(),
        );

        let artwork: Arc<dyn ArtworkProvider> = if config.artwork.enabled {
            Arc::new(LocalArtwork::with_cache_dir(config.artwork.cache_dir()))
        } else {
            Arc::new(NoArtwork)
        };

        Self::new(SyncContext {
            host,
            device: Arc::new(DeviceManager::new(
                Arc::new(FsDevice),
                &config.device.mountpoint,
            )),
            converter: Arc::new(converter),
            artwork,
            settings: SyncSettings {
                conversion: ConversionSettings {
                    preset: config.conversion.preset.clone(),
                    output_template: config.conversion.output_template.clone(),
                },
                artwork: config.artwork.enabled,
            },
        })
    }

    /// Forward progress events of every batch to `events`.
    ///
    /// Takes effect on the next `start`.
    pub fn with_events(mut self, events: Sender<SyncEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Load the device database and start the worker.
    ///
    /// A database that fails to load is logged and left unloaded; batches
    /// then do nothing. Starting twice is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        if let Err(e) = self.context.device.load() {
            tracing::warn!("Device not available, copies will be skipped: {}", e);
        }

        self.worker = Some(SyncWorker::spawn(
            Arc::clone(&self.context),
            self.events.clone(),
        )?);
        tracing::info!("podsync started");
        Ok(())
    }

    /// Finish queued batches, stop the worker and free the database.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            drop(worker);
            self.context.device.free();
            tracing::info!("podsync stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Playlist actions offered to the host.
    pub fn actions(&self) -> Vec<PluginAction> {
        vec![PluginAction {
            title: ACTION_TITLE,
            flags: ActionFlags::SINGLE_TRACK | ActionFlags::MULTIPLE_TRACKS,
        }]
    }

    /// "Copy to iPod": snapshot the selection and queue a batch.
    ///
    /// Returns as soon as the batch is queued.
    pub fn copy_selected(&self) -> Result<BatchTicket> {
        self.worker
            .as_ref()
            .ok_or(Error::WorkerStopped)?
            .submit()
    }

    pub fn device(&self) -> &DeviceManager {
        &self.context.device
    }
}

impl Drop for PodSyncPlugin {
    fn drop(&mut self) {
        self.stop();
    }
}
