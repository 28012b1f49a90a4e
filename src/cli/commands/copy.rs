//! Copying files onto the device.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::Config;
use crate::host::{LocalPlaylist, PlaylistHost};
use crate::plugin::PodSyncPlugin;
use crate::sync::{CommitOutcome, SyncEvent};

/// Extensions picked up when scanning directories (lowercase)
const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "flac", "ogg", "opus", "wav", "aiff", "aif", "wv", "ape",
];

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand the given paths into audio files, in a stable order.
///
/// Files are taken as given; directories are scanned one level deep, or
/// fully with `recursive`.
pub fn collect_audio_files(paths: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_audio_file(e.path()))
            .map(|e| e.into_path())
            .collect();
        found.sort();
        files.extend(found);
    }

    files
}

/// Copy files to the device through a regular batch
pub fn cmd_copy(
    mut config: Config,
    paths: &[PathBuf],
    recursive: bool,
    mountpoint: Option<&Path>,
    preset: Option<&str>,
    no_artwork: bool,
) -> anyhow::Result<()> {
    if let Some(mountpoint) = mountpoint {
        config.device.mountpoint = mountpoint.to_path_buf();
    }
    if let Some(preset) = preset {
        config.conversion.preset = preset.to_string();
    }
    if no_artwork {
        config.artwork.enabled = false;
    }

    let files = collect_audio_files(paths, recursive);
    if files.is_empty() {
        anyhow::bail!("No audio files found");
    }
    println!("Found {} audio files", files.len());

    let playlist = Arc::new(LocalPlaylist::from_files(files));
    playlist.select_all();
    let host: Arc<dyn PlaylistHost> = playlist.clone();

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut plugin = PodSyncPlugin::from_config(host, &config).with_events(tx);
    plugin.start()?;

    if !plugin.device().is_loaded() {
        anyhow::bail!(
            "No device database at {} (run `podsync init` to prepare one)",
            config.device.mountpoint.display()
        );
    }

    let ticket = plugin.copy_selected()?;

    // Print progress while the worker runs; the channel closes with the plugin
    let report = loop {
        match rx.recv() {
            Ok(SyncEvent::TrackCopied { index, title, .. }) => {
                println!("  [{}/{}] {}", index + 1, playlist.len(), title);
            }
            Ok(SyncEvent::TrackFailed(failure)) => {
                eprintln!("  [{}] failed: {}", failure.index + 1, failure.message);
            }
            Ok(SyncEvent::BatchFinished(report)) => break report,
            Ok(_) => {}
            Err(_) => break ticket.wait()?,
        }
    };

    plugin.stop();

    println!(
        "\nCopied {} of {} tracks",
        report.copied, report.selected
    );
    match report.commit {
        CommitOutcome::Written => println!("Device database written"),
        CommitOutcome::Failed(message) => {
            anyhow::bail!("Failed to write device database: {}", message)
        }
        CommitOutcome::NoDatabase => anyhow::bail!("No device database loaded"),
    }

    if let Some(failure) = report.failure {
        anyhow::bail!("Stopped at track {}: {}", failure.index + 1, failure.message);
    }
    Ok(())
}
