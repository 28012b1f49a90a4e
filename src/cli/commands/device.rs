//! Device inspection and setup commands.

use std::path::Path;

use crate::config::Config;
use crate::device::fs::{FsDatabase, init_device};
use crate::device::DeviceDatabase;

/// List the tracks on a device
pub fn cmd_list(config: &Config, mountpoint: Option<&Path>) -> anyhow::Result<()> {
    let mountpoint = mountpoint.unwrap_or(config.device.mountpoint.as_path());
    let db = FsDatabase::open(mountpoint)?;

    println!(
        "{} ({} tracks)",
        db.name().unwrap_or("Unnamed device"),
        db.track_count()
    );
    if let Some(last_synced) = db.last_synced() {
        println!("Last synced: {}", last_synced);
    }
    println!();

    for (id, track) in db.tracks() {
        let seconds = track.tracklen / 1000;
        println!(
            "{:>5}  {} - {} [{}] {}:{:02}",
            id,
            track.artist,
            track.title,
            track.album,
            seconds / 60,
            seconds % 60
        );
    }
    Ok(())
}

/// Create the device layout at a mount point
pub fn cmd_init(mountpoint: &Path, name: Option<&str>) -> anyhow::Result<()> {
    init_device(mountpoint, name)?;
    println!("Initialized device at {}", mountpoint.display());
    Ok(())
}
