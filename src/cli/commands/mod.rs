//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `copy`: copy audio files onto the device
//! - `device`: list and initialize devices
//! - `settings`: presets and the config file

mod copy;
mod device;
mod settings;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use copy::cmd_copy;
pub use device::{cmd_init, cmd_list};
pub use settings::{cmd_config, cmd_presets};

/// podsync CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Copy audio files onto the device
    Copy {
        /// Files or directories to copy
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Recurse into directories
        #[arg(short, long)]
        recursive: bool,
        /// Device mount point (overrides config)
        #[arg(short, long, env = "PODSYNC_MOUNTPOINT")]
        mountpoint: Option<PathBuf>,
        /// Encoding preset for files the device can't play (overrides config)
        #[arg(short, long)]
        preset: Option<String>,
        /// Don't look up or transfer artwork
        #[arg(long)]
        no_artwork: bool,
    },
    /// List tracks on the device in master playlist order
    List {
        /// Device mount point (overrides config)
        #[arg(short, long, env = "PODSYNC_MOUNTPOINT")]
        mountpoint: Option<PathBuf>,
    },
    /// Prepare an empty directory as a device
    Init {
        /// Directory to initialize
        mountpoint: PathBuf,
        /// Device name
        #[arg(long)]
        name: Option<String>,
    },
    /// List available encoding presets
    Presets,
    /// Show the configuration file location and effective settings
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = crate::config::load();

    match &cli.command {
        Commands::Copy {
            paths,
            recursive,
            mountpoint,
            preset,
            no_artwork,
        } => cmd_copy(
            config,
            paths,
            *recursive,
            mountpoint.as_deref(),
            preset.as_deref(),
            *no_artwork,
        ),
        Commands::List { mountpoint } => cmd_list(&config, mountpoint.as_deref()),
        Commands::Init { mountpoint, name } => cmd_init(mountpoint, name.as_deref()),
        Commands::Presets => cmd_presets(&config),
        Commands::Config { init } => cmd_config(&config, *init),
    }
}
