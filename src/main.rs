//! podsync - command-line front end.
//!
//! Builds a playlist from files on disk, selects all of it and runs the
//! same "Copy to iPod" batch a host player would trigger.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = podsync::cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive(podsync::DEFAULT_LOG_FILTER.parse()?))
        .init();

    podsync::cli::run_command(&args)
}
