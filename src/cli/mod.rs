//! Command-line interface for podsync.
//!
//! Drives the same batch a host player triggers, with a playlist built
//! from files on disk, plus a few device housekeeping commands.

mod commands;

pub use commands::{Cli, Commands, run_command};
