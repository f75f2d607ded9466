//! Command-line interface for aipsync.
//!
//! This module provides the CLI structure for the `aipsync` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AirportsCommand, ChartsCommand, CheckCommand, ConfigCommand, ListCategory, ListCommand,
    StatusCommand, SyncCommand,
};

/// aipsync - Keep a local copy of the aeronautical information publication
///
/// Downloads every category of the publication when a new cycle is out and
/// browses the stored charts offline.
#[derive(Debug, Parser)]
#[command(name = "aipsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the local copy: version, record counts and integrity
    Status(StatusCommand),

    /// Check whether a newer cycle is published
    Check(CheckCommand),

    /// Download the publication
    Sync(SyncCommand),

    /// List or search airports
    Airports(AirportsCommand),

    /// Show the charts of one airport
    Charts(ChartsCommand),

    /// List or search the documents of a category
    List(ListCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub const fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}
