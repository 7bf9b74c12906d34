use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tapedeck::Mode;

/// Record, replay and share snapshots of backend responses
#[derive(Parser, Debug)]
#[command(name = "tapedeck", version, about)]
pub struct Cli {
    /// Data directory (defaults to ~/.tapedeck)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Show mode, store location and module completeness
    Status,
    /// Print the current mode, or change it
    Mode {
        #[command(subcommand)]
        action: Option<ModeAction>,
    },
    /// Run bytes through capture/serve and write the result to stdout
    Capture {
        identifier: String,
        /// Read bytes from a file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Pack a directory into an archive
    Pack { dir: PathBuf, out: PathBuf },
    /// Unpack an archive into a directory
    Unpack {
        archive: PathBuf,
        dest: PathBuf,
        /// Fail on entries that cannot be restored instead of skipping them
        #[arg(long)]
        strict: bool,
    },
    /// Manage remote snapshots of the store
    Snapshots {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModeAction {
    /// Switch to and persist a new mode (disabled, recording, replaying)
    Set { mode: Mode },
}

#[derive(Subcommand, Debug)]
pub enum SnapshotAction {
    /// List remote snapshots, newest first
    List,
    /// Upload the whole store
    Upload,
    /// Replace the store with a remote snapshot
    Download { name: String },
    /// Delete a remote snapshot
    Remove { name: String },
}
