//! Pathisync: keep local flow configuration in step with a remote server.
//!
//! # Usage
//!
//! ```text
//! pathisync sync [PATH] [--local] [--default-folder] [--delete] [--kind <KIND>]...
//! pathisync watch [--delete]
//! pathisync init <name> [--server-url <URL>] [--templates <DIR>]
//! ```
//!
//! `sync` and `watch` accept `--root`, `--token` and `--server-url`.

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{init::InitArgs, sync::SyncArgs, watch::WatchArgs};
use pathisync_core::EntityKind;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pathisync",
    version,
    about = "Synchronize local flow configuration files with a remote server",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare local files with the remote server and reconcile differences.
    Sync(SyncArgs),

    /// Push local edits to the server as files change.
    Watch(WatchArgs),

    /// Create a new project directory with its topic folders.
    Init(InitArgs),
}

// ---------------------------------------------------------------------------
// Shared kind argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse an [`EntityKind`] from its topic directory.
#[derive(Debug, Clone, Copy)]
pub struct KindArg(pub EntityKind);

impl FromStr for KindArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        EntityKind::from_topic(s)
            .or_else(|| {
                EntityKind::all()
                    .iter()
                    .copied()
                    .find(|kind| kind.label().replace(' ', "-") == s.to_ascii_lowercase())
            })
            .map(Self)
            .ok_or_else(|| {
                format!(
                    "unknown kind '{s}'; expected one of: flows, sharedConfigs, triggers, resources"
                )
            })
    }
}

impl fmt::Display for KindArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.topic_dir())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Watch(args) => args.run(),
        Commands::Init(args) => args.run(),
    }
}
