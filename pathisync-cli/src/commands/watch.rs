//! `pathisync watch`: push local edits as they happen.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;

use pathisync_core::SyncFlags;
use pathisync_sync::{pipeline, HttpRemote, Session, Transport};

use super::prompter::TerminalPrompter;
use super::{init_tracing, ConnectionArgs};

/// Arguments for `pathisync watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Offer delete actions in prompts.
    #[arg(long, short = 'd')]
    pub delete: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        init_tracing("info");

        let root = self.connection.project_root()?;
        let settings = self.connection.settings(&root)?;
        let remote = HttpRemote::new(Transport::new(&settings));
        let flags = SyncFlags {
            allow_delete: self.delete,
            ..SyncFlags::default()
        }
        .for_watch();

        println!("{} {}", "Watching".bold(), root.display());
        let handler_root = root.clone();
        pathisync_watch::start_blocking(&root, move |batch: Vec<PathBuf>| {
            sync_batch(&handler_root, &remote, flags, &batch)
        })
        .context("watcher stopped")
    }
}

fn sync_batch(
    root: &std::path::Path,
    remote: &HttpRemote,
    flags: SyncFlags,
    batch: &[PathBuf],
) -> Result<()> {
    let mut prompter = TerminalPrompter;
    let mut session = Session::new(root, remote, &mut prompter, flags);
    let results = pipeline::sync_batch(&mut session, batch);

    let mut failed = 0usize;
    for (path, result) in &results {
        match result {
            Ok(report) => {
                for entity in report.changes() {
                    let line = format!("{} {}: {}", report.kind, entity.key, entity.outcome);
                    if entity.outcome.is_failure() {
                        failed += 1;
                        println!("{}", line.red());
                    } else {
                        println!("{}", line.green());
                    }
                }
            }
            Err(err) => {
                failed += 1;
                println!("{} {}: {err}", "✗".red(), path.display());
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{failed} of {} changed path(s) did not sync cleanly", results.len()));
    }
    Ok(())
}
