//! `pathisync sync`: one reconciliation pass over the project.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use pathisync_core::{EntityKind, SyncFlags};
use pathisync_sync::{pipeline, HttpRemote, Session, Transport};

use super::prompter::TerminalPrompter;
use super::report::print_reports;
use super::{init_tracing, ConnectionArgs};
use crate::KindArg;

/// Arguments for `pathisync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Reconcile only the entity stored at this path.
    #[arg(conflicts_with = "kind")]
    pub path: Option<PathBuf>,

    /// Never prompt; prefer the remote copy and create missing files locally.
    #[arg(long, short = 'l')]
    pub local: bool,

    /// With --local, write new entities at the top of their topic folder.
    #[arg(long, short = 'f', requires = "local")]
    pub default_folder: bool,

    /// Offer delete actions in prompts.
    #[arg(long, short = 'd')]
    pub delete: bool,

    /// Restrict the run to these kinds (flows, sharedConfigs, triggers, resources).
    #[arg(long, value_name = "KIND")]
    pub kind: Vec<KindArg>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        init_tracing("warn");

        let root = self.connection.project_root()?;
        let settings = self.connection.settings(&root)?;
        let remote = HttpRemote::new(Transport::new(&settings));
        let mut prompter = TerminalPrompter;
        let mut session = Session::new(&root, &remote, &mut prompter, self.flags());

        let reports = match &self.path {
            Some(path) => vec![pipeline::sync_path(&mut session, path)
                .with_context(|| format!("sync failed for '{}'", path.display()))?],
            None => {
                let kinds = self.kinds();
                pipeline::run(&mut session, &kinds).context("sync failed")?
            }
        };

        let failures = print_reports(&reports);
        if failures > 0 {
            bail!("{failures} remote write(s) were rejected by the server");
        }
        Ok(())
    }

    fn flags(&self) -> SyncFlags {
        SyncFlags {
            force_local: self.local,
            force_default_folder: self.default_folder,
            allow_delete: self.delete,
            watch: false,
        }
    }

    fn kinds(&self) -> Vec<EntityKind> {
        if self.kind.is_empty() {
            return EntityKind::all().to_vec();
        }
        // Keep the canonical visiting order whatever order the flags came in.
        EntityKind::all()
            .iter()
            .copied()
            .filter(|kind| self.kind.iter().any(|arg| arg.0 == *kind))
            .collect()
    }
}
