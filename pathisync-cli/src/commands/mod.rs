pub mod init;
pub mod prompter;
pub mod report;
pub mod sync;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pathisync_core::config::{self, Settings, SERVER_URL_VAR, TOKEN_VAR};

/// Project location and credential overrides shared by `sync` and `watch`.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Project directory holding `.env` and the topic folders.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Bearer token; overrides PATHIFY_TOKEN from the environment or `.env`.
    #[arg(long)]
    pub token: Option<String>,

    /// Server base URL; overrides FLOW_SERVER_URL from the environment or `.env`.
    #[arg(long)]
    pub server_url: Option<String>,
}

impl ConnectionArgs {
    pub fn project_root(&self) -> Result<PathBuf> {
        self.root
            .canonicalize()
            .with_context(|| format!("cannot resolve project root '{}'", self.root.display()))
    }

    /// Flags win over the environment, which wins over `.env`.
    pub fn settings(&self, root: &std::path::Path) -> Result<Settings> {
        let env_file = config::env_file_path(root);
        let file_vars = config::read_env_file(&env_file)?;
        let settings = config::resolve(&file_vars, |key| match key {
            TOKEN_VAR => self.token.clone().or_else(|| std::env::var(key).ok()),
            SERVER_URL_VAR => self.server_url.clone().or_else(|| std::env::var(key).ok()),
            _ => std::env::var(key).ok(),
        })
        .with_context(|| format!("invalid configuration (checked flags, environment and {})", env_file.display()))?;
        Ok(settings)
    }
}

pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
