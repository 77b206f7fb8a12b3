//! `pathisync init <name> [--server-url <URL>] [--templates <DIR>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pathisync_scaffold::{init_project, InitOptions};

/// Create a new project directory.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Name of the project directory to create.
    pub name: String,

    /// Directory to create the project in.
    #[arg(long, default_value = ".")]
    pub parent: PathBuf,

    /// Server URL written into the generated `.env`.
    #[arg(long)]
    pub server_url: Option<String>,

    /// Directory with template overrides (`readme.md.tera`, `env.tera`, `gitignore.tera`).
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let options = InitOptions {
            server_url: self.server_url.as_deref(),
            template_dir: self.templates.as_deref(),
        };
        let report = init_project(&self.parent, &self.name, options)
            .with_context(|| format!("failed to initialise project '{}'", self.name))?;

        println!("✓ Created project '{}'", self.name);
        println!("  Location: {}", report.project_dir.display());
        for file in &report.files {
            println!("  ✎  {}", file.display());
        }
        println!("  Add your token to .env, then run `pathisync sync`.");
        Ok(())
    }
}
