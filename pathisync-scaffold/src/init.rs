//! `pathisync init`: lay out a fresh project directory.

use std::path::{Component, Path, PathBuf};

use tracing::info;

use pathisync_core::EntityKind;

use crate::context::ProjectContext;
use crate::engine::TemplateEngine;
use crate::error::{io_err, ScaffoldError};

/// What [`init_project`] created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub project_dir: PathBuf,
    pub directories: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

/// Options for [`init_project`].
#[derive(Debug, Clone, Default)]
pub struct InitOptions<'a> {
    pub server_url: Option<&'a str>,
    pub template_dir: Option<&'a Path>,
}

/// Create `<parent>/<name>` with every topic directory and the rendered
/// project files. Fails if the directory already exists.
pub fn init_project(
    parent: &Path,
    name: &str,
    options: InitOptions<'_>,
) -> Result<InitReport, ScaffoldError> {
    validate_name(name)?;
    let project_dir = parent.join(name);
    if project_dir.exists() {
        return Err(ScaffoldError::AlreadyExists(project_dir));
    }

    let engine = TemplateEngine::new(options.template_dir)?;
    let rendered = engine.render(&ProjectContext::new(name, options.server_url))?;

    let mut directories = Vec::new();
    for kind in EntityKind::all() {
        let dir = project_dir.join(kind.topic_dir());
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        directories.push(dir);
    }

    let mut files = Vec::new();
    for (relative, content) in rendered {
        let path = project_dir.join(relative);
        std::fs::write(&path, content).map_err(|e| io_err(&path, e))?;
        files.push(path);
    }

    info!("initialised {}", project_dir.display());
    Ok(InitReport {
        project_dir,
        directories,
        files,
    })
}

fn validate_name(name: &str) -> Result<(), ScaffoldError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ScaffoldError::InvalidName(name.to_string())),
    }
}
