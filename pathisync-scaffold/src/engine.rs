//! Tera rendering engine for the files `pathisync init` writes.
//!
//! | Template             | Output        |
//! |----------------------|---------------|
//! | `readme.md.tera`     | `README.md`   |
//! | `env.tera`           | `.env`        |
//! | `gitignore.tera`     | `.gitignore`  |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::ProjectContext;
use crate::error::{io_err, ScaffoldError};

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str, &str)] = &[
    ("readme.md.tera", "README.md", include_str!("templates/readme.md.tera")),
    ("env.tera", ".env", include_str!("templates/env.tera")),
    ("gitignore.tera", ".gitignore", include_str!("templates/gitignore.tera")),
];

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, ScaffoldError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    let mut templates = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((normalize_template_name(rel), contents));
    }
    Ok(templates)
}

/// Embedded project templates, optionally overridden by `.tera` files with
/// the same name in a user directory.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, ScaffoldError> {
        let mut templates: HashMap<String, String> = TPLS
            .iter()
            .map(|(name, _, content)| (name.to_string(), content.to_string()))
            .collect();
        if let Some(dir) = user_template_dir {
            for (name, content) in load_user_templates(dir)? {
                if templates.contains_key(&name) {
                    tracing::debug!("using user template {name}");
                    templates.insert(name, content);
                }
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
        Ok(TemplateEngine { tera })
    }

    /// Render every project file.
    ///
    /// Returns `Vec<(relative_output_path, rendered_content)>`.
    pub fn render(&self, ctx: &ProjectContext) -> Result<Vec<(PathBuf, String)>, ScaffoldError> {
        let tera_ctx = ctx.to_tera_context()?;
        let mut results = Vec::with_capacity(TPLS.len());
        for (name, output, _) in TPLS {
            let content = self.tera.render(name, &tera_ctx)?;
            results.push((PathBuf::from(output), content));
        }
        Ok(results)
    }
}
