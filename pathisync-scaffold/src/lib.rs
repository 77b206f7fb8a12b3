//! # pathisync-scaffold
//!
//! Project initialisation: the four topic directories plus `README.md`,
//! `.env` and `.gitignore` rendered from embedded Tera templates.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use pathisync_scaffold::{init_project, InitOptions};
//!
//! if let Ok(report) = init_project(Path::new("."), "pathisync", InitOptions::default()) {
//!     println!("created {}", report.project_dir.display());
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod init;

pub use context::ProjectContext;
pub use engine::TemplateEngine;
pub use error::ScaffoldError;
pub use init::{init_project, InitOptions, InitReport};
