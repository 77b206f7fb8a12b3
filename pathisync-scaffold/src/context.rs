//! Template context: serializable payload for the project templates.

use serde::{Deserialize, Serialize};

use pathisync_core::config::{ENV_FILE, SERVER_URL_VAR, TOKEN_VAR};
use pathisync_core::{EntityKind, TMP_SUFFIX};

use crate::error::ScaffoldError;

/// Placeholder written when no server URL is known yet.
pub const DEFAULT_SERVER_URL: &str = "https://<your.flow.server>";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectContext {
    pub project_name: String,
    pub server_url: String,
    pub token_var: String,
    pub server_url_var: String,
    pub env_file: String,
    pub tmp_suffix: String,
    pub topics: Vec<TopicCtx>,
}

/// One topic directory as shown in the README.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicCtx {
    pub dir: String,
    pub label: String,
    pub description: String,
}

impl ProjectContext {
    pub fn new(project_name: &str, server_url: Option<&str>) -> Self {
        Self {
            project_name: project_name.to_string(),
            server_url: server_url.unwrap_or(DEFAULT_SERVER_URL).to_string(),
            token_var: TOKEN_VAR.to_string(),
            server_url_var: SERVER_URL_VAR.to_string(),
            env_file: ENV_FILE.to_string(),
            tmp_suffix: TMP_SUFFIX.to_string(),
            topics: EntityKind::all().iter().map(|k| TopicCtx::from_kind(*k)).collect(),
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, ScaffoldError> {
        Ok(tera::Context::from_serialize(self)?)
    }
}

impl TopicCtx {
    fn from_kind(kind: EntityKind) -> Self {
        let description = match kind {
            EntityKind::Collection => "one folder per resource collection".to_string(),
            other => format!("one `<key>.json` file per {other}"),
        };
        Self {
            dir: kind.topic_dir().to_string(),
            label: format!("{}s", kind.label()),
            description,
        }
    }
}
