//! The closed set of synchronizable entity kinds and their accessor contract.
//!
//! | Kind         | Topic dir       | Remote path                        | Key           |
//! |--------------|-----------------|------------------------------------|---------------|
//! | Flow         | `flows`         | `/repository/flows`                | `name`        |
//! | SharedConfig | `sharedConfigs` | `/repository/sharedConfig`         | `referenceId` |
//! | Trigger      | `triggers`      | `/repository/flowTriggerers`       | `config.name` |
//! | Collection   | `resources`     | `/repository/resourceCollections`  | `collectionId`|

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// File name of a collection descriptor inside its collection directory.
pub const COLLECTION_DESCRIPTOR: &str = "_collection.json";

/// Suffix of the temporary file an atomic write renames into place.
pub const TMP_SUFFIX: &str = ".pathisync.tmp";

/// Server-assigned block excluded from every equality check.
const METADATA_FIELD: &str = "metadata";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Flow,
    SharedConfig,
    Trigger,
    Collection,
}

impl EntityKind {
    /// Every kind, in the order a full run visits them.
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Flow,
            EntityKind::SharedConfig,
            EntityKind::Trigger,
            EntityKind::Collection,
        ]
    }

    /// Kinds stored as one JSON file per entity.
    pub fn is_flat(self) -> bool {
        !matches!(self, EntityKind::Collection)
    }

    /// Top-level local directory for this kind.
    pub fn topic_dir(self) -> &'static str {
        match self {
            EntityKind::Flow => "flows",
            EntityKind::SharedConfig => "sharedConfigs",
            EntityKind::Trigger => "triggers",
            EntityKind::Collection => "resources",
        }
    }

    /// Remote collection path, relative to the server base URL.
    pub fn url_path(self) -> &'static str {
        match self {
            EntityKind::Flow => "/repository/flows",
            EntityKind::SharedConfig => "/repository/sharedConfig",
            EntityKind::Trigger => "/repository/flowTriggerers",
            EntityKind::Collection => "/repository/resourceCollections",
        }
    }

    /// Singular noun used in operator messages.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Flow => "flow",
            EntityKind::SharedConfig => "shared config",
            EntityKind::Trigger => "trigger",
            EntityKind::Collection => "collection",
        }
    }

    /// Extract the logical key of an entity value.
    pub fn key_of(self, value: &Value) -> Option<String> {
        let key = match self {
            EntityKind::Flow => value.get("name"),
            EntityKind::SharedConfig => value.get("referenceId"),
            EntityKind::Trigger => value.get("config").and_then(|c| c.get("name")),
            EntityKind::Collection => value.get("collectionId"),
        };
        key.and_then(Value::as_str).map(str::to_owned)
    }

    /// Remove server-assigned and otherwise volatile fields in place.
    pub fn strip_volatile(self, value: &mut Value) {
        let Some(object) = value.as_object_mut() else {
            return;
        };
        object.remove(METADATA_FIELD);

        if self == EntityKind::Flow {
            // The claims provider id is regenerated by the server on every read.
            if let Some(processors) = object.get_mut("processors").and_then(Value::as_object_mut) {
                for processor in processors.values_mut() {
                    if let Some(provider) = processor
                        .get_mut("config")
                        .and_then(|c| c.get_mut("userFetchProviderWhenUsingClaims"))
                        .and_then(Value::as_object_mut)
                    {
                        provider.remove("id");
                    }
                }
            }
        }
    }

    /// Resolve the kind owning `path` from its topic directory under `root`.
    pub fn from_path(root: &Path, path: &Path) -> Option<EntityKind> {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let first = relative.components().find_map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })?;
        Self::from_topic(first)
    }

    /// Parse a topic directory name.
    pub fn from_topic(topic: &str) -> Option<EntityKind> {
        Self::all().iter().copied().find(|k| k.topic_dir() == topic)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
