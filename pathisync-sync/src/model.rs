//! Typed view of resource collections.
//!
//! Only the fields the reconciler reasons about are named; everything else
//! rides along in `extra` so a round trip never loses server fields and
//! object comparison stays key-set exact.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{json_err, SyncError};
use crate::store;

const METADATA_FIELD: &str = "metadata";

/// A `_collection.json` descriptor, or one entry of the remote listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDoc {
    pub collection_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(default)]
    pub resources: Vec<MemberResource>,
}

/// One file-backed member of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResource {
    pub resource_id: String,
    #[serde(default)]
    pub resource_accessor_path: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Base64 content on the wire; always empty in a descriptor at rest.
    #[serde(default)]
    pub resource_bytes: String,
}

impl CollectionDoc {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Read a local descriptor.
    pub fn read(path: &Path) -> Result<Self, SyncError> {
        Self::from_value(store::read_json(path)?).map_err(|e| json_err(path, e))
    }

    pub fn strip_metadata(&mut self) {
        self.extra.remove(METADATA_FIELD);
    }

    /// The descriptor with its membership reduced to an empty list.
    pub fn shell(&self) -> Self {
        Self {
            collection_id: self.collection_id.clone(),
            extra: self.extra.clone(),
            resources: Vec::new(),
        }
    }

    /// Report key for a member: `<collectionId>/<accessor path>`.
    pub fn member_key(&self, member: &MemberResource) -> String {
        member_key(&self.collection_id, member)
    }
}

pub fn member_key(collection_id: &str, member: &MemberResource) -> String {
    format!(
        "{collection_id}/{}",
        member.resource_accessor_path.trim_start_matches('/')
    )
}

impl MemberResource {
    /// The descriptor entry with its content elided.
    pub fn without_bytes(&self) -> Self {
        Self {
            resource_bytes: String::new(),
            ..self.clone()
        }
    }

    /// The descriptor entry carrying `encoded` as its content.
    pub fn with_bytes(&self, encoded: String) -> Self {
        Self {
            resource_bytes: encoded,
            ..self.clone()
        }
    }

    /// The member's content, decoded from its base64 wire form.
    pub fn decoded_bytes(&self) -> Result<Vec<u8>, SyncError> {
        decode_bytes(&self.resource_bytes).map_err(|source| SyncError::InvalidContent {
            key: self.resource_id.clone(),
            source,
        })
    }

    pub fn local_path(&self, collection_dir: &Path) -> Result<PathBuf, SyncError> {
        store::member_path(collection_dir, &self.resource_accessor_path)
    }
}

pub fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_bytes(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(encoded.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "collectionId": "c1",
            "metadata": {"author": "x", "created": 1},
            "resources": [{
                "resourceId": "r1",
                "resourceCollectionId": "c1",
                "resourceAccessorPath": "/index.html",
                "resourceAccessorMethod": "GET",
                "resourceBytes": "aGk="
            }]
        })
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let doc = CollectionDoc::from_value(sample()).unwrap();
        assert_eq!(doc.resources[0].extra["resourceAccessorMethod"], json!("GET"));
        let value = doc.to_value().unwrap();
        assert_eq!(value, sample());
    }

    #[test]
    fn shell_drops_members_and_strip_drops_metadata() {
        let mut doc = CollectionDoc::from_value(sample()).unwrap();
        doc.strip_metadata();
        let shell = doc.shell();
        assert!(shell.resources.is_empty());
        assert_eq!(shell.to_value().unwrap(), json!({"collectionId": "c1", "resources": []}));
    }

    #[test]
    fn missing_bytes_default_to_empty() {
        let member: MemberResource =
            serde_json::from_value(json!({"resourceId": "r", "resourceAccessorPath": "/a"}))
                .unwrap();
        assert_eq!(member.resource_bytes, "");
        assert_eq!(member_key("c9", &member), "c9/a");
    }

    #[test]
    fn base64_decodes_what_it_encodes() {
        assert_eq!(encode_bytes(b"hi"), "aGk=");
        assert_eq!(decode_bytes("aGk=\n").unwrap(), b"hi");
        assert!(decode_bytes("not base64!").is_err());
    }
}
