//! Structural equality between a remote and a local snapshot.
//!
//! Arrays compare order-sensitively and objects key-set-exactly; that is just
//! `serde_json::Value` equality once volatile fields are gone. Member content
//! is never compared as base64 text, only as decoded bytes.

use serde_json::Value;
use similar::TextDiff;

use pathisync_core::EntityKind;

use crate::error::SyncError;
use crate::model::{CollectionDoc, MemberResource};

const RESOURCES_FIELD: &str = "resources";
const BYTES_FIELD: &str = "resourceBytes";

/// Equality of one entity after stripping server-assigned fields.
///
/// For collections the member `resourceBytes` are elided from both sides.
pub fn is_equivalent(kind: EntityKind, remote: &Value, local: &Value) -> bool {
    normalized(kind, remote) == normalized(kind, local)
}

/// `value` with everything the comparison ignores removed.
pub fn normalized(kind: EntityKind, value: &Value) -> Value {
    let mut value = value.clone();
    kind.strip_volatile(&mut value);
    if kind == EntityKind::Collection {
        elide_member_bytes(&mut value);
    }
    value
}

fn elide_member_bytes(value: &mut Value) {
    let Some(Value::Array(members)) = value.get_mut(RESOURCES_FIELD) else {
        return;
    };
    for member in members {
        if let Some(fields) = member.as_object_mut() {
            fields.remove(BYTES_FIELD);
        }
    }
}

/// Descriptor tier: collection fields plus the relative order of the members
/// both sides list. Member fields and content are judged per member.
pub fn descriptor_equivalent(remote: &CollectionDoc, local: &CollectionDoc) -> bool {
    let mut remote_shell = remote.shell();
    let mut local_shell = local.shell();
    remote_shell.strip_metadata();
    local_shell.strip_metadata();
    remote_shell == local_shell && shared_order(remote, local) == shared_order(local, remote)
}

/// Ids of `doc`'s members that `other` also lists, in `doc`'s order.
fn shared_order<'a>(doc: &'a CollectionDoc, other: &CollectionDoc) -> Vec<&'a str> {
    doc.resources
        .iter()
        .map(|m| m.resource_id.as_str())
        .filter(|id| other.resources.iter().any(|o| o.resource_id == *id))
        .collect()
}

/// A member's descriptor entry, ignoring its content.
pub fn member_entry_equivalent(remote: &MemberResource, local: &MemberResource) -> bool {
    remote.without_bytes() == local.without_bytes()
}

/// Whether the remote member's content equals the bytes of its local file.
pub fn content_equivalent(remote: &MemberResource, local_bytes: &[u8]) -> Result<bool, SyncError> {
    Ok(remote.decoded_bytes()? == local_bytes)
}

/// Unified diff of two JSON values rendered as pretty JSON.
pub fn unified_diff(remote: &Value, local: &Value, label: &str) -> String {
    let before = pretty(remote);
    let after = pretty(local);
    TextDiff::from_lines(&before, &after)
        .unified_diff()
        .header(&format!("remote/{label}"), &format!("local/{label}"))
        .context_radius(3)
        .to_string()
}

fn pretty(value: &Value) -> String {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_default();
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection(order: &[&str]) -> Value {
        let resources: Vec<Value> = order
            .iter()
            .map(|id| {
                json!({
                    "resourceId": id,
                    "resourceAccessorPath": format!("/{id}.txt"),
                    "resourceBytes": ""
                })
            })
            .collect();
        json!({"collectionId": "c", "resources": resources})
    }

    #[test]
    fn metadata_is_ignored() {
        let remote = json!({"name": "A", "metadata": {"author": "x"}, "steps": []});
        let local = json!({"name": "A", "steps": []});
        assert!(is_equivalent(EntityKind::Flow, &remote, &local));
    }

    #[test]
    fn missing_field_is_a_difference() {
        let remote = json!({"referenceId": "B", "value": null});
        let local = json!({"referenceId": "B"});
        assert!(!is_equivalent(EntityKind::SharedConfig, &remote, &local));
    }

    #[test]
    fn key_order_is_not_a_difference() {
        let remote: Value = serde_json::from_str(r#"{"name":"A","steps":[1,2]}"#).unwrap();
        let local: Value = serde_json::from_str(r#"{"steps":[1,2],"name":"A"}"#).unwrap();
        assert!(is_equivalent(EntityKind::Flow, &remote, &local));
    }

    #[test]
    fn array_order_is_a_difference() {
        let remote = json!({"name": "A", "steps": [1, 2]});
        let local = json!({"name": "A", "steps": [2, 1]});
        assert!(!is_equivalent(EntityKind::Flow, &remote, &local));
    }

    #[test]
    fn collection_member_bytes_are_elided() {
        let mut remote = collection(&["a"]);
        remote["resources"][0]["resourceBytes"] = json!("aGk=");
        assert!(is_equivalent(EntityKind::Collection, &remote, &collection(&["a"])));
    }

    #[test]
    fn collection_member_order_is_a_difference() {
        let remote = collection(&["a", "b"]);
        let local = collection(&["b", "a"]);
        assert!(!is_equivalent(EntityKind::Collection, &remote, &local));

        let remote = CollectionDoc::from_value(remote).unwrap();
        let local = CollectionDoc::from_value(local).unwrap();
        assert!(!descriptor_equivalent(&remote, &local));
    }

    #[test]
    fn descriptor_tier_ignores_membership_differences() {
        let remote = CollectionDoc::from_value(collection(&["a", "b", "c"])).unwrap();
        let local = CollectionDoc::from_value(collection(&["a", "c"])).unwrap();
        assert!(descriptor_equivalent(&remote, &local));
    }

    #[test]
    fn content_compares_decoded_bytes() {
        let member: MemberResource = serde_json::from_value(json!({
            "resourceId": "r", "resourceAccessorPath": "/r", "resourceBytes": "aGk="
        }))
        .unwrap();
        assert!(content_equivalent(&member, b"hi").unwrap());
        assert!(!content_equivalent(&member, b"ho").unwrap());
    }

    #[test]
    fn unified_diff_marks_changed_lines() {
        let diff = unified_diff(&json!({"name": "A", "v": 1}), &json!({"name": "A", "v": 2}), "A");
        assert!(diff.contains("-  \"v\": 1"));
        assert!(diff.contains("+  \"v\": 2"));
    }
}
