//! JSON Patch stamping the WAF certificate id onto the admitted secret

use json_patch::{AddOperation, Patch, PatchOperation};
use jsonptr::PointerBuf;
use kube::core::ObjectMeta;
use std::fmt;
use std::str::FromStr;

/// Metadata map the certificate id is written to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PatchTarget {
    #[default]
    Annotation,
    Label,
}

impl PatchTarget {
    fn map_name(self) -> &'static str {
        match self {
            PatchTarget::Annotation => "annotations",
            PatchTarget::Label => "labels",
        }
    }
}

impl fmt::Display for PatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchTarget::Annotation => f.write_str("annotation"),
            PatchTarget::Label => f.write_str("label"),
        }
    }
}

impl FromStr for PatchTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "annotation" | "annotations" => Ok(PatchTarget::Annotation),
            "label" | "labels" => Ok(PatchTarget::Label),
            other => Err(format!(
                "unknown patch target '{other}', expected annotation or label"
            )),
        }
    }
}

/// Build the patch setting `key` to `certificate_id`
///
/// Adds the single entry when the target map exists, otherwise creates the
/// map holding just that entry. `add` on an existing member replaces it.
#[must_use]
pub fn certificate_id_patch(
    metadata: &ObjectMeta,
    target: PatchTarget,
    key: &str,
    certificate_id: &str,
) -> Patch {
    let map_name = target.map_name();
    let existing = match target {
        PatchTarget::Annotation => metadata.annotations.as_ref(),
        PatchTarget::Label => metadata.labels.as_ref(),
    };

    let operation = if existing.is_some() {
        AddOperation {
            path: PointerBuf::from_tokens(["metadata", map_name, key]),
            value: serde_json::Value::String(certificate_id.to_string()),
        }
    } else {
        AddOperation {
            path: PointerBuf::from_tokens(["metadata", map_name]),
            value: serde_json::json!({ key: certificate_id }),
        }
    };

    Patch(vec![PatchOperation::Add(operation)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const KEY: &str = "waf-cert-uploader.iits.tech/cert-waf-id";

    #[test]
    fn test_adds_entry_to_existing_annotations() {
        let metadata = ObjectMeta {
            annotations: Some(BTreeMap::from([(
                "cert-manager.io/certificate-name".to_string(),
                "example".to_string(),
            )])),
            ..ObjectMeta::default()
        };
        let patch = certificate_id_patch(&metadata, PatchTarget::Annotation, KEY, "c-42");

        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!([{
                "op": "add",
                "path": "/metadata/annotations/waf-cert-uploader.iits.tech~1cert-waf-id",
                "value": "c-42"
            }])
        );
    }

    #[test]
    fn test_creates_missing_label_map() {
        let patch =
            certificate_id_patch(&ObjectMeta::default(), PatchTarget::Label, KEY, "c-42");

        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!([{
                "op": "add",
                "path": "/metadata/labels",
                "value": { KEY: "c-42" }
            }])
        );
    }

    #[test]
    fn test_patch_applies_and_overwrites() {
        let mut doc = serde_json::json!({
            "metadata": { "annotations": { KEY: "old-1", "other": "x" } }
        });
        let metadata: ObjectMeta = serde_json::from_value(doc["metadata"].clone()).unwrap();
        let patch = certificate_id_patch(&metadata, PatchTarget::Annotation, KEY, "new-2");

        json_patch::patch(&mut doc, &patch.0).unwrap();
        assert_eq!(doc["metadata"]["annotations"][KEY], "new-2");
        assert_eq!(doc["metadata"]["annotations"]["other"], "x");
    }

    #[test]
    fn test_parse_patch_target() {
        assert_eq!("Label".parse::<PatchTarget>(), Ok(PatchTarget::Label));
        assert_eq!("annotations".parse::<PatchTarget>(), Ok(PatchTarget::Annotation));
        assert!("status".parse::<PatchTarget>().is_err());
    }
}
