//! Structured manifest document.
//!
//! A [`Document`] is one decoded record from a manifest file: a YAML mapping
//! with the usual Kubernetes identity fields (`apiVersion`, `kind`,
//! `metadata.name`, `metadata.namespace`) and a mutable annotation/label map.
//! The rest of the content is opaque to the render pipeline.
//!
//! Documents own all of their data. Cloning one produces a fully independent
//! structural copy, which is what the cache relies on to keep cached values
//! isolated from caller mutation.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;

const METADATA: &str = "metadata";
const ANNOTATIONS: &str = "annotations";
const LABELS: &str = "labels";

/// One decoded manifest document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    root: Mapping,
}

impl Document {
    /// Wrap an already-parsed mapping.
    pub fn from_mapping(root: Mapping) -> Self {
        Self {
            root,
        }
    }

    /// Build a minimal document with the given identity.
    ///
    /// `namespace` is omitted from the metadata when `None`.
    pub fn new(api_version: &str, kind: &str, name: &str, namespace: Option<&str>) -> Self {
        let mut metadata = Mapping::new();
        metadata.insert(Value::from("name"), Value::from(name));
        if let Some(ns) = namespace {
            metadata.insert(Value::from("namespace"), Value::from(ns));
        }

        let mut root = Mapping::new();
        root.insert(Value::from("apiVersion"), Value::from(api_version));
        root.insert(Value::from("kind"), Value::from(kind));
        root.insert(Value::from(METADATA), Value::Mapping(metadata));
        Self {
            root,
        }
    }

    /// The underlying mapping.
    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    /// Mutable access to the underlying mapping.
    pub fn as_mapping_mut(&mut self) -> &mut Mapping {
        &mut self.root
    }

    /// Consume the document and return its mapping.
    pub fn into_mapping(self) -> Mapping {
        self.root
    }

    /// `apiVersion`, or an empty string when absent.
    pub fn api_version(&self) -> &str {
        self.root.get("apiVersion").and_then(Value::as_str).unwrap_or_default()
    }

    /// `kind`, or an empty string when absent.
    pub fn kind(&self) -> &str {
        self.root.get("kind").and_then(Value::as_str).unwrap_or_default()
    }

    /// `metadata.name`, or an empty string when absent.
    pub fn name(&self) -> &str {
        self.metadata_str("name")
    }

    /// `metadata.namespace`, or an empty string for cluster-scoped documents.
    pub fn namespace(&self) -> &str {
        self.metadata_str("namespace")
    }

    /// Set `metadata.namespace`.
    pub fn set_namespace(&mut self, namespace: &str) {
        self.metadata_mut().insert(Value::from("namespace"), Value::from(namespace));
    }

    /// Look up a single annotation.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.string_map(ANNOTATIONS)?.get(key).and_then(Value::as_str)
    }

    /// Set an annotation, replacing any previous value.
    pub fn set_annotation(&mut self, key: &str, value: &str) {
        self.string_map_mut(ANNOTATIONS).insert(Value::from(key), Value::from(value));
    }

    /// Look up a single label.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.string_map(LABELS)?.get(key).and_then(Value::as_str)
    }

    /// Set a label, replacing any previous value.
    pub fn set_label(&mut self, key: &str, value: &str) {
        self.string_map_mut(LABELS).insert(Value::from(key), Value::from(value));
    }

    /// Human readable identity used in logs and errors: `kind/namespace/name`
    /// (or `kind/name` for cluster-scoped documents).
    pub fn identity(&self) -> String {
        if self.namespace().is_empty() {
            format!("{}/{}", self.kind(), self.name())
        } else {
            format!("{}/{}/{}", self.kind(), self.namespace(), self.name())
        }
    }

    fn metadata_str(&self, key: &str) -> &str {
        self.root
            .get(METADATA)
            .and_then(Value::as_mapping)
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn metadata_mut(&mut self) -> &mut Mapping {
        child_mapping(&mut self.root, METADATA)
    }

    fn string_map(&self, field: &str) -> Option<&Mapping> {
        self.root.get(METADATA)?.as_mapping()?.get(field)?.as_mapping()
    }

    fn string_map_mut(&mut self, field: &str) -> &mut Mapping {
        child_mapping(self.metadata_mut(), field)
    }
}

/// Return the mapping stored under `key`, creating (or replacing a non-mapping
/// value with) an empty one first.
fn child_mapping<'a>(parent: &'a mut Mapping, key: &str) -> &'a mut Mapping {
    let slot = parent.entry(Value::from(key)).or_insert_with(|| Value::Mapping(Mapping::new()));
    if !slot.is_mapping() {
        *slot = Value::Mapping(Mapping::new());
    }
    match slot {
        Value::Mapping(m) => m,
        _ => unreachable!("slot was just set to a mapping"),
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}
