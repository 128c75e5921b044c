//! Built-in transformers.

use super::{Transformer, transformer};
use crate::core::Document;

/// Set `metadata.namespace` on every document that is not cluster-scoped.
///
/// `cluster_kinds` lists the kinds left untouched (e.g. `Namespace`,
/// `ClusterRole`).
pub fn set_namespace(namespace: impl Into<String>, cluster_kinds: Vec<String>) -> Transformer {
    let namespace = namespace.into();
    transformer(move |mut d: Document| {
        if !cluster_kinds.iter().any(|k| k == d.kind()) {
            d.set_namespace(&namespace);
        }
        Ok(Some(d))
    })
}

/// Set a label on every document.
pub fn set_label(key: impl Into<String>, value: impl Into<String>) -> Transformer {
    let (key, value) = (key.into(), value.into());
    transformer(move |mut d: Document| {
        d.set_label(&key, &value);
        Ok(Some(d))
    })
}

/// Set an annotation on every document.
pub fn set_annotation(key: impl Into<String>, value: impl Into<String>) -> Transformer {
    let (key, value) = (key.into(), value.into());
    transformer(move |mut d: Document| {
        d.set_annotation(&key, &value);
        Ok(Some(d))
    })
}

/// Remove every document of the given kind.
pub fn drop_kind(kind: impl Into<String>) -> Transformer {
    let kind = kind.into();
    transformer(move |d: Document| Ok((d.kind() != kind).then_some(d)))
}
