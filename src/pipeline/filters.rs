//! Built-in filters.

use super::{Filter, filter};
use crate::core::Document;

/// Keep documents whose `kind` is one of `kinds`.
pub fn by_kind<I, S>(kinds: I) -> Filter
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let kinds: Vec<String> = kinds.into_iter().map(Into::into).collect();
    filter(move |d: &Document| kinds.iter().any(|k| k == d.kind()))
}

/// Keep documents in one of `namespaces`. Cluster-scoped documents have the
/// empty namespace.
pub fn by_namespace<I, S>(namespaces: I) -> Filter
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let namespaces: Vec<String> = namespaces.into_iter().map(Into::into).collect();
    filter(move |d: &Document| namespaces.iter().any(|ns| ns == d.namespace()))
}

/// Drop documents named `name`.
pub fn exclude_name(name: impl Into<String>) -> Filter {
    let name = name.into();
    filter(move |d: &Document| d.name() != name)
}

/// Keep documents carrying label `key`, optionally with a specific value.
pub fn has_label(key: impl Into<String>, value: Option<String>) -> Filter {
    let key = key.into();
    filter(move |d: &Document| match (d.label(&key), value.as_deref()) {
        (Some(actual), Some(expected)) => actual == expected,
        (Some(_), None) => true,
        (None, _) => false,
    })
}
