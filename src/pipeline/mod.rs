//! Filter and transformer composition.
//!
//! The pipeline runs caller-supplied stages over a document sequence:
//!
//! 1. **Filters** - predicates; a document survives only if every filter
//!    keeps it. Evaluation stops at the first rejection.
//! 2. **Transformers** - applied in configured order to each surviving
//!    document. A transformer may rewrite the document, drop it by returning
//!    `Ok(None)`, or fail. Any failure aborts the whole run and no partial
//!    output is returned.
//!
//! Stages are never reordered and the pipeline adds no randomness, so the same
//! input always yields the same output.
//!
//! Ready-made stages live in [`filters`] and [`transformers`].

pub mod filters;
pub mod transformers;

use crate::core::{Document, RenderError, Result};
use std::sync::Arc;
use tracing::trace;

/// Predicate deciding whether a document is kept.
pub type Filter = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

/// Document rewrite. `Ok(None)` removes the document from the output.
pub type Transformer = Arc<dyn Fn(Document) -> anyhow::Result<Option<Document>> + Send + Sync>;

/// Wrap a closure as a [`Filter`].
pub fn filter<F>(f: F) -> Filter
where
    F: Fn(&Document) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`Transformer`].
pub fn transformer<F>(f: F) -> Transformer
where
    F: Fn(Document) -> anyhow::Result<Option<Document>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Whether every filter keeps `document`.
pub fn keep(document: &Document, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f(document))
}

/// Run `documents` through `filters` then `transformers`.
///
/// # Errors
///
/// Returns [`RenderError::Transform`] carrying the identity of the document
/// being transformed when any transformer fails.
pub fn apply(
    documents: Vec<Document>,
    filters: &[Filter],
    transformers: &[Transformer],
) -> Result<Vec<Document>> {
    let mut output = Vec::with_capacity(documents.len());

    'documents: for document in documents {
        if !keep(&document, filters) {
            trace!(target: "pipeline", "Filtered out {}", document);
            continue;
        }

        let mut current = document;
        for transform in transformers {
            let identity = current.identity();
            match transform(current) {
                Ok(Some(next)) => current = next,
                Ok(None) => {
                    trace!(target: "pipeline", "Transformer removed {}", identity);
                    continue 'documents;
                }
                Err(source) => {
                    return Err(RenderError::Transform {
                        document: identity,
                        source,
                    });
                }
            }
        }
        output.push(current);
    }

    Ok(output)
}
