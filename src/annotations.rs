//! Source provenance annotations.
//!
//! When enabled, every decoded document is stamped with the renderer kind and
//! the file it came from, relative to the source filesystem root. Stamping
//! runs right after decoding, before any filter or transformer.

use crate::core::Document;

/// Annotation holding the renderer kind (e.g. `yaml`).
pub const SOURCE_TYPE: &str = "manifest-render.io/source.type";

/// Annotation holding the originating file path.
pub const SOURCE_FILE: &str = "manifest-render.io/source.file";

/// Return `document` with provenance annotations added.
///
/// Keys already present on the document are left untouched.
pub fn stamp(mut document: Document, source_file: &str, renderer_kind: &str) -> Document {
    for (key, value) in [(SOURCE_TYPE, renderer_kind), (SOURCE_FILE, source_file)] {
        if document.annotation(key).is_none() {
            document.set_annotation(key, value);
        }
    }
    document
}
