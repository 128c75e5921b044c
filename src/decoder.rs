//! Multi-document YAML decoding.
//!
//! A manifest file holds one or more documents separated by a line consisting
//! of `---`, optionally followed by whitespace or a `# comment`. Each non-blank segment is parsed
//! independently into an owned [`Document`]; nothing borrowed from the input
//! buffer survives decoding.
//!
//! Segments that are empty, whitespace-only or hold nothing but comments
//! contribute no document. A segment that fails to parse aborts decoding of
//! the whole file with a [`RenderError::Decode`] naming the file and the
//! zero-based segment index.
//!
//! Content on the separator line itself is not supported. A line such as
//! `--- {kind: B}` or `--- !tag` is not a separator, so it stays in the
//! preceding segment and that segment fails to decode. Put the document body
//! on the lines after the bare `---`.

use crate::core::{Document, RenderError, Result};
use serde_yaml::Value;
use tracing::{debug, trace};

/// Document separator line.
pub const SEPARATOR: &str = "---";

const BOM: char = '\u{feff}';

/// Split `content` into raw segments on separator lines.
///
/// Separator lines themselves are not part of any segment. The number of
/// segments is always one more than the number of separators, so empty
/// segments are returned too; callers decide whether to skip them.
pub fn split_documents(content: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let line_end = offset + line.len();
        if is_separator(line) {
            segments.push(&content[start..offset]);
            start = line_end;
        }
        offset = line_end;
    }
    segments.push(&content[start..]);
    segments
}

fn is_separator(line: &str) -> bool {
    line.strip_prefix(SEPARATOR).is_some_and(|rest| {
        let trimmed = rest.trim();
        trimmed.is_empty() || (rest.starts_with(char::is_whitespace) && trimmed.starts_with('#'))
    })
}

/// Decode every document in a file.
///
/// `path` is only used for error reporting.
///
/// # Errors
///
/// Returns [`RenderError::Decode`] if the file is not UTF-8, a segment is not
/// valid YAML, or a segment is not a mapping with a non-empty `kind`.
pub fn decode_all(path: &str, bytes: &[u8]) -> Result<Vec<Document>> {
    let content = std::str::from_utf8(bytes).map_err(|e| RenderError::Decode {
        path: path.to_string(),
        index: 0,
        reason: format!("file is not valid UTF-8: {e}"),
    })?;
    let content = content.strip_prefix(BOM).unwrap_or(content);

    let mut documents = Vec::new();
    for (index, segment) in split_documents(content).into_iter().enumerate() {
        if is_blank(segment) {
            trace!(target: "decoder", "Skipping empty segment #{} in {}", index, path);
            continue;
        }
        if let Some(document) = decode_segment(path, index, segment)? {
            documents.push(document);
        }
    }

    debug!(target: "decoder", "Decoded {} documents from {}", documents.len(), path);
    Ok(documents)
}

/// Whitespace and comment lines only.
fn is_blank(segment: &str) -> bool {
    segment.lines().map(str::trim).all(|line| line.is_empty() || line.starts_with('#'))
}

fn decode_segment(path: &str, index: usize, segment: &str) -> Result<Option<Document>> {
    let error = |reason: String| RenderError::Decode {
        path: path.to_string(),
        index,
        reason,
    };

    let value: Value = serde_yaml::from_str(segment).map_err(|e| error(e.to_string()))?;
    let mapping = match value {
        // An explicit `~` or `null` document.
        Value::Null => return Ok(None),
        Value::Mapping(mapping) => mapping,
        other => return Err(error(format!("expected a mapping, found {}", value_type(&other)))),
    };

    let document = Document::from_mapping(mapping);
    if document.kind().is_empty() {
        return Err(error("missing required field 'kind'".to_string()));
    }
    Ok(Some(document))
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
