//! Glob matching of source patterns against a [`SourceFs`].
//!
//! # Pattern Syntax
//!
//! Patterns are relative, `/`-separated globs:
//!
//! - `*` matches any sequence of characters within a single path component
//! - `**` matches any sequence of path components (recursive matching)
//! - `?` matches any single character
//! - `[abc]` / `[a-z]` match a character set or range
//!
//! A pattern without any of these metacharacters is an *exact* path.
//!
//! # Matching Rules
//!
//! - Only files ending in `.yaml` or `.yml` survive; every other match is
//!   silently discarded.
//! - Directories matched by a glob are skipped. An exact path that names a
//!   directory is an error ([`RenderError::PathIsDirectory`]).
//! - Zero surviving files is an error ([`RenderError::NoFilesMatched`]) so a
//!   typo in a pattern never looks like an intentionally empty source.
//! - Results are sorted lexicographically by full path, independent of the
//!   filesystem's enumeration order.
//!
//! # Examples
//!
//! ```rust,no_run
//! use manifest_render::pattern::SourceMatcher;
//! use manifest_render::source::MemoryFs;
//!
//! # fn example() -> manifest_render::core::Result<()> {
//! let fs = MemoryFs::new()
//!     .with_file("b.yml", "kind: B")
//!     .with_file("a.yaml", "kind: A")
//!     .with_file("notes.txt", "ignored");
//!
//! let matcher = SourceMatcher::new("*")?;
//! assert_eq!(matcher.find_matches(&fs)?, vec!["a.yaml", "b.yml"]);
//! # Ok(())
//! # }
//! ```

use crate::core::{RenderError, Result};
use crate::source::{EntryKind, SourceFs};
use glob::Pattern;
use std::path::{Component, Path};
use tracing::{debug, trace};

/// File extensions recognized as manifest documents.
pub const RECOGNIZED_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Whether `path` ends in one of the [`RECOGNIZED_EXTENSIONS`].
pub fn has_recognized_extension(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| RECOGNIZED_EXTENSIONS.contains(&ext))
}

/// Whether `pattern` contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Compiled source pattern.
///
/// `SourceMatcher` is cheap to clone and holds no filesystem state, so one
/// instance can be reused against any number of filesystems.
#[derive(Debug, Clone)]
pub struct SourceMatcher {
    pattern: Pattern,
    original_pattern: String,
    exact: bool,
}

impl SourceMatcher {
    /// Compile a pattern.
    ///
    /// Leading `./` is ignored and surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidPattern`] if the pattern escapes the
    /// filesystem root or is not valid glob syntax.
    pub fn new(pattern_str: &str) -> Result<Self> {
        let trimmed = pattern_str.trim();
        let normalized = trimmed.strip_prefix("./").unwrap_or(trimmed);
        validate_pattern_safety(normalized)?;

        let pattern = Pattern::new(normalized).map_err(|e| RenderError::InvalidPattern {
            pattern: pattern_str.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pattern,
            original_pattern: pattern_str.to_string(),
            exact: !is_glob(normalized),
        })
    }

    /// The pattern as it was passed to [`SourceMatcher::new`].
    pub fn pattern(&self) -> &str {
        &self.original_pattern
    }

    /// Whether the pattern names a single exact path.
    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Check a single path against the pattern without touching a filesystem.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches_with(path, crate::source::fs::MATCH_OPTIONS)
    }

    /// Resolve the pattern against `fs`.
    ///
    /// # Returns
    ///
    /// The matching document files, sorted lexicographically and deduplicated.
    ///
    /// # Errors
    ///
    /// - [`RenderError::PathIsDirectory`] for an exact path naming a directory
    /// - [`RenderError::NoFilesMatched`] if nothing survives filtering
    /// - [`RenderError::ReadFailed`] if the filesystem cannot be enumerated
    pub fn find_matches(&self, fs: &dyn SourceFs) -> Result<Vec<String>> {
        debug!(target: "pattern", "Searching for pattern '{}'", self.original_pattern);

        if self.exact {
            return self.find_exact(fs);
        }

        let entries = fs.glob(&self.pattern).map_err(|source| RenderError::ReadFailed {
            path: self.original_pattern.clone(),
            source,
        })?;

        let mut matches: Vec<String> = entries
            .into_iter()
            .filter(|entry| {
                if entry.kind == EntryKind::Dir {
                    trace!(target: "pattern", "Skipping directory {}", entry.path);
                    return false;
                }
                if !has_recognized_extension(&entry.path) {
                    trace!(target: "pattern", "Skipping non-YAML file {}", entry.path);
                    return false;
                }
                true
            })
            .map(|entry| entry.path)
            .collect();

        matches.sort();
        matches.dedup();

        if matches.is_empty() {
            return Err(self.no_match());
        }

        debug!(
            target: "pattern",
            "Found {} matches for pattern '{}'",
            matches.len(),
            self.original_pattern
        );
        Ok(matches)
    }

    fn find_exact(&self, fs: &dyn SourceFs) -> Result<Vec<String>> {
        let path = self.pattern.as_str();
        let kind = fs.entry(path).map_err(|source| RenderError::ReadFailed {
            path: path.to_string(),
            source,
        })?;

        match kind {
            Some(EntryKind::Dir) => Err(RenderError::PathIsDirectory {
                path: path.to_string(),
            }),
            Some(EntryKind::File) if has_recognized_extension(path) => Ok(vec![path.to_string()]),
            _ => Err(self.no_match()),
        }
    }

    fn no_match(&self) -> RenderError {
        RenderError::NoFilesMatched {
            pattern: self.original_pattern.clone(),
        }
    }
}

/// Resolve `pattern` against `fs` in one call.
///
/// Shorthand for [`SourceMatcher::new`] followed by
/// [`SourceMatcher::find_matches`].
pub fn match_source(fs: &dyn SourceFs, pattern: &str) -> Result<Vec<String>> {
    SourceMatcher::new(pattern)?.find_matches(fs)
}

/// Validate that a pattern cannot reach outside the filesystem root.
///
/// # Errors
///
/// Returns [`RenderError::InvalidPattern`] if the pattern contains a `..`
/// component or is absolute (`/etc/*`, `C:\...`, `\\server\share`).
pub fn validate_pattern_safety(pattern: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(RenderError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        })
    };

    if pattern.split(['/', '\\']).any(|segment| segment == "..") {
        return reject("pattern contains path traversal (..)");
    }

    let absolute = Path::new(pattern)
        .components()
        .next()
        .is_some_and(|c| matches!(c, Component::RootDir | Component::Prefix(_)));
    if absolute || pattern.starts_with('/') || pattern.starts_with('\\') {
        return reject("pattern must be relative to the source root");
    }

    Ok(())
}
