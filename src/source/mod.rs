//! Document sources.
//!
//! A [`Source`] pairs a read-only filesystem with a glob pattern. Sources are
//! validated once, when the renderer is constructed, and are immutable
//! afterwards.
//!
//! # Components
//!
//! - [`Source`] - filesystem + pattern
//! - [`SourceSpec`] - the serializable part of a source, used to derive cache keys
//! - [`fs`] - the [`SourceFs`] contract and its disk and in-memory implementations

pub mod fs;

pub use fs::{DirFs, EntryKind, FsEntry, MemoryFs, SourceFs};

use crate::core::{RenderError, Result};
use crate::pattern::validate_pattern_safety;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The data a cache key is derived from.
///
/// Holds every field that influences the decoded output. Two sources with
/// the same spec are cache-equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Identity of the filesystem, see [`SourceFs::id`]
    pub fs: String,
    /// Glob pattern, relative to the filesystem root
    pub path: String,
}

/// A filesystem and a glob pattern identifying a batch of documents.
#[derive(Clone)]
pub struct Source {
    /// Filesystem the pattern is evaluated against
    pub fs: Option<Arc<dyn SourceFs>>,
    /// Glob pattern, e.g. `manifests/*.yaml`
    pub path: String,
}

impl Source {
    /// Create a source from a filesystem and a pattern.
    pub fn new(fs: impl SourceFs + 'static, path: impl Into<String>) -> Self {
        Self {
            fs: Some(Arc::new(fs)),
            path: path.into(),
        }
    }

    /// Create a source sharing an existing filesystem handle.
    pub fn with_shared_fs(fs: Arc<dyn SourceFs>, path: impl Into<String>) -> Self {
        Self {
            fs: Some(fs),
            path: path.into(),
        }
    }

    /// Check the source configuration.
    ///
    /// `index` is the source's position in the renderer configuration and is
    /// carried in the returned error.
    ///
    /// # Errors
    ///
    /// - [`RenderError::FilesystemRequired`] if no filesystem is attached
    /// - [`RenderError::PathEmpty`] if the pattern is empty or whitespace
    /// - [`RenderError::InvalidPattern`] if the pattern escapes the root or is not a valid glob
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.fs.is_none() {
            return Err(RenderError::FilesystemRequired {
                index,
            });
        }
        if self.path.trim().is_empty() {
            return Err(RenderError::PathEmpty {
                index,
            });
        }
        validate_pattern_safety(self.path.trim())?;
        glob::Pattern::new(self.path.trim()).map_err(|e| RenderError::InvalidPattern {
            pattern: self.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// The cache-relevant part of this source.
    pub fn spec(&self) -> SourceSpec {
        SourceSpec {
            fs: self.fs.as_ref().map(|fs| fs.id()).unwrap_or_default(),
            path: self.path.trim().to_string(),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source").field("fs", &self.fs).field("path", &self.path).finish()
    }
}
