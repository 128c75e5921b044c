//! Read-only filesystem abstraction consumed by sources.
//!
//! A [`SourceFs`] exposes three capabilities: enumerate entries, report the
//! kind of a single entry, and read a file by path. Paths are always relative
//! to the filesystem root and use `/` as the separator, regardless of
//! platform.
//!
//! Two implementations ship with the crate:
//! - [`DirFs`] - a directory on disk, traversed with `walkdir`
//! - [`MemoryFs`] - an in-memory map, handy for embedded bundles and tests
//!
//! Any other conforming implementation is interchangeable with these.

use glob::{MatchOptions, Pattern};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;
use walkdir::WalkDir;

/// Options used for every glob evaluation: `*` never crosses a `/`.
pub const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file (or anything readable as one)
    File,
    /// Directory
    Dir,
}

/// One enumerated entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    /// Root-relative, `/`-separated path
    pub path: String,
    /// Entry kind
    pub kind: EntryKind,
}

impl FsEntry {
    /// Create an entry.
    pub fn new(path: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Read-only tree abstraction.
///
/// Implementations must be safe to use from several threads at once; the
/// render pipeline never writes through this trait.
pub trait SourceFs: Send + Sync + fmt::Debug {
    /// Identity of the tree this filesystem serves.
    ///
    /// Part of every source's cache key: two filesystems may only return the
    /// same id if reading the same path from either yields the same bytes.
    fn id(&self) -> String;

    /// Enumerate every entry below the root, in any order.
    fn walk(&self) -> io::Result<Vec<FsEntry>>;

    /// Report the kind of a single entry, or `None` if it does not exist.
    fn entry(&self, path: &str) -> io::Result<Option<EntryKind>>;

    /// Read the full contents of a file.
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Enumerate the entries whose path matches `pattern`.
    ///
    /// The default implementation filters [`walk`](SourceFs::walk);
    /// implementations may override it to prune the traversal.
    fn glob(&self, pattern: &Pattern) -> io::Result<Vec<FsEntry>> {
        Ok(self
            .walk()?
            .into_iter()
            .filter(|entry| pattern.matches_with(&entry.path, MATCH_OPTIONS))
            .collect())
    }
}

/// Reject paths that would escape the filesystem root.
fn check_relative(path: &str) -> io::Result<()> {
    let escapes = Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path escapes filesystem root: {path}"),
        ));
    }
    Ok(())
}

/// A directory on disk.
///
/// Symbolic links are never followed. Walks skip them and exact lookups
/// through a linked component fail, so nothing outside the root can be read.
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    /// Create a filesystem rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `path` onto the root, refusing components that are symlinks.
    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        check_relative(path)?;
        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            resolved.push(component);
            match std::fs::symlink_metadata(&resolved) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("path crosses a symbolic link: {path}"),
                    ));
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => break,
                Err(e) => return Err(e),
            }
        }
        Ok(self.root.join(path))
    }

    fn walk_to_depth(&self, max_depth: Option<usize>) -> io::Result<Vec<FsEntry>> {
        let mut walker = WalkDir::new(&self.root).min_depth(1).follow_links(false);
        if let Some(depth) = max_depth {
            walker = walker.max_depth(depth);
        }

        let mut entries = Vec::new();
        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            if entry.path_is_symlink() {
                trace!(target: "fs", "Skipping symlink {}", entry.path().display());
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let kind = if entry.file_type().is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            trace!(target: "fs", "Walked {}", path);
            entries.push(FsEntry::new(path, kind));
        }
        Ok(entries)
    }
}

impl SourceFs for DirFs {
    fn id(&self) -> String {
        let root = std::fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        format!("dir:{}", root.display())
    }

    fn walk(&self) -> io::Result<Vec<FsEntry>> {
        self.walk_to_depth(None)
    }

    fn entry(&self, path: &str) -> io::Result<Option<EntryKind>> {
        match std::fs::metadata(self.resolve(path)?) {
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Dir)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path)?)
    }

    fn glob(&self, pattern: &Pattern) -> io::Result<Vec<FsEntry>> {
        // Without a recursive wildcard a match can be no deeper than the
        // pattern has components.
        let raw = pattern.as_str();
        let max_depth = (!raw.contains("**")).then(|| raw.split('/').count());
        Ok(self
            .walk_to_depth(max_depth)?
            .into_iter()
            .filter(|entry| pattern.matches_with(&entry.path, MATCH_OPTIONS))
            .collect())
    }
}

static NEXT_MEMORY_FS_ID: AtomicU64 = AtomicU64::new(1);

fn next_memory_fs_id() -> u64 {
    NEXT_MEMORY_FS_ID.fetch_add(1, Ordering::Relaxed)
}

/// An in-memory filesystem.
///
/// Directories are implied by file paths; empty directories can be added
/// explicitly with [`with_dir`](MemoryFs::with_dir).
///
/// Each instance has its own [`id`](SourceFs::id). Clones keep the id until
/// one of them is modified, which assigns it a fresh one.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    id: u64,
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self {
            id: next_memory_fs_id(),
            files: BTreeMap::new(),
            dirs: BTreeSet::new(),
        }
    }
}

impl MemoryFs {
    /// Create an empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file.
    pub fn with_file(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert_file(path, data);
        self
    }

    /// Add an empty directory.
    pub fn with_dir(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.id = next_memory_fs_id();
        self.register_parents(&path);
        self.dirs.insert(path);
        self
    }

    /// Add (or replace) a file in place.
    pub fn insert_file(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        let path = path.into();
        self.id = next_memory_fs_id();
        self.register_parents(&path);
        self.files.insert(path, data.into());
    }

    fn register_parents(&mut self, path: &str) {
        let mut current = path;
        while let Some((parent, _)) = current.rsplit_once('/') {
            self.dirs.insert(parent.to_string());
            current = parent;
        }
    }
}

impl SourceFs for MemoryFs {
    fn id(&self) -> String {
        format!("memory:{}", self.id)
    }

    fn walk(&self) -> io::Result<Vec<FsEntry>> {
        let dirs = self.dirs.iter().map(|d| FsEntry::new(d.clone(), EntryKind::Dir));
        let files = self.files.keys().map(|f| FsEntry::new(f.clone(), EntryKind::File));
        Ok(dirs.chain(files).collect())
    }

    fn entry(&self, path: &str) -> io::Result<Option<EntryKind>> {
        if self.files.contains_key(path) {
            Ok(Some(EntryKind::File))
        } else if self.dirs.contains(path) {
            Ok(Some(EntryKind::Dir))
        } else {
            Ok(None)
        }
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        if self.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: {path}"),
            ));
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such file: {path}")))
    }
}
