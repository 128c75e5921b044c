//! Test utilities for manifest-render
//!
//! Helpers shared by unit tests and the integration suite:
//! - [`init_test_logging`] - once-only tracing setup with the test writer
//! - [`CountingFs`] - a [`SourceFs`] wrapper that counts calls and can slow
//!   reads down, used to observe cache hits and single-flight behavior
//! - [`manifest`] - builds a small YAML document for fixtures
//!
//! Only compiled for tests or with the `test-utils` feature.

use crate::source::{EntryKind, FsEntry, SourceFs};
use glob::Pattern;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` if given, otherwise `RUST_LOG`; with neither, logging stays
/// off. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=cache=trace cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// A [`SourceFs`] that counts how often it is used.
///
/// Clones share counters, so a test can keep one handle while the renderer
/// owns another.
#[derive(Debug, Clone)]
pub struct CountingFs {
    inner: Arc<dyn SourceFs>,
    globs: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
    read_delay: Duration,
}

impl CountingFs {
    /// Wrap `inner`.
    pub fn new(inner: impl SourceFs + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            globs: Arc::new(AtomicUsize::new(0)),
            reads: Arc::new(AtomicUsize::new(0)),
            read_delay: Duration::ZERO,
        }
    }

    /// Sleep this long in every [`read`](SourceFs::read).
    ///
    /// Reads happen on the blocking pool, so the delay widens the window in
    /// which concurrent renders overlap.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Number of directory enumerations (walks and globs).
    pub fn globs(&self) -> usize {
        self.globs.load(Ordering::SeqCst)
    }

    /// Number of file reads.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SourceFs for CountingFs {
    fn id(&self) -> String {
        self.inner.id()
    }

    fn walk(&self) -> io::Result<Vec<FsEntry>> {
        self.globs.fetch_add(1, Ordering::SeqCst);
        self.inner.walk()
    }

    fn entry(&self, path: &str) -> io::Result<Option<EntryKind>> {
        self.inner.entry(path)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.read_delay.is_zero() {
            std::thread::sleep(self.read_delay);
        }
        self.inner.read(path)
    }

    fn glob(&self, pattern: &Pattern) -> io::Result<Vec<FsEntry>> {
        self.globs.fetch_add(1, Ordering::SeqCst);
        self.inner.glob(pattern)
    }
}

/// A minimal namespaced or cluster-scoped manifest.
pub fn manifest(api_version: &str, kind: &str, name: &str, namespace: Option<&str>) -> String {
    let mut yaml = format!("apiVersion: {api_version}\nkind: {kind}\nmetadata:\n  name: {name}\n");
    if let Some(namespace) = namespace {
        yaml.push_str(&format!("  namespace: {namespace}\n"));
    }
    yaml
}
