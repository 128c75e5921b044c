//! Cache key derivation.
//!
//! A key is derived from a [`SourceSpec`]. Two sources producing the same key
//! share one cache entry.

use crate::source::SourceSpec;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Strategy turning a [`SourceSpec`] into a cache key.
#[derive(Clone, Default)]
pub enum CacheKeyFunc {
    /// SHA-256 over the JSON serialization of the whole spec. Picks up any
    /// field added to [`SourceSpec`] without code changes.
    #[default]
    StructuralHash,
    /// The pattern itself. Sources with the same pattern share an entry
    /// whatever filesystem they read, so only use it when every source
    /// sharing the cache reads one filesystem.
    PathOnly,
    /// Caller-supplied derivation.
    Custom(Arc<dyn Fn(&SourceSpec) -> String + Send + Sync>),
}

impl CacheKeyFunc {
    /// Wrap a closure as a [`CacheKeyFunc::Custom`].
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&SourceSpec) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Derive the key for `spec`.
    pub fn key(&self, spec: &SourceSpec) -> String {
        match self {
            Self::StructuralHash => structural_hash(spec),
            Self::PathOnly => spec.path.clone(),
            Self::Custom(f) => f(spec),
        }
    }
}

impl fmt::Debug for CacheKeyFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StructuralHash => f.write_str("StructuralHash"),
            Self::PathOnly => f.write_str("PathOnly"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// `sha256:<hex>` digest of the JSON form of a [`SourceSpec`].
///
/// Struct fields serialize in declaration order, so the digest is stable.
pub fn structural_hash(spec: &SourceSpec) -> String {
    // A struct of strings always serializes.
    let bytes = serde_json::to_vec(spec).unwrap_or_else(|_| format!("{spec:?}").into_bytes());

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
