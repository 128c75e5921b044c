//! File-based renderer configuration.
//!
//! A [`RenderConfig`] is the TOML equivalent of building [`Source`]s and
//! [`RendererOptions`] by hand. It is what the command-line front end reads
//! with `--config`.
//!
//! # File Format
//!
//! ```toml
//! annotate = true
//!
//! [cache]
//! enabled = true
//! ttl_secs = 300
//! key = "structural-hash"   # or "path-only"
//!
//! [[sources]]
//! root = "deploy"           # relative to this file's directory
//! path = "base/**/*.yaml"
//!
//! [[sources]]
//! root = "deploy"
//! path = "overlays/prod/*.yml"
//!
//! [filters]
//! kinds = ["Deployment", "Service", "ConfigMap"]
//! namespaces = ["prod"]
//! exclude_names = ["scratch"]
//!
//! [transform]
//! namespace = "prod"
//! labels = { team = "platform" }
//! annotations = { "example.com/owner" = "infra" }
//! drop_kinds = ["Secret"]
//! ```
//!
//! Every table is optional. Filters listed under `[filters]` are combined
//! with AND semantics; within a list, any entry matches. Transformers run in
//! the order `drop_kinds`, `namespace`, `labels`, `annotations`, with labels
//! and annotations applied in key order.

use crate::cache::{CacheKeyFunc, CacheOptions};
use crate::core::{RenderError, Result as RenderResult};
use crate::pipeline::{filters, transformers};
use crate::renderer::{RendererOptions, YamlRenderer};
use crate::source::{DirFs, Source};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Kinds left untouched by the namespace transformer unless overridden.
pub const DEFAULT_CLUSTER_KINDS: &[&str] = &[
    "Namespace",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "PersistentVolume",
    "StorageClass",
    "PriorityClass",
    "MutatingWebhookConfiguration",
    "ValidatingWebhookConfiguration",
];

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Stamp provenance annotations on every document
    #[serde(default)]
    pub annotate: bool,

    /// Cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Sources, rendered in the order listed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceConfig>,

    /// Declarative filters
    #[serde(default)]
    pub filters: FilterConfig,

    /// Declarative transformers
    #[serde(default)]
    pub transform: TransformConfig,
}

/// `[cache]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Whether decoded sources are memoized
    #[serde(default)]
    pub enabled: bool,

    /// Entry lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Key derivation strategy
    #[serde(default)]
    pub key: KeyStrategy,
}

fn default_ttl_secs() -> u64 {
    crate::cache::DEFAULT_TTL.as_secs()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: default_ttl_secs(),
            key: KeyStrategy::default(),
        }
    }
}

/// Cache key strategies selectable from a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStrategy {
    /// [`CacheKeyFunc::StructuralHash`]
    #[default]
    StructuralHash,
    /// [`CacheKeyFunc::PathOnly`]
    PathOnly,
}

impl From<KeyStrategy> for CacheKeyFunc {
    fn from(strategy: KeyStrategy) -> Self {
        match strategy {
            KeyStrategy::StructuralHash => Self::StructuralHash,
            KeyStrategy::PathOnly => Self::PathOnly,
        }
    }
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Directory the pattern is evaluated against
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Glob pattern relative to `root`
    pub path: String,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// `[filters]` table. Empty lists add no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Keep only these kinds
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<String>,

    /// Keep only these namespaces (`""` selects cluster-scoped documents)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,

    /// Drop documents with these names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_names: Vec<String>,
}

/// `[transform]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformConfig {
    /// Namespace forced onto namespaced documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Kinds the namespace is not applied to
    #[serde(default = "default_cluster_kinds")]
    pub cluster_kinds: Vec<String>,

    /// Labels set on every document
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Annotations set on every document
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Kinds removed from the output
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drop_kinds: Vec<String>,
}

fn default_cluster_kinds() -> Vec<String> {
    DEFAULT_CLUSTER_KINDS.iter().map(|k| (*k).to_string()).collect()
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            cluster_kinds: default_cluster_kinds(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            drop_kinds: Vec::new(),
        }
    }
}

impl RenderConfig {
    /// Load a configuration file.
    ///
    /// Relative source roots are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// does not match the expected schema.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let config = Self::parse(&content, base)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        debug!(target: "config", "Loaded {} source(s) from {}", config.sources.len(), path.display());
        Ok(config)
    }

    /// Parse TOML text, resolving relative roots against `base`.
    pub fn parse(content: &str, base: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        for source in &mut config.sources {
            if source.root.is_relative() {
                source.root = base.join(&source.root);
            }
        }
        Ok(config)
    }

    /// Append a source.
    pub fn add_source(&mut self, root: impl Into<PathBuf>, path: impl Into<String>) {
        self.sources.push(SourceConfig {
            root: root.into(),
            path: path.into(),
        });
    }

    /// Build the sources, one [`DirFs`] per entry.
    pub fn sources(&self) -> Vec<Source> {
        self.sources.iter().map(|s| Source::new(DirFs::new(&s.root), s.path.clone())).collect()
    }

    /// Build the renderer options.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Config`] if caching is enabled with a zero TTL,
    /// or with the `path-only` key while sources use more than one root.
    pub fn options(&self) -> RenderResult<RendererOptions> {
        let mut options = RendererOptions::new()
            .with_source_annotations(self.annotate)
            .with_cache_key_func(self.cache.key.into());

        if self.cache.enabled {
            if self.cache.ttl_secs == 0 {
                return Err(RenderError::Config {
                    message: "cache.ttl_secs must be greater than zero".to_string(),
                });
            }
            if self.cache.key == KeyStrategy::PathOnly
                && self.sources.iter().any(|s| s.root != self.sources[0].root)
            {
                return Err(RenderError::Config {
                    message: "cache.key = \"path-only\" requires every source to share one root"
                        .to_string(),
                });
            }
            options = options.with_cache(CacheOptions::with_ttl(Duration::from_secs(self.cache.ttl_secs)));
        }

        let f = &self.filters;
        if !f.kinds.is_empty() {
            options = options.with_filter(filters::by_kind(f.kinds.clone()));
        }
        if !f.namespaces.is_empty() {
            options = options.with_filter(filters::by_namespace(f.namespaces.clone()));
        }
        options = options.with_filters(f.exclude_names.iter().map(filters::exclude_name));

        let t = &self.transform;
        options = options.with_transformers(t.drop_kinds.iter().map(transformers::drop_kind));
        if let Some(namespace) = &t.namespace {
            options = options
                .with_transformer(transformers::set_namespace(namespace, t.cluster_kinds.clone()));
        }
        options = options.with_transformers(t.labels.iter().map(|(k, v)| transformers::set_label(k, v)));
        options = options
            .with_transformers(t.annotations.iter().map(|(k, v)| transformers::set_annotation(k, v)));

        Ok(options)
    }

    /// Build a renderer from this configuration.
    ///
    /// # Errors
    ///
    /// Any error from [`RenderConfig::options`] or [`YamlRenderer::new`].
    pub fn into_renderer(self) -> RenderResult<YamlRenderer> {
        let options = self.options()?;
        YamlRenderer::new(self.sources(), options)
    }
}
