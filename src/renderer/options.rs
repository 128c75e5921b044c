//! Renderer configuration.

use super::DecodedFile;
use crate::cache::{CacheKeyFunc, CacheOptions, KeyedCache, RenderCache};
use crate::pipeline::{Filter, Transformer};
use std::fmt;

/// Options applied to every source of a [`YamlRenderer`](super::YamlRenderer).
///
/// Built with chained `with_*` calls:
///
/// ```rust,no_run
/// use manifest_render::cache::CacheOptions;
/// use manifest_render::pipeline::filters;
/// use manifest_render::renderer::RendererOptions;
///
/// let options = RendererOptions::new()
///     .with_filter(filters::by_kind(["Deployment"]))
///     .with_cache(CacheOptions::default())
///     .with_source_annotations(true);
/// ```
#[derive(Clone, Default)]
pub struct RendererOptions {
    /// Predicates a document must all satisfy to be kept
    pub filters: Vec<Filter>,
    /// Applied in order to every kept document
    pub transformers: Vec<Transformer>,
    /// Caching policy; [`RenderCache::PassThrough`] unless configured
    pub cache: RenderCache<Vec<DecodedFile>>,
    /// Stamp provenance annotations on decoded documents
    pub source_annotations: bool,
    /// How cache keys are derived from a source
    pub cache_key_func: CacheKeyFunc,
}

impl RendererOptions {
    /// Options with no filters, no transformers, no cache and no annotations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Append filters, keeping their order.
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Append a transformer. Transformers run in the order they are added.
    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformers.push(transformer);
        self
    }

    /// Append transformers, keeping their order.
    pub fn with_transformers(mut self, transformers: impl IntoIterator<Item = Transformer>) -> Self {
        self.transformers.extend(transformers);
        self
    }

    /// Enable caching with a cache owned by this renderer.
    pub fn with_cache(mut self, options: CacheOptions) -> Self {
        self.cache = RenderCache::Keyed(KeyedCache::new(options));
        self
    }

    /// Enable caching through a cache shared with other renderers.
    ///
    /// The cache holds decoded documents before stamping, so renderers with
    /// different [`source_annotations`](Self::source_annotations) settings can
    /// share it.
    pub fn with_shared_cache(mut self, cache: KeyedCache<Vec<DecodedFile>>) -> Self {
        self.cache = RenderCache::Keyed(cache);
        self
    }

    /// Turn provenance annotations on or off.
    pub fn with_source_annotations(mut self, enabled: bool) -> Self {
        self.source_annotations = enabled;
        self
    }

    /// Replace the cache key derivation.
    pub fn with_cache_key_func(mut self, key_func: CacheKeyFunc) -> Self {
        self.cache_key_func = key_func;
        self
    }
}

impl fmt::Debug for RendererOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererOptions")
            .field("filters", &self.filters.len())
            .field("transformers", &self.transformers.len())
            .field("cache", &self.cache)
            .field("source_annotations", &self.source_annotations)
            .field("cache_key_func", &self.cache_key_func)
            .finish()
    }
}
