//! Renderers turn configured sources into a flat list of documents.
//!
//! # Render Flow
//!
//! For each source, in configuration order:
//!
//! 1. Derive the cache key from the source's [`SourceSpec`](crate::source::SourceSpec)
//!    (only when caching is enabled).
//! 2. Load through the cache: glob the filesystem, read every match in sorted
//!    order and decode each file into documents. Loading runs on the blocking
//!    thread pool.
//! 3. Optionally stamp provenance annotations on an isolated copy of the
//!    cached documents. The cache never holds stamped documents, so renderers
//!    sharing a cache may disagree on stamping.
//! 4. Run the filter/transformer pipeline. The pipeline is never cached; it
//!    runs on every call.
//! 5. Append the result.
//!
//! The first failing source aborts the render; no partial output is returned.
//!
//! # Cancellation
//!
//! Dropping the future returned by [`YamlRenderer::render`] stops the render.
//! A cache computation already registered for a source keeps its slot and is
//! finished by the next caller that asks for the same key.

mod options;

pub use options::RendererOptions;

use crate::annotations;
use crate::cache::{CacheKeyFunc, RenderCache};
use crate::core::{Document, RenderError, Result};
use crate::decoder;
use crate::pattern::SourceMatcher;
use crate::pipeline::{self, Filter, Transformer};
use crate::source::{Source, SourceFs};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Renderer kind recorded in the `source.type` annotation.
pub const YAML_RENDERER_KIND: &str = "yaml";

/// A producer of documents.
pub trait Renderer: Send + Sync {
    /// Short identifier of the renderer, e.g. `yaml`.
    fn kind(&self) -> &'static str;

    /// Produce the documents for every configured source.
    fn render(&self) -> impl Future<Output = Result<Vec<Document>>> + Send;
}

/// Renders YAML documents from glob-matched files.
///
/// # Examples
///
/// ```rust,no_run
/// use manifest_render::renderer::{Renderer, RendererOptions, YamlRenderer};
/// use manifest_render::source::{DirFs, Source};
///
/// # async fn example() -> manifest_render::core::Result<()> {
/// let renderer = YamlRenderer::new(
///     vec![Source::new(DirFs::new("deploy"), "base/*.yaml")],
///     RendererOptions::new().with_source_annotations(true),
/// )?;
/// let documents = renderer.render().await?;
/// # Ok(())
/// # }
/// ```
pub struct YamlRenderer {
    sources: Vec<CompiledSource>,
    filters: Vec<Filter>,
    transformers: Vec<Transformer>,
    cache: RenderCache<Vec<DecodedFile>>,
    cache_key_func: CacheKeyFunc,
    source_annotations: bool,
}

#[derive(Debug)]
struct CompiledSource {
    source: Source,
    fs: Arc<dyn SourceFs>,
    matcher: SourceMatcher,
}

impl YamlRenderer {
    /// Validate `sources` and build a renderer.
    ///
    /// # Errors
    ///
    /// - [`RenderError::NoSources`] if `sources` is empty
    /// - the first source's validation error otherwise, see [`Source::validate`]
    pub fn new(sources: Vec<Source>, options: RendererOptions) -> Result<Self> {
        if sources.is_empty() {
            return Err(RenderError::NoSources);
        }

        let mut compiled = Vec::with_capacity(sources.len());
        for (index, source) in sources.into_iter().enumerate() {
            source.validate(index)?;
            let fs = source.fs.clone().ok_or(RenderError::FilesystemRequired {
                index,
            })?;
            let matcher = SourceMatcher::new(&source.path)?;
            compiled.push(CompiledSource {
                source,
                fs,
                matcher,
            });
        }

        debug!(
            target: "renderer",
            "Configured {} source(s), {} filter(s), {} transformer(s), cache: {:?}",
            compiled.len(),
            options.filters.len(),
            options.transformers.len(),
            options.cache
        );

        Ok(Self {
            sources: compiled,
            filters: options.filters,
            transformers: options.transformers,
            cache: options.cache,
            cache_key_func: options.cache_key_func,
            source_annotations: options.source_annotations,
        })
    }

    /// The configured sources, in render order.
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().map(|s| &s.source)
    }

    /// The renderer's cache policy.
    pub fn cache(&self) -> &RenderCache<Vec<DecodedFile>> {
        &self.cache
    }

    /// Render every source and concatenate the results.
    ///
    /// # Errors
    ///
    /// Returns the first failure wrapped in [`RenderError::Source`], which
    /// names the source's index and pattern.
    pub async fn render(&self) -> Result<Vec<Document>> {
        let mut rendered = Vec::new();

        for (index, compiled) in self.sources.iter().enumerate() {
            let pattern = compiled.source.path.as_str();
            let documents = self
                .render_source(compiled)
                .await
                .map_err(|e| e.in_source(index, pattern))?;

            debug!(target: "renderer", "Source #{} ('{}') produced {} document(s)", index, pattern, documents.len());
            rendered.extend(documents);
        }

        info!(target: "renderer", "Rendered {} document(s) from {} source(s)", rendered.len(), self.sources.len());
        Ok(rendered)
    }

    async fn render_source(&self, compiled: &CompiledSource) -> Result<Vec<Document>> {
        let fs = Arc::clone(&compiled.fs);
        let matcher = compiled.matcher.clone();

        let files = self
            .cache
            .get_or_compute(
                || self.cache_key_func.key(&compiled.source.spec()),
                move || async move {
                    tokio::task::spawn_blocking(move || load_documents(fs.as_ref(), &matcher))
                        .await
                        .map_err(|e| RenderError::TaskFailed {
                            reason: e.to_string(),
                        })?
                },
            )
            .await?;

        let documents = flatten(files, self.source_annotations.then_some(YAML_RENDERER_KIND));
        pipeline::apply(documents, &self.filters, &self.transformers)
    }
}

impl fmt::Debug for YamlRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YamlRenderer")
            .field("sources", &self.sources)
            .field("filters", &self.filters.len())
            .field("transformers", &self.transformers.len())
            .field("cache", &self.cache)
            .field("cache_key_func", &self.cache_key_func)
            .field("source_annotations", &self.source_annotations)
            .finish()
    }
}

impl Renderer for YamlRenderer {
    fn kind(&self) -> &'static str {
        YAML_RENDERER_KIND
    }

    fn render(&self) -> impl Future<Output = Result<Vec<Document>>> + Send {
        YamlRenderer::render(self)
    }
}

/// Documents decoded from one matched file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFile {
    /// Root-relative path of the file
    pub path: String,
    /// Documents in file order
    pub documents: Vec<Document>,
}

/// Match, read and decode every file selected by `matcher`.
///
/// Files are returned in lexicographic path order and documents keep their
/// in-file order.
///
/// # Errors
///
/// - matching errors from [`SourceMatcher::find_matches`]
/// - [`RenderError::ReadFailed`] if a matched file cannot be read
/// - [`RenderError::Decode`] for the first malformed segment
pub fn load_documents(fs: &dyn SourceFs, matcher: &SourceMatcher) -> Result<Vec<DecodedFile>> {
    let paths = matcher.find_matches(fs)?;
    debug!(target: "renderer", "Pattern '{}' matched {} file(s)", matcher.pattern(), paths.len());

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = fs.read(&path).map_err(|source| RenderError::ReadFailed {
            path: path.clone(),
            source,
        })?;

        let documents = decoder::decode_all(&path, &bytes)?;
        files.push(DecodedFile {
            path,
            documents,
        });
    }

    Ok(files)
}

/// Concatenate decoded files, stamping each document with its file when
/// `stamp_kind` names the renderer.
fn flatten(files: Vec<DecodedFile>, stamp_kind: Option<&str>) -> Vec<Document> {
    let mut documents = Vec::new();
    for file in files {
        match stamp_kind {
            Some(kind) => documents.extend(
                file.documents.into_iter().map(|d| annotations::stamp(d, &file.path, kind)),
            ),
            None => documents.extend(file.documents),
        }
    }
    documents
}
