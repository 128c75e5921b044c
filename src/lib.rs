//! manifest-render - render pipeline for declarative manifest documents
//!
//! Collects structured documents (Kubernetes-style manifests) from YAML files
//! selected by glob patterns, decodes multi-document files, optionally stamps
//! provenance annotations, runs a filter/transformer pipeline, and memoizes the
//! expensive load step in a keyed, single-flight, time-expiring cache.
//!
//! # Architecture Overview
//!
//! A [`renderer::YamlRenderer`] owns a list of [`source::Source`]s. Rendering
//! walks them in configuration order:
//!
//! ```text
//! Source ──► SourceMatcher ──► read ──► decode_all ──► stamp ─┐
//!                                                            │ (cached per key)
//!                         output ◄── append ◄── pipeline ◄───┘
//! ```
//!
//! Only the load step (matching, reading, decoding, stamping) is cached. The
//! pipeline runs on every call against an isolated copy of the cached
//! documents, so caller mutations never leak into the cache.
//!
//! # Core Modules
//!
//! ## Loading
//! - [`source`] - the read-only filesystem contract and source validation
//! - [`pattern`] - glob matching with a fixed `.yaml`/`.yml` extension policy
//! - [`decoder`] - multi-document YAML decoding
//! - [`annotations`] - provenance annotations
//!
//! ## Processing
//! - [`pipeline`] - filters and transformers, plus built-in implementations
//! - [`renderer`] - orchestration and the [`renderer::Renderer`] trait
//!
//! ## Caching
//! - [`cache`] - keyed TTL cache with single-flight computation and key strategies
//!
//! ## Supporting Modules
//! - [`core`] - [`core::Document`], error types and user-facing error context
//! - [`config`] - TOML configuration files
//! - [`cli`] - command-line front end
//!
//! # Example
//!
//! ```rust,no_run
//! use manifest_render::cache::CacheOptions;
//! use manifest_render::pipeline::filters;
//! use manifest_render::renderer::{RendererOptions, YamlRenderer};
//! use manifest_render::source::{DirFs, Source};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let renderer = YamlRenderer::new(
//!     vec![
//!         Source::new(DirFs::new("deploy"), "base/**/*.yaml"),
//!         Source::new(DirFs::new("deploy"), "overlays/prod/*.yml"),
//!     ],
//!     RendererOptions::new()
//!         .with_filter(filters::by_kind(["Deployment", "Service"]))
//!         .with_cache(CacheOptions::default())
//!         .with_source_annotations(true),
//! )?;
//!
//! for document in renderer.render().await? {
//!     println!("{document}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Render every YAML file under deploy/base
//! manifest-render --root deploy 'base/**/*.yaml'
//!
//! # Use a config file and emit JSON
//! manifest-render --config render.toml --format json
//! ```

pub mod annotations;
pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod decoder;
pub mod pattern;
pub mod pipeline;
pub mod renderer;
pub mod source;

// Test utilities (only compiled in test mode or with test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
