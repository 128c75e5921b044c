//! Cache behavior observed through a renderer: single flight, isolation of
//! returned values, expiry, sharing and cancellation.

use crate::common::TestProject;
use anyhow::Result;
use manifest_render::annotations::{SOURCE_FILE, SOURCE_TYPE};
use manifest_render::cache::{CacheKeyFunc, CacheOptions, DEFAULT_TTL, KeyedCache};
use manifest_render::core::{Document, RenderError};
use manifest_render::pipeline::transformers;
use manifest_render::renderer::{RendererOptions, YamlRenderer};
use manifest_render::source::{DirFs, MemoryFs, Source};
use manifest_render::test_utils::{CountingFs, manifest};
use std::sync::Arc;
use std::time::Duration;

fn memory_fixture() -> MemoryFs {
    MemoryFs::new()
        .with_file("m/a.yaml", manifest("v1", "ConfigMap", "a", Some("prod")))
        .with_file("m/b.yaml", manifest("v1", "Secret", "b", Some("prod")))
}

fn cached(fs: CountingFs, options: RendererOptions) -> Result<YamlRenderer> {
    Ok(YamlRenderer::new(vec![Source::new(fs, "m/*.yaml")], options)?)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_renders_share_one_load() -> Result<()> {
    manifest_render::test_utils::init_test_logging(None);

    let fs = CountingFs::new(memory_fixture()).with_read_delay(Duration::from_millis(50));
    let renderer =
        Arc::new(cached(fs.clone(), RendererOptions::new().with_cache(CacheOptions::default()))?);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let renderer = Arc::clone(&renderer);
        handles.push(tokio::spawn(async move { renderer.render().await }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await??);
    }

    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(results[0].len(), 2);
    assert_eq!(fs.globs(), 1);
    assert_eq!(fs.reads(), 2);

    let cache = renderer.cache().keyed().map(KeyedCache::stats);
    assert_eq!(cache.map(|s| s.computations), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_without_cache_every_render_loads() -> Result<()> {
    let fs = CountingFs::new(memory_fixture());
    let renderer = cached(fs.clone(), RendererOptions::new())?;

    renderer.render().await?;
    renderer.render().await?;
    assert_eq!(fs.globs(), 2);
    assert_eq!(fs.reads(), 4);
    Ok(())
}

#[tokio::test]
async fn test_returned_documents_are_isolated_from_the_cache() -> Result<()> {
    let fs = CountingFs::new(memory_fixture());
    let cache = KeyedCache::new(CacheOptions::default());

    let labelling = cached(
        fs.clone(),
        RendererOptions::new()
            .with_shared_cache(cache.clone())
            .with_transformer(transformers::set_label("touched", "yes")),
    )?;
    let plain = cached(fs.clone(), RendererOptions::new().with_shared_cache(cache.clone()))?;

    let mut first = labelling.render().await?;
    first[0].set_namespace("mutated");
    first.clear();

    let second = plain.render().await?;
    assert_eq!(second[0].namespace(), "prod");
    assert!(second.iter().all(|d: &Document| d.label("touched").is_none()));
    assert_eq!(fs.reads(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_entries_expire_after_ttl() -> Result<()> {
    let project = TestProject::new().await?;
    project.write("m/cm.yaml", &manifest("v1", "ConfigMap", "before", None)).await?;

    let fs = CountingFs::new(DirFs::new(project.root()));
    let renderer = cached(fs.clone(), RendererOptions::new().with_cache(CacheOptions::default()))?;

    assert_eq!(renderer.render().await?[0].name(), "before");
    project.write("m/cm.yaml", &manifest("v1", "ConfigMap", "after", None)).await?;

    tokio::time::advance(DEFAULT_TTL - Duration::from_secs(1)).await;
    assert_eq!(renderer.render().await?[0].name(), "before");
    assert_eq!(fs.reads(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(renderer.render().await?[0].name(), "after");
    assert_eq!(fs.reads(), 2);
    Ok(())
}

#[tokio::test]
async fn test_failures_are_not_cached() -> Result<()> {
    let project = TestProject::new().await?;
    project.mkdir("m").await?;

    let renderer = YamlRenderer::new(
        vec![Source::new(DirFs::new(project.root()), "m/*.yaml")],
        RendererOptions::new().with_cache(CacheOptions::default()),
    )?;

    let err = renderer.render().await.unwrap_err();
    assert!(matches!(err.root_cause(), RenderError::NoFilesMatched { .. }));
    assert!(renderer.cache().keyed().is_some_and(KeyedCache::is_empty));

    project.write("m/cm.yaml", &manifest("v1", "ConfigMap", "late", None)).await?;
    assert_eq!(renderer.render().await?[0].name(), "late");
    Ok(())
}

#[tokio::test]
async fn test_shared_cache_key_strategies() -> Result<()> {
    let fs = CountingFs::new(memory_fixture());
    let cache = KeyedCache::new(CacheOptions::default());

    let a = cached(fs.clone(), RendererOptions::new().with_shared_cache(cache.clone()))?;
    let b = cached(fs.clone(), RendererOptions::new().with_shared_cache(cache.clone()))?;
    a.render().await?;
    b.render().await?;
    assert_eq!(cache.stats().computations, 1);

    let tenant = cached(
        fs.clone(),
        RendererOptions::new()
            .with_shared_cache(cache.clone())
            .with_cache_key_func(CacheKeyFunc::custom(|spec| format!("tenant-b/{}", spec.path))),
    )?;
    tenant.render().await?;
    assert_eq!(cache.stats().computations, 2);
    assert_eq!(cache.len(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abandoned_render_does_not_cancel_the_load() -> Result<()> {
    let fs = CountingFs::new(memory_fixture()).with_read_delay(Duration::from_millis(150));
    let renderer = cached(fs.clone(), RendererOptions::new().with_cache(CacheOptions::default()))?;

    let abandoned = tokio::time::timeout(Duration::from_millis(20), renderer.render()).await;
    assert!(abandoned.is_err());

    let documents = renderer.render().await?;
    assert_eq!(documents.len(), 2);
    assert_eq!(fs.globs(), 1);

    let stats = renderer.cache().keyed().map(KeyedCache::stats);
    assert_eq!(stats.map(|s| s.computations), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_sources_differing_only_by_root_get_separate_entries() -> Result<()> {
    let project = TestProject::new().await?;
    project.write("a/app.yaml", &manifest("v1", "ConfigMap", "from-a", None)).await?;
    project.write("b/app.yaml", &manifest("v1", "ConfigMap", "from-b", None)).await?;

    let renderer = YamlRenderer::new(
        vec![
            Source::new(DirFs::new(project.root().join("a")), "*.yaml"),
            Source::new(DirFs::new(project.root().join("b")), "*.yaml"),
        ],
        RendererOptions::new().with_cache(CacheOptions::default()),
    )?;

    for _ in 0..2 {
        let names: Vec<_> = renderer.render().await?.iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, ["from-a", "from-b"]);
    }
    assert_eq!(renderer.cache().keyed().map(KeyedCache::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn test_annotation_setting_is_not_leaked_through_a_shared_cache() -> Result<()> {
    let fs = CountingFs::new(memory_fixture());
    let cache = KeyedCache::new(CacheOptions::default());

    let stamping = cached(
        fs.clone(),
        RendererOptions::new().with_shared_cache(cache.clone()).with_source_annotations(true),
    )?;
    let plain = cached(fs.clone(), RendererOptions::new().with_shared_cache(cache.clone()))?;

    let stamped = stamping.render().await?;
    assert!(stamped.iter().all(|d| d.annotation(SOURCE_FILE).is_some()));

    let unstamped = plain.render().await?;
    assert!(unstamped.iter().all(|d| d.annotation(SOURCE_FILE).is_none()));
    assert!(unstamped.iter().all(|d| d.annotation(SOURCE_TYPE).is_none()));

    assert_eq!(fs.reads(), 2);
    assert_eq!(cache.stats().computations, 1);
    Ok(())
}
