//! Filters, transformers and provenance annotations applied through a
//! renderer.

use crate::common::TestProject;
use anyhow::{Result, bail};
use manifest_render::annotations::{SOURCE_FILE, SOURCE_TYPE};
use manifest_render::core::{Document, RenderError};
use manifest_render::pipeline::{self, filters, transformers};
use manifest_render::renderer::{RendererOptions, YamlRenderer};
use manifest_render::test_utils::manifest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

async fn fixture() -> Result<TestProject> {
    let project = TestProject::new().await?;
    project
        .write(
            "app/web.yaml",
            &format!(
                "{}---\n{}",
                manifest("apps/v1", "Deployment", "web", Some("prod")),
                manifest("v1", "Service", "web", Some("prod"))
            ),
        )
        .await?;
    project.write("app/worker.yaml", &manifest("apps/v1", "Deployment", "worker", Some("dev"))).await?;
    project.write("app/ns.yaml", &manifest("v1", "Namespace", "prod", None)).await?;
    Ok(project)
}

fn identities(documents: &[Document]) -> Vec<String> {
    documents.iter().map(Document::identity).collect()
}

#[tokio::test]
async fn test_filters_combine_with_and() -> Result<()> {
    let project = fixture().await?;
    let renderer = YamlRenderer::new(
        vec![project.source("app/*.yaml")],
        RendererOptions::new()
            .with_filter(filters::by_kind(["Deployment"]))
            .with_filter(filters::by_namespace(["prod"])),
    )?;

    assert_eq!(identities(&renderer.render().await?), ["Deployment/prod/web"]);

    let reversed = YamlRenderer::new(
        vec![project.source("app/*.yaml")],
        RendererOptions::new()
            .with_filter(filters::by_namespace(["prod"]))
            .with_filter(filters::by_kind(["Deployment"])),
    )?;
    assert_eq!(reversed.render().await?, renderer.render().await?);
    Ok(())
}

#[tokio::test]
async fn test_filtered_documents_never_reach_transformers() -> Result<()> {
    let project = fixture().await?;
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    let renderer = YamlRenderer::new(
        vec![project.source("app/*.yaml")],
        RendererOptions::new().with_filter(filters::by_kind(["Service"])).with_transformer(
            pipeline::transformer(move |d: Document| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Some(d))
            }),
        ),
    )?;

    assert_eq!(renderer.render().await?.len(), 1);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_transformers_run_in_order_and_may_remove() -> Result<()> {
    let project = fixture().await?;
    let renderer = YamlRenderer::new(
        vec![project.source("app/*.yaml")],
        RendererOptions::new()
            .with_transformer(transformers::drop_kind("Service"))
            .with_transformer(transformers::set_namespace("staging", vec!["Namespace".to_string()]))
            .with_transformer(transformers::set_label("env", "first"))
            .with_transformer(transformers::set_label("env", "second")),
    )?;

    let documents = renderer.render().await?;
    assert_eq!(
        identities(&documents),
        ["Namespace/prod", "Deployment/staging/web", "Deployment/staging/worker"]
    );
    assert!(documents.iter().all(|d| d.label("env") == Some("second")));
    Ok(())
}

#[tokio::test]
async fn test_transformer_error_aborts_render() -> Result<()> {
    let project = fixture().await?;
    let renderer = YamlRenderer::new(
        vec![project.source("app/*.yaml")],
        RendererOptions::new().with_transformer(pipeline::transformer(|d: Document| {
            if d.name() == "worker" {
                bail!("worker is not allowed here");
            }
            Ok(Some(d))
        })),
    )?;

    let err = renderer.render().await.unwrap_err();
    match err.root_cause() {
        RenderError::Transform {
            document,
            source,
        } => {
            assert_eq!(document, "Deployment/dev/worker");
            assert!(source.to_string().contains("not allowed"));
        }
        other => panic!("expected transform error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_provenance_annotations() -> Result<()> {
    let project = fixture().await?;
    project
        .write(
            "pinned/cm.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: pinned\n  annotations:\n    manifest-render.io/source.file: upstream/cm.yaml\n",
        )
        .await?;

    let renderer = YamlRenderer::new(
        vec![project.source("app/web.yaml"), project.source("pinned/*.yaml")],
        RendererOptions::new().with_source_annotations(true),
    )?;
    let documents = renderer.render().await?;

    assert_eq!(documents.len(), 3);
    assert!(documents.iter().all(|d| d.annotation(SOURCE_TYPE) == Some("yaml")));
    assert_eq!(documents[0].annotation(SOURCE_FILE), Some("app/web.yaml"));
    assert_eq!(documents[1].annotation(SOURCE_FILE), Some("app/web.yaml"));
    assert_eq!(documents[2].annotation(SOURCE_FILE), Some("upstream/cm.yaml"));
    Ok(())
}

#[tokio::test]
async fn test_annotations_visible_to_filters() -> Result<()> {
    let project = fixture().await?;
    let renderer = YamlRenderer::new(
        vec![project.source("app/*.yaml")],
        RendererOptions::new().with_source_annotations(true).with_filter(pipeline::filter(
            |d: &Document| d.annotation(SOURCE_FILE) == Some("app/worker.yaml"),
        )),
    )?;

    assert_eq!(identities(&renderer.render().await?), ["Deployment/dev/worker"]);
    Ok(())
}
