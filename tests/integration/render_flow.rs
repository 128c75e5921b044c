//! Rendering real directory trees: ordering, multi-document files, the
//! extension policy and error reporting.

use crate::common::TestProject;
use anyhow::Result;
use manifest_render::core::{Document, RenderError};
use manifest_render::renderer::{RendererOptions, YamlRenderer};
use manifest_render::test_utils::manifest;

fn names(documents: &[Document]) -> Vec<&str> {
    documents.iter().map(Document::name).collect()
}

async fn render(project: &TestProject, patterns: &[&str]) -> Result<Vec<Document>, RenderError> {
    let sources = patterns.iter().map(|p| project.source(p)).collect();
    YamlRenderer::new(sources, RendererOptions::new())?.render().await
}

#[tokio::test]
async fn test_files_sorted_and_documents_in_file_order() -> Result<()> {
    manifest_render::test_utils::init_test_logging(None);

    let project = TestProject::new().await?;
    project.write("b.yaml", &manifest("v1", "ConfigMap", "b", None)).await?;
    project
        .write(
            "a.yaml",
            &format!(
                "{}---\n{}",
                manifest("v1", "ConfigMap", "a1", None),
                manifest("v1", "ConfigMap", "a2", None)
            ),
        )
        .await?;
    project.write("sub/c.yaml", &manifest("v1", "ConfigMap", "c", None)).await?;

    let top = render(&project, &["*.yaml"]).await?;
    assert_eq!(names(&top), ["a1", "a2", "b"]);

    let all = render(&project, &["**/*.yaml"]).await?;
    assert_eq!(names(&all), ["a1", "a2", "b", "c"]);
    Ok(())
}

#[tokio::test]
async fn test_render_is_deterministic() -> Result<()> {
    let project = TestProject::new().await?;
    for name in ["zeta", "alpha", "mid", "beta"] {
        project.write(&format!("m/{name}.yaml"), &manifest("v1", "Service", name, Some("ns"))).await?;
    }

    let first = render(&project, &["m/*.yaml"]).await?;
    for _ in 0..5 {
        assert_eq!(render(&project, &["m/*.yaml"]).await?, first);
    }
    assert_eq!(names(&first), ["alpha", "beta", "mid", "zeta"]);
    Ok(())
}

#[tokio::test]
async fn test_sources_concatenate_in_configuration_order() -> Result<()> {
    let project = TestProject::new().await?;
    project.write("a/one.yaml", &manifest("v1", "ConfigMap", "from-a", None)).await?;
    project.write("b/two.yaml", &manifest("v1", "ConfigMap", "from-b", None)).await?;

    let documents = render(&project, &["b/*.yaml", "a/*.yaml"]).await?;
    assert_eq!(names(&documents), ["from-b", "from-a"]);
    Ok(())
}

#[tokio::test]
async fn test_only_yaml_and_yml_files_are_decoded() -> Result<()> {
    let project = TestProject::new().await?;
    project.write("m/a.yaml", &manifest("v1", "ConfigMap", "yaml", None)).await?;
    project.write("m/b.yml", &manifest("v1", "ConfigMap", "yml", None)).await?;
    project.write("m/c.json", "{\"kind\": \"ConfigMap\"}").await?;
    project.write("m/d.YAML", &manifest("v1", "ConfigMap", "upper", None)).await?;
    project.write("m/README.md", "# not a manifest").await?;
    project.mkdir("m/dir.yaml").await?;

    let documents = render(&project, &["m/*"]).await?;
    assert_eq!(names(&documents), ["yaml", "yml"]);
    Ok(())
}

#[tokio::test]
async fn test_empty_match_is_an_error() -> Result<()> {
    let project = TestProject::new().await?;
    project.write("m/notes.txt", "hello").await?;

    let err = render(&project, &["m/*"]).await.unwrap_err();
    assert!(matches!(err.root_cause(), RenderError::NoFilesMatched { .. }));

    let err = render(&project, &["missing/*.yaml"]).await.unwrap_err();
    assert!(err.to_string().contains("missing/*.yaml"));
    Ok(())
}

#[tokio::test]
async fn test_exact_paths() -> Result<()> {
    let project = TestProject::new().await?;
    project.write("conf/app.yaml", &manifest("v1", "Secret", "s", None)).await?;

    let documents = render(&project, &["conf/app.yaml"]).await?;
    assert_eq!(names(&documents), ["s"]);

    let err = render(&project, &["conf"]).await.unwrap_err();
    assert!(matches!(err.root_cause(), RenderError::PathIsDirectory { .. }));

    let err = render(&project, &["conf/absent.yaml"]).await.unwrap_err();
    assert!(matches!(err.root_cause(), RenderError::NoFilesMatched { .. }));
    Ok(())
}

#[tokio::test]
async fn test_empty_file_contributes_nothing() -> Result<()> {
    let project = TestProject::new().await?;
    project.write("m/empty.yaml", "").await?;
    project.write("m/comments.yaml", "# nothing here\n---\n# still nothing\n").await?;
    project.write("m/real.yaml", &manifest("v1", "ConfigMap", "real", None)).await?;

    let documents = render(&project, &["m/*.yaml"]).await?;
    assert_eq!(names(&documents), ["real"]);
    Ok(())
}

#[tokio::test]
async fn test_decode_error_aborts_render() -> Result<()> {
    let project = TestProject::new().await?;
    project.write("good/a.yaml", &manifest("v1", "ConfigMap", "ok", None)).await?;
    project
        .write("bad/b.yaml", &format!("{}---\nkind: [broken\n", manifest("v1", "ConfigMap", "x", None)))
        .await?;

    let err = render(&project, &["good/*.yaml", "bad/*.yaml"]).await.unwrap_err();
    match &err {
        RenderError::Source {
            index,
            ..
        } => assert_eq!(*index, 1),
        other => panic!("expected source context, got {other:?}"),
    }
    match err.root_cause() {
        RenderError::Decode {
            path,
            index,
            ..
        } => {
            assert_eq!(path, "bad/b.yaml");
            assert_eq!(*index, 1);
        }
        other => panic!("expected decode error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_unsafe_patterns_rejected_at_construction() -> Result<()> {
    let project = TestProject::new().await?;

    for pattern in ["../outside/*.yaml", "/etc/*.yaml", "a/../../b.yaml"] {
        let err = YamlRenderer::new(vec![project.source(pattern)], RendererOptions::new())
            .unwrap_err();
        assert!(err.is_configuration(), "{pattern} should be rejected");
        assert!(matches!(err, RenderError::InvalidPattern { .. }), "{pattern}: {err:?}");
    }
    Ok(())
}
