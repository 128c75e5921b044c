//! End-to-end tests for the `manifest-render` binary.

use crate::common::TestProject;
use anyhow::Result;
use assert_cmd::Command;
use manifest_render::test_utils::manifest;
use predicates::prelude::*;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("manifest-render").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[tokio::test]
async fn test_renders_yaml_stream() -> Result<()> {
    let project = TestProject::new().await?;
    project.write("m/a.yaml", &manifest("v1", "ConfigMap", "first", None)).await?;
    project.write("m/b.yml", &manifest("v1", "Secret", "second", None)).await?;

    cmd()
        .args(["--quiet", "--root"])
        .arg(project.root())
        .arg("m/*")
        .assert()
        .success()
        .stdout(predicate::str::contains("name: first"))
        .stdout(predicate::str::contains("---\n"))
        .stdout(predicate::str::contains("kind: Secret"));
    Ok(())
}

#[tokio::test]
async fn test_renders_json_with_annotations() -> Result<()> {
    let project = TestProject::new().await?;
    project.write("m/a.yaml", &manifest("v1", "ConfigMap", "first", None)).await?;

    let output = cmd()
        .current_dir(project.root())
        .args(["-q", "--annotate", "--format", "json", "m/*.yaml"])
        .output()?;
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(parsed[0]["metadata"]["name"], "first");
    assert_eq!(
        parsed[0]["metadata"]["annotations"]["manifest-render.io/source.file"],
        "m/a.yaml"
    );
    Ok(())
}

#[tokio::test]
async fn test_config_file() -> Result<()> {
    let project = TestProject::new().await?;
    project.write("deploy/a.yaml", &manifest("v1", "ConfigMap", "cfg", None)).await?;
    let config = project
        .write(
            "render.toml",
            "[[sources]]\nroot = \"deploy\"\npath = \"*.yaml\"\n\n[transform]\nnamespace = \"prod\"\n",
        )
        .await?;

    cmd()
        .arg("-q")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("namespace: prod"));
    Ok(())
}

#[tokio::test]
async fn test_no_match_fails_with_suggestion() -> Result<()> {
    let project = TestProject::new().await?;

    cmd()
        .current_dir(project.root())
        .args(["-q", "nothing/*.yaml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("nothing/*.yaml"))
        .stderr(predicate::str::contains("suggestion"));
    Ok(())
}

#[test]
fn test_no_sources_fails() {
    cmd().arg("-q").assert().failure().stderr(predicate::str::contains("At least one source"));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    cmd().args(["-v", "-q", "x.yaml"]).assert().failure();
}
