//! Command-line interface.
//!
//! ```text
//! manifest-render [--config FILE] [--root DIR] [PATTERN...] [--annotate]
//!                 [--format yaml|json] [--verbose|--quiet]
//! ```
//!
//! Sources come from the config file's `[[sources]]` tables followed by one
//! source per positional `PATTERN`, evaluated against `--root`. Rendered
//! documents go to stdout; logs and errors go to stderr.

use crate::config::RenderConfig;
use crate::core::Document;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Output encoding for rendered documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Multi-document YAML stream separated by `---`
    #[default]
    Yaml,
    /// A single JSON array
    Json,
}

/// Runtime settings derived from the command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Log filter directive; `None` disables logging
    pub log_level: Option<String>,
}

impl CliConfig {
    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// `RUST_LOG` takes precedence over the flag-derived level. Calling this
    /// more than once is harmless; only the first subscriber is kept.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if let Some(level) = &self.log_level {
            EnvFilter::new(level)
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init();
    }
}

/// Render manifest documents from YAML files.
#[derive(Parser, Debug)]
#[command(
    name = "manifest-render",
    about = "Render manifest documents from glob-matched YAML files",
    version,
    long_about = "Collects YAML documents from files matching glob patterns, applies filters \
                  and transformers, and prints the result as a YAML stream or a JSON array."
)]
pub struct Cli {
    /// Glob patterns, relative to `--root`, e.g. `base/*.yaml`.
    pub patterns: Vec<String>,

    /// TOML configuration file with sources, cache, filters and transforms.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory the positional patterns are evaluated against.
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Stamp each document with the file it came from.
    #[arg(short, long)]
    pub annotate: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Enable debug logging on stderr.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Disable logging entirely.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Run the command, writing rendered documents to stdout.
    pub async fn execute(self) -> Result<()> {
        self.build_config().init_logging();

        let format = self.format;
        let config = self.render_config().await?;
        let renderer = config.into_renderer()?;
        let documents = renderer.render().await?;

        let output = format_documents(&documents, format)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(output.as_bytes()).context("Failed to write output")?;
        stdout.flush().context("Failed to write output")?;
        Ok(())
    }

    /// Translate verbosity flags into a [`CliConfig`].
    ///
    /// `--verbose` selects `debug`, `--quiet` disables logging, otherwise
    /// `info`.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
        }
    }

    /// Merge the config file (if any) with the command-line sources and flags.
    pub async fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path).await?,
            None => RenderConfig::default(),
        };

        for pattern in &self.patterns {
            config.add_source(&self.root, pattern.clone());
        }
        config.annotate |= self.annotate;

        debug!(target: "cli", "Rendering {} source(s)", config.sources.len());
        Ok(config)
    }
}

/// Encode documents in the requested format.
///
/// YAML output is a stream of documents separated by `---` lines; JSON
/// output is a pretty-printed array. Both end with a newline unless empty.
pub fn format_documents(documents: &[Document], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => {
            let encoded = documents
                .iter()
                .map(serde_yaml::to_string)
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to encode documents as YAML")?;
            Ok(encoded.join("---\n"))
        }
        OutputFormat::Json => {
            let mut encoded = serde_json::to_string_pretty(documents)
                .context("Failed to encode documents as JSON")?;
            encoded.push('\n');
            Ok(encoded)
        }
    }
}
