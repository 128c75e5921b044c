//! Error handling for manifest rendering
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`RenderError`]) so callers can match on the
//!    exact failure kind (configuration, matching, decoding, transforming,
//!    cache computation).
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions
//!    for the command-line front end.
//!
//! Every variant carries the pattern, file path or source index needed to
//! diagnose the failure without re-running with verbose tracing.
//!
//! # Examples
//!
//! ```rust,no_run
//! use manifest_render::core::{RenderError, user_friendly_error};
//!
//! let err = RenderError::NoFilesMatched {
//!     pattern: "manifests/*.yaml".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(err));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The main error type for render operations.
///
/// # Error Categories
///
/// ## Configuration (raised when a renderer is constructed)
/// - [`NoSources`], [`FilesystemRequired`], [`PathEmpty`], [`InvalidPattern`], [`Config`]
///
/// ## Matching
/// - [`NoFilesMatched`] - the pattern matched zero eligible files
/// - [`PathIsDirectory`] - an exact, non-glob path names a directory
/// - [`ReadFailed`] - the filesystem could not enumerate or read an entry
///
/// ## Content
/// - [`Decode`] - malformed document content in one segment of a file
/// - [`Transform`] - a transformer reported failure
/// - [`TaskFailed`] - the blocking load task panicked
///
/// ## Caching
/// - [`CacheComputation`] - the memoized loader failed; every concurrent
///   waiter receives a clone of the same shared error
///
/// [`NoSources`]: RenderError::NoSources
/// [`FilesystemRequired`]: RenderError::FilesystemRequired
/// [`PathEmpty`]: RenderError::PathEmpty
/// [`InvalidPattern`]: RenderError::InvalidPattern
/// [`Config`]: RenderError::Config
/// [`NoFilesMatched`]: RenderError::NoFilesMatched
/// [`PathIsDirectory`]: RenderError::PathIsDirectory
/// [`ReadFailed`]: RenderError::ReadFailed
/// [`Decode`]: RenderError::Decode
/// [`Transform`]: RenderError::Transform
/// [`CacheComputation`]: RenderError::CacheComputation
/// [`TaskFailed`]: RenderError::TaskFailed
#[derive(Error, Debug)]
pub enum RenderError {
    /// A renderer was constructed without any source
    #[error("At least one source is required")]
    NoSources,

    /// A source has no filesystem attached
    #[error("Source #{index}: filesystem is required")]
    FilesystemRequired {
        /// Position of the offending source in the configuration
        index: usize,
    },

    /// A source pattern is empty or whitespace only
    #[error("Source #{index}: path is required")]
    PathEmpty {
        /// Position of the offending source in the configuration
        index: usize,
    },

    /// A source pattern is not a valid or safe glob
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as configured
        pattern: String,
        /// Why the pattern was rejected
        reason: String,
    },

    /// The pattern matched zero eligible files
    #[error("No YAML files matched pattern '{pattern}'")]
    NoFilesMatched {
        /// The pattern as configured
        pattern: String,
    },

    /// An exact (non-glob) pattern names a directory
    #[error("Path '{path}' is a directory, expected a YAML file")]
    PathIsDirectory {
        /// The directory path
        path: String,
    },

    /// The filesystem failed to enumerate or read an entry
    #[error("Failed to read '{path}'")]
    ReadFailed {
        /// The path being read
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Malformed document content
    #[error("Failed to decode document #{index} in '{path}': {reason}")]
    Decode {
        /// File the segment came from
        path: String,
        /// Zero-based segment index within the file
        index: usize,
        /// Parser message
        reason: String,
    },

    /// A transformer reported failure
    #[error("Transformer failed on {document}")]
    Transform {
        /// Identity of the document being transformed (`kind/namespace/name`)
        document: String,
        /// The transformer's error
        #[source]
        source: anyhow::Error,
    },

    /// The memoized loader failed; shared by every waiter on that computation
    #[error("Cached computation failed")]
    CacheComputation(#[source] Arc<RenderError>),

    /// Context wrapper identifying which configured source failed
    #[error("Source #{index} ('{pattern}') failed")]
    Source {
        /// Position of the source in the configuration
        index: usize,
        /// The source's path pattern
        pattern: String,
        /// The underlying failure
        #[source]
        source: Box<RenderError>,
    },

    /// A blocking load task panicked or was aborted
    #[error("Load task failed: {reason}")]
    TaskFailed {
        /// Join error reported by the runtime
        reason: String,
    },

    /// Configuration file or option error
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },
}

impl RenderError {
    /// Wrap this error with the index and pattern of the source that produced it.
    pub fn in_source(self, index: usize, pattern: &str) -> Self {
        Self::Source {
            index,
            pattern: pattern.to_string(),
            source: Box::new(self),
        }
    }

    /// Strip [`Source`](RenderError::Source) and
    /// [`CacheComputation`](RenderError::CacheComputation) wrappers and return
    /// the innermost error.
    ///
    /// Useful when matching on the failure kind regardless of how much
    /// context was layered on top of it.
    pub fn root_cause(&self) -> &RenderError {
        match self {
            Self::Source {
                source,
                ..
            } => source.root_cause(),
            Self::CacheComputation(inner) => inner.root_cause(),
            other => other,
        }
    }

    /// Whether this error was raised while validating configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::NoSources
                | Self::FilesystemRequired { .. }
                | Self::PathEmpty { .. }
                | Self::InvalidPattern { .. }
                | Self::Config { .. }
        )
    }
}

/// Convenience alias used throughout the library.
pub type Result<T, E = RenderError> = std::result::Result<T, E>;

/// Error wrapper with a user-facing suggestion and optional details.
///
/// Displayed by the CLI with terminal colors:
/// - Error message: red and bold
/// - Details: yellow
/// - Suggestion: green
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Rendered message of the underlying error
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details and suggestion to stderr.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
///
/// Walks the error chain looking for a [`RenderError`]; the suggestion is
/// chosen from its root cause while the message keeps all outer context.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let message = format!("{error:#}");

    for cause in error.chain() {
        if let Some(render_error) = cause.downcast_ref::<RenderError>() {
            return suggest(render_error.root_cause(), message);
        }
    }

    ErrorContext::new(message)
}

fn suggest(root: &RenderError, message: String) -> ErrorContext {
    let ctx = ErrorContext::new(message);
    match root {
        RenderError::NoSources => {
            ctx.with_suggestion("Pass at least one PATTERN or add a [[sources]] table to the config")
        }
        RenderError::FilesystemRequired {
            ..
        } => ctx.with_suggestion("Attach a filesystem (for example DirFs::new(root)) to the source"),
        RenderError::PathEmpty {
            ..
        } => ctx.with_suggestion("Set a glob such as \"*.yaml\" as the source path"),
        RenderError::InvalidPattern {
            ..
        } => ctx
            .with_suggestion("Use a relative glob without '..' components, e.g. \"manifests/**/*.yaml\""),
        RenderError::NoFilesMatched {
            ..
        } => ctx
            .with_details("Only files ending in .yaml or .yml are considered; directories are skipped")
            .with_suggestion("Check the pattern for typos and that the root directory is correct"),
        RenderError::PathIsDirectory {
            ..
        } => ctx.with_suggestion("Append a glob to match files inside it, e.g. \"<dir>/*.yaml\""),
        RenderError::ReadFailed {
            ..
        } => ctx.with_suggestion("Check that the file exists and is readable"),
        RenderError::Decode {
            ..
        } => ctx
            .with_details("Each '---' separated segment must be a YAML mapping with a 'kind' field")
            .with_suggestion("Validate the file with a YAML linter"),
        RenderError::Transform {
            ..
        } => ctx.with_suggestion("Inspect the transformer configuration for the failing document"),
        RenderError::Config {
            ..
        } => ctx.with_suggestion("Check the configuration file syntax"),
        RenderError::CacheComputation(_)
        | RenderError::TaskFailed {
            ..
        }
        | RenderError::Source {
            ..
        } => ctx,
    }
}
