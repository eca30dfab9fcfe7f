//! Build error taxonomy.
//!
//! Every failure a build or watch session can hit has a typed variant here.
//! CLI-level plumbing wraps these in `anyhow`; the watch loop matches on
//! them to decide between retrying, swallowing, and tearing down.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the build pipeline and watch coordinator.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Caller passed a malformed parameter. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("data file not found: {}", .0.display())]
    DataNotFound(PathBuf),

    #[error("template file not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// A watch target was missing before any rendering resource was set up.
    #[error("cannot watch missing file: {}", .0.display())]
    WatchTargetMissing(PathBuf),

    #[error("unsupported data format `.{extension}` for {}, expected yml/yaml/json", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The data file parsed, but not to a mapping (or nothing at all).
    #[error("data in {} must be a mapping or absent, got {kind}", path.display())]
    InvalidDataShape { path: PathBuf, kind: &'static str },

    #[error("data parse error in {}", path.display())]
    DataParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("template render failed")]
    TemplateRender(#[from] tera::Error),

    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("pdf export failed")]
    DocumentRender(#[source] chromiumoxide::error::CdpError),

    #[error("filesystem watch failed")]
    Watch(#[from] notify::Error),

    #[error("io error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Whether this error can be explained by reading a watched file while a
    /// concurrent writer is still mid-write (editor save, truncate-then-write).
    ///
    /// Only the watch rebuild path consults this; one-shot builds always
    /// propagate. Classifying by kind instead of matching message strings is
    /// a deliberate departure from earlier designs of this tool.
    pub fn is_transient_read(&self) -> bool {
        matches!(
            self,
            Self::DataNotFound(_) | Self::DataParse { .. } | Self::InvalidDataShape { .. }
        )
    }

    /// Attach a path to an io error.
    pub fn from_io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
