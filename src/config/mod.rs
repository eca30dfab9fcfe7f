//! Render configuration.
//!
//! An optional `platen.toml` next to the project root carries three opaque
//! option namespaces, each forwarded to exactly one subsystem:
//!
//! ```toml
//! [template]          # Tera adapter
//! autoescape = false
//!
//! [pdf]               # Page.printToPDF mapping
//! landscape = true
//! background = true
//! margin = { top = 0.5, bottom = 0.5 }
//!
//! [browser]           # Chromium launch
//! args = ["--font-render-hinting=none"]
//! ```
//!
//! A missing file yields defaults; unknown keys are rejected so typos fail
//! loudly instead of silently rendering with defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),
}

/// Options forwarded to the template engine adapter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateOptions {
    /// Enable Tera HTML autoescaping. Off by default: platen templates
    /// produce whole HTML documents, not fragments embedded in a page.
    pub autoescape: bool,
}

/// Page margins in inches. Unset fields use the engine default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdfMargins {
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub right: Option<f64>,
}

/// Options forwarded to the PDF export call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdfOptions {
    pub landscape: bool,
    /// Print CSS backgrounds.
    pub background: bool,
    /// Render scale, 1.0 = 100%.
    pub scale: Option<f64>,
    /// Paper width in inches.
    pub width: Option<f64>,
    /// Paper height in inches.
    pub height: Option<f64>,
    pub margin: PdfMargins,
    /// Page ranges to export, e.g. "1-3, 5".
    pub page_ranges: Option<String>,
    /// Let an `@page` CSS rule win over `width`/`height`.
    pub css_page_size: bool,
}

/// Options forwarded to the browser launch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserOptions {
    /// Chromium executable; autodetected when unset.
    pub executable: Option<PathBuf>,
    /// Extra command-line args for the browser process.
    pub args: Vec<String>,
    /// Run with a visible window (debugging).
    pub headful: bool,
}

/// Top-level render configuration: three namespaces, all optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub template: TemplateOptions,
    pub pdf: PdfOptions,
    pub browser: BrowserOptions,
}

impl RenderConfig {
    /// Load from `path` if it exists, defaults otherwise.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Ok(toml::from_str(&raw)?)
    }
}
