//! Build orchestration.
//!
//! A [`Builder`] owns the two expensive rendering resources for a session —
//! the template engine and the document engine — and exposes one idempotent
//! operation: turn the current on-disk inputs into the output artifact.
//!
//! Lifecycle is two-phase: the builder is *open* from construction until
//! [`Builder::close`], which releases everything and turns both `build` and
//! `close` into no-ops. The transition is one-way; a closed builder is
//! never reopened.
//!
//! Build pipeline phases:
//! - **Resolve** - absolutize the three request paths against the root
//! - **Read** - template source from disk
//! - **Load** - data file, revalidated on every call
//! - **Render** - template + data to HTML
//! - **Export** - HTML to PDF bytes via the document engine
//! - **Write** - create the output directory, write the artifact last

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::browser::{BrowserRenderer, DocumentEngine};
use crate::config::{PdfOptions, RenderConfig};
use crate::data;
use crate::error::BuildError;
use crate::template::TemplateEngine;
use crate::utils::path::absolutize;
use crate::{debug, log};

/// The parameters of one render. Immutable per invocation; the watch loop
/// reuses the same request for every rebuild.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub data: PathBuf,
    pub template: PathBuf,
    pub output: PathBuf,
}

/// The resources released on close, grouped so one `Option` models the
/// open/closed state without any dangling half.
struct Engines<E> {
    templates: TemplateEngine,
    documents: E,
}

/// Session-scoped build orchestrator. See the module docs for lifecycle.
pub struct Builder<E: DocumentEngine = BrowserRenderer> {
    root: PathBuf,
    pdf_options: PdfOptions,
    engines: Option<Engines<E>>,
}

impl Builder<BrowserRenderer> {
    /// Construct an open builder: build the template engine and launch the
    /// browser session. Expensive; do it once per build or watch session.
    pub async fn open(root: &Path, config: &RenderConfig) -> Result<Self, BuildError> {
        let documents = BrowserRenderer::launch(&config.browser).await?;
        Ok(Self::with_engine(root, config, documents))
    }
}

impl<E: DocumentEngine> Builder<E> {
    /// Assemble a builder around an already-constructed document engine.
    pub(crate) fn with_engine(root: &Path, config: &RenderConfig, documents: E) -> Self {
        Self {
            root: root.to_path_buf(),
            pdf_options: config.pdf.clone(),
            engines: Some(Engines {
                templates: TemplateEngine::new(&config.template),
                documents,
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.engines.is_none()
    }

    /// Produce the artifact once.
    ///
    /// Strictly sequenced; any step failure aborts the rest and propagates.
    /// The artifact write is the final step, so a failed build never
    /// replaces the output of an earlier successful one. Silently does
    /// nothing when the builder is closed.
    pub async fn build(&mut self, request: &RenderRequest) -> Result<(), BuildError> {
        let Some(engines) = self.engines.as_mut() else {
            debug!("build"; "skipping build on closed builder");
            return Ok(());
        };
        let started = Instant::now();

        let template_path = absolutize(&request.template, &self.root)?;
        let data_path = absolutize(&request.data, &self.root)?;
        let output_path = absolutize(&request.output, &self.root)?;

        let source = fs::read_to_string(&template_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BuildError::TemplateNotFound(template_path.clone())
            } else {
                BuildError::from_io(&template_path, e)
            }
        })?;

        let payload = data::load(&data_path)?;
        let html = engines.templates.render(&source, payload.as_ref())?;

        if let Some(parent) = output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| BuildError::from_io(parent, e))?;
        }

        let bytes = engines.documents.render(&html, &self.pdf_options).await?;
        fs::write(&output_path, &bytes).map_err(|e| BuildError::from_io(&output_path, e))?;

        log!("build"; "wrote {} ({} bytes) in {}ms",
            output_path.display(), bytes.len(), started.elapsed().as_millis());
        Ok(())
    }

    /// Release the template engine and tear down the document engine.
    ///
    /// Idempotent and infallible; safe to call from cleanup paths even if
    /// no build ever succeeded.
    pub async fn close(&mut self) {
        let Some(mut engines) = self.engines.take() else {
            return;
        };
        engines.documents.close().await;
        // TemplateEngine needs no teardown protocol; dropping it here is
        // the release.
    }
}


#[cfg(test)]
mod tests {
    use super::testing::SpyEngine;
    use super::*;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn fixture(template: &str, data: &str) -> (TempDir, RenderRequest) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("report.html"), template).unwrap();
        fs::write(dir.path().join("report.yml"), data).unwrap();
        let request = RenderRequest {
            data: PathBuf::from("report.yml"),
            template: PathBuf::from("report.html"),
            output: PathBuf::from("out/report.pdf"),
        };
        (dir, request)
    }

    fn spy_builder(root: &Path) -> (Builder<SpyEngine>, SpyEngine) {
        let engine = SpyEngine::new();
        let handles = engine.handles();
        (
            Builder::with_engine(root, &RenderConfig::default(), engine),
            handles,
        )
    }

    #[tokio::test]
    async fn round_trip_build() {
        let (dir, request) = fixture("{{ title }}", "title: Hello\n");
        let (mut builder, _spy) = spy_builder(dir.path());

        builder.build(&request).await.unwrap();

        let written = fs::read_to_string(dir.path().join("out/report.pdf")).unwrap();
        assert_eq!(written, "Hello");
    }

    #[tokio::test]
    async fn relative_paths_resolve_against_root() {
        let (dir, _) = fixture("{{ title }}", "title: Hello\n");
        let request = RenderRequest {
            data: PathBuf::from("./report.yml"),
            template: PathBuf::from("sub/../report.html"),
            output: dir.path().join("report.pdf"),
        };
        let (mut builder, _spy) = spy_builder(dir.path());

        builder.build(&request).await.unwrap();
        assert!(dir.path().join("report.pdf").is_file());
    }

    #[tokio::test]
    async fn missing_template_aborts_before_output() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("report.yml"), "title: Hello\n").unwrap();
        let request = RenderRequest {
            data: PathBuf::from("report.yml"),
            template: PathBuf::from("report.html"),
            output: PathBuf::from("out/report.pdf"),
        };
        let (mut builder, spy) = spy_builder(dir.path());

        let err = builder.build(&request).await.unwrap_err();
        assert!(matches!(err, BuildError::TemplateNotFound(_)));
        assert_eq!(spy.renders.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn export_failure_leaves_previous_artifact() {
        let (dir, request) = fixture("{{ title }}", "title: One\n");
        let (mut builder, spy) = spy_builder(dir.path());

        builder.build(&request).await.unwrap();
        fs::write(dir.path().join("report.yml"), "title: Two\n").unwrap();
        spy.fail_next.store(true, Ordering::SeqCst);

        let err = builder.build(&request).await.unwrap_err();
        assert!(matches!(err, BuildError::BrowserLaunch(_)));

        // The write step never ran, so the first artifact survives intact.
        let written = fs::read_to_string(dir.path().join("out/report.pdf")).unwrap();
        assert_eq!(written, "One");
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (dir, _request) = fixture("{{ title }}", "title: Hello\n");
        let (mut builder, spy) = spy_builder(dir.path());

        builder.close().await;
        builder.close().await;

        assert!(builder.is_closed());
        assert_eq!(spy.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn build_after_close_is_a_noop() {
        let (dir, request) = fixture("{{ title }}", "title: Hello\n");
        let (mut builder, spy) = spy_builder(dir.path());

        builder.close().await;
        builder.build(&request).await.unwrap();

        assert_eq!(spy.renders.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("out/report.pdf").exists());
    }

    #[tokio::test]
    async fn close_without_successful_build() {
        let dir = TempDir::new().unwrap();
        let (mut builder, spy) = spy_builder(dir.path());
        builder.close().await;
        assert_eq!(spy.closes.load(Ordering::SeqCst), 1);
    }
}
