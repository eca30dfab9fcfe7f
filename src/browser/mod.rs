//! Headless Chromium adapter.
//!
//! One browser process and one page per renderer, both launched once and
//! reused for every export in the session (process spawn plus the CDP
//! handshake is the expensive part of a build). The markup is delivered as
//! a base64 `data:` URL so no temp file or local server is involved, and
//! the PDF comes back from Page.printToPDF as bytes.
//!
//! The renderer installs no signal handling of its own; the owning builder
//! controls teardown ordering (page, then process, then the CDP event
//! task).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::future::Future;
use tokio::task::JoinHandle;

use crate::config::{BrowserOptions, PdfOptions};
use crate::debug;
use crate::error::BuildError;

/// Seam between the builder and the document export engine.
///
/// Production code uses [`BrowserRenderer`]; lifecycle tests substitute a
/// spy so no browser process is needed to exercise the state machine.
pub trait DocumentEngine: Send + 'static {
    /// Export the given markup to document bytes.
    fn render(
        &mut self,
        html: &str,
        options: &PdfOptions,
    ) -> impl Future<Output = Result<Vec<u8>, BuildError>> + Send;

    /// Release all owned resources. Must be idempotent.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Long-lived browser session: one process, one page.
pub struct BrowserRenderer {
    browser: Browser,
    page: Option<Page>,
    handler: JoinHandle<()>,
    closed: bool,
}

impl BrowserRenderer {
    /// Launch the browser process and open the single page.
    pub async fn launch(options: &BrowserOptions) -> Result<Self, BuildError> {
        let mut builder = BrowserConfig::builder().args(options.args.clone());
        if let Some(executable) = &options.executable {
            builder = builder.chrome_executable(executable);
        }
        if options.headful {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BuildError::BrowserLaunch)?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| BuildError::BrowserLaunch(e.to_string()))?;

        // The CDP connection is driven by polling the event stream; park
        // that on its own task for the life of the session.
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BuildError::BrowserLaunch(e.to_string()))?;

        debug!("browser"; "launched chromium session");
        Ok(Self {
            browser,
            page: Some(page),
            handler,
            closed: false,
        })
    }
}

impl DocumentEngine for BrowserRenderer {
    async fn render(&mut self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, BuildError> {
        // The builder enforces open/closed, so a missing page here is a
        // programming error rather than a user-visible state.
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| BuildError::InvalidArgument("render on closed session".into()))?;

        let url = format!("data:text/html;charset=utf-8;base64,{}", BASE64.encode(html));
        page.goto(url).await.map_err(BuildError::DocumentRender)?;
        page.wait_for_navigation()
            .await
            .map_err(BuildError::DocumentRender)?;
        page.pdf(print_params(options))
            .await
            .map_err(BuildError::DocumentRender)
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        // Page first, then the process, then reap the event task.
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        let _ = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler.abort();
        debug!("browser"; "chromium session closed");
    }
}

/// Map the `[pdf]` options namespace onto Page.printToPDF parameters.
fn print_params(options: &PdfOptions) -> PrintToPdfParams {
    PrintToPdfParams {
        landscape: Some(options.landscape),
        print_background: Some(options.background),
        scale: options.scale,
        paper_width: options.width,
        paper_height: options.height,
        margin_top: options.margin.top,
        margin_bottom: options.margin.bottom,
        margin_left: options.margin.left,
        margin_right: options.margin.right,
        page_ranges: options.page_ranges.clone(),
        prefer_css_page_size: Some(options.css_page_size),
        ..Default::default()
    }
}
