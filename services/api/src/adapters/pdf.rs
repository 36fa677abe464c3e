//! services/api/src/adapters/pdf.rs
//!
//! This module contains the adapter for the HTML-to-PDF render pipeline.
//! It implements the `PdfRenderService` port by driving a headless
//! Chromium instance through the `headless_chrome` crate.
//!
//! Each render acquires its own browser process and releases it when the
//! call returns: the `Browser` handle is owned by the blocking closure, so
//! its `Drop` impl tears the process down on every path, success or error.
//! Nothing is pooled or shared across requests.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use tracing::debug;

use diary_core::ports::{PdfRenderService, RenderError};

/// A4 paper, in inches, as Chromium's print API expects.
const A4_WIDTH_IN: f64 = 8.27;
const A4_HEIGHT_IN: f64 = 11.69;
/// 20 mm margins on every side.
const MARGIN_IN: f64 = 20.0 / 25.4;

/// A returned buffer smaller than this cannot be a usable PDF.
const MIN_OUTPUT_BYTES: usize = 1000;

/// An adapter that implements the `PdfRenderService` port with a
/// per-request headless Chromium instance.
pub struct ChromiumPdfAdapter {
    chrome_path: Option<PathBuf>,
    load_timeout: Duration,
}

impl ChromiumPdfAdapter {
    /// Creates a new `ChromiumPdfAdapter`.
    pub fn new(chrome_path: Option<PathBuf>, load_timeout: Duration) -> Self {
        Self {
            chrome_path,
            load_timeout,
        }
    }

    fn print_options() -> PrintToPdfOptions {
        PrintToPdfOptions {
            print_background: Some(true),
            paper_width: Some(A4_WIDTH_IN),
            paper_height: Some(A4_HEIGHT_IN),
            margin_top: Some(MARGIN_IN),
            margin_bottom: Some(MARGIN_IN),
            margin_left: Some(MARGIN_IN),
            margin_right: Some(MARGIN_IN),
            prefer_css_page_size: Some(false),
            ..Default::default()
        }
    }
}

/// The synchronous render body, run on the blocking pool. The `Browser`
/// stays inside this function so teardown is unconditional.
fn render_blocking(
    html: &str,
    chrome_path: Option<PathBuf>,
    load_timeout: Duration,
) -> Result<Vec<u8>, RenderError> {
    let launch_options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false)
        .path(chrome_path)
        .idle_browser_timeout(load_timeout + Duration::from_secs(30))
        .build()
        .map_err(|e| RenderError::Launch(e.to_string()))?;

    let browser = Browser::new(launch_options).map_err(|e| RenderError::Launch(e.to_string()))?;
    let tab = browser
        .new_tab()
        .map_err(|e| RenderError::Launch(e.to_string()))?;
    tab.set_default_timeout(load_timeout);

    // The composed document is self-contained, so it travels as a data URL
    // and the tab never touches the network.
    let data_url = format!(
        "data:text/html;charset=utf-8,{}",
        urlencoding::encode(html)
    );
    tab.navigate_to(&data_url)
        .map_err(|e| RenderError::Engine(e.to_string()))?;
    tab.wait_until_navigated()
        .map_err(|_| RenderError::LoadTimeout(load_timeout.as_secs()))?;

    let bytes = tab
        .print_to_pdf(Some(ChromiumPdfAdapter::print_options()))
        .map_err(|e| RenderError::Engine(e.to_string()))?;

    if bytes.len() < MIN_OUTPUT_BYTES {
        return Err(RenderError::UndersizedOutput {
            size: bytes.len(),
            min: MIN_OUTPUT_BYTES,
        });
    }

    debug!(bytes = bytes.len(), "rendered PDF");
    Ok(bytes)
}

#[async_trait]
impl PdfRenderService for ChromiumPdfAdapter {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let html = html.to_owned();
        let chrome_path = self.chrome_path.clone();
        let load_timeout = self.load_timeout;

        tokio::task::spawn_blocking(move || render_blocking(&html, chrome_path, load_timeout))
            .await
            .map_err(|e| RenderError::Engine(format!("Render task panicked: {e}")))?
    }
}
