mod webdriver;

pub use webdriver::WebDriverBrowser;

use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum PdfError {
    #[error("htmlContent is required")]
    MissingContent,
    #[error("Failed to launch browser: {0}")]
    Launch(String),
    #[error("Failed to load HTML content: {0}")]
    Load(String),
    #[error("Failed to render PDF: {0}")]
    Render(String),
}

/// Page setup used for every rendered document (centimetres).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfOptions {
    pub page_width: f64,
    pub page_height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub print_background: bool,
}

impl Default for PdfOptions {
    /// US Letter with backgrounds, 1cm top/bottom margins and no side margins
    fn default() -> Self {
        Self {
            page_width: 21.59,
            page_height: 27.94,
            margin_top: 1.0,
            margin_bottom: 1.0,
            margin_left: 0.0,
            margin_right: 0.0,
            print_background: true,
        }
    }
}

/// Starts a fresh headless browser for a single render.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Browser: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, PdfError>;
}

/// One launched browser with a single page open.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrowserSession: Send {
    /// Replaces the page content and waits for it to finish loading.
    async fn load_html(&mut self, html: &str) -> Result<(), PdfError>;
    async fn print_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>, PdfError>;
    /// Shuts the browser down. Called exactly once per launched session.
    async fn close(&mut self) -> Result<(), PdfError>;
}

#[derive(Clone)]
pub struct PdfRenderer {
    browser: Arc<dyn Browser>,
    options: PdfOptions,
}

impl PdfRenderer {
    pub fn new(browser: Arc<dyn Browser>) -> Self {
        Self {
            browser,
            options: PdfOptions::default(),
        }
    }

    /// Renders `html_content` to PDF bytes in a browser launched for this call only.
    pub async fn render(&self, html_content: &str) -> Result<Vec<u8>, PdfError> {
        if html_content.is_empty() {
            return Err(PdfError::MissingContent);
        }

        let mut session = self.browser.launch().await?;
        debug!("browser launched, rendering {} bytes of html", html_content.len());

        let rendered = print_document(session.as_mut(), html_content, &self.options).await;

        // Released whether or not printing succeeded; a failed close is not the caller's problem.
        if let Err(err) = session.close().await {
            warn!("failed to close browser session: {}", err);
        }

        let pdf = rendered?;
        if pdf.is_empty() {
            return Err(PdfError::Render("browser produced an empty document".to_string()));
        }
        Ok(pdf)
    }
}

async fn print_document(
    session: &mut dyn BrowserSession,
    html_content: &str,
    options: &PdfOptions,
) -> Result<Vec<u8>, PdfError> {
    session.load_html(html_content).await?;
    session.print_pdf(options).await
}
