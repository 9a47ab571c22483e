use async_trait::async_trait;
use fantoccini::{
    wd::{Capabilities, PrintConfiguration, PrintMargins, PrintSize},
    Client, ClientBuilder,
};
use log::{debug, trace};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::time::sleep;

use super::{Browser, BrowserSession, PdfError, PdfOptions};
use crate::BrowserSettings;

/// Flags for running Chrome in a locked-down container without a GPU.
const HEADLESS_ARGS: &[&str] = &[
    "--headless=new",
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--single-process",
    "--no-zygote",
    "--hide-scrollbars",
];

const WRITE_DOCUMENT: &str = "document.open(); document.write(arguments[0]); document.close();";
const PAGE_STATE: &str =
    "return [document.readyState, performance.getEntriesByType('resource').length];";

const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How long the resource count has to stay unchanged before the page counts as idle
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Launches Chrome through a WebDriver endpoint (e.g. chromedriver). Every
/// WebDriver session is its own browser process.
#[derive(Debug, Clone)]
pub struct WebDriverBrowser {
    settings: BrowserSettings,
}

impl WebDriverBrowser {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn capabilities(&self) -> Capabilities {
        let mut chrome_options = json!({ "args": HEADLESS_ARGS });
        if let Some(binary) = &self.settings.browser_binary {
            chrome_options["binary"] = Value::String(binary.clone());
        }

        let mut caps = Capabilities::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert("goog:chromeOptions".to_string(), chrome_options);
        caps
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, PdfError> {
        let client = ClientBuilder::rustls()
            .map_err(|e| PdfError::Launch(e.to_string()))?
            .capabilities(self.capabilities())
            .connect(&self.settings.webdriver_url)
            .await
            .map_err(|e| PdfError::Launch(e.to_string()))?;

        Ok(Box::new(WebDriverSession {
            client,
            settle_timeout: self.settings.settle_timeout,
        }))
    }
}

struct WebDriverSession {
    client: Client,
    settle_timeout: Duration,
}

impl WebDriverSession {
    /// Polls until the document is complete and no new resources showed up for
    /// [`IDLE_WINDOW`]. Gives up quietly after `settle_timeout`.
    async fn wait_for_network_idle(&self) -> Result<(), PdfError> {
        let started = Instant::now();
        let mut last_count = None;
        let mut stable_since = Instant::now();

        while started.elapsed() < self.settle_timeout {
            let state = self
                .client
                .execute(PAGE_STATE, vec![])
                .await
                .map_err(|e| PdfError::Load(e.to_string()))?;
            let ready = state.get(0).and_then(Value::as_str) == Some("complete");
            let count = state.get(1).and_then(Value::as_u64);
            trace!("page state: ready={} resources={:?}", ready, count);

            if count != last_count {
                last_count = count;
                stable_since = Instant::now();
            } else if ready && stable_since.elapsed() >= IDLE_WINDOW {
                return Ok(());
            }
            sleep(POLL_INTERVAL).await;
        }

        debug!(
            "page did not settle within {:?}, printing anyway",
            self.settle_timeout
        );
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn load_html(&mut self, html: &str) -> Result<(), PdfError> {
        self.client
            .goto("about:blank")
            .await
            .map_err(|e| PdfError::Load(e.to_string()))?;
        self.client
            .execute(WRITE_DOCUMENT, vec![Value::String(html.to_owned())])
            .await
            .map_err(|e| PdfError::Load(e.to_string()))?;
        self.wait_for_network_idle().await
    }

    async fn print_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>, PdfError> {
        let config = PrintConfiguration::builder()
            .background(options.print_background)
            .size(PrintSize {
                width: options.page_width,
                height: options.page_height,
            })
            .margins(PrintMargins {
                top: options.margin_top,
                bottom: options.margin_bottom,
                left: options.margin_left,
                right: options.margin_right,
            })
            .build()
            .map_err(|e| PdfError::Render(e.to_string()))?;

        self.client
            .print(config)
            .await
            .map_err(|e| PdfError::Render(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), PdfError> {
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| PdfError::Launch(e.to_string()))
    }
}
