//! Production renderer driving headless Chrome over the DevTools protocol.

use super::{
    LOADING_INDICATOR, MESSAGE_CONTAINER, READY_TIMEOUT, RenderError, RenderPage, Renderer,
    builder_url,
};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const VIEWPORT_WIDTH: u32 = 1000;
const VIEWPORT_HEIGHT: u32 = 600;
const DEVICE_SCALE_FACTOR: f64 = 2.0;
const READY_POLL: Duration = Duration::from_millis(250);

/// One headless Chrome instance for the whole run. Never reconfigured after
/// launch; jobs only touch it through page-scoped sessions.
pub struct ChromeRenderer {
    browser: Mutex<Browser>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl ChromeRenderer {
    pub async fn launch() -> Result<Self, RenderError> {
        let config = BrowserConfig::builder()
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                device_scale_factor: Some(DEVICE_SCALE_FACTOR),
                ..Viewport::default()
            })
            .build()
            .map_err(RenderError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;

        // Drive the CDP event loop until the browser goes away.
        let event_loop = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser: Mutex::new(browser),
            event_loop: Mutex::new(Some(event_loop)),
        })
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn open_page(&self) -> Result<Box<dyn RenderPage>, RenderError> {
        let browser = self.browser.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;
        Ok(Box::new(ChromePage { page }))
    }

    async fn shutdown(&self) -> Result<(), RenderError> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;
        browser
            .wait()
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;
        if let Some(event_loop) = self.event_loop.lock().await.take() {
            let _ = event_loop.await;
        }
        Ok(())
    }
}

struct ChromePage {
    page: Page,
}

#[async_trait]
impl RenderPage for ChromePage {
    async fn capture(&mut self, wire: &str) -> Result<Vec<u8>, RenderError> {
        let url = builder_url(wire)?;
        self.page
            .goto(url.as_str())
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;

        wait_until_ready(&self.page).await?;

        let container = self
            .page
            .find_element(MESSAGE_CONTAINER)
            .await
            .map_err(|e| RenderError::Capture(e.to_string()))?;
        container
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| RenderError::Capture(e.to_string()))
    }

    async fn close(self: Box<Self>) {
        let ChromePage { page } = *self;
        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "failed to close page");
        }
    }
}

/// Poll until the loading indicator is gone or hidden, bounded by
/// [`READY_TIMEOUT`].
async fn wait_until_ready(page: &Page) -> Result<(), RenderError> {
    let probe = format!(
        "(() => {{ const el = document.querySelector('{LOADING_INDICATOR}'); return el === null || el.offsetParent === null; }})()"
    );
    let deadline = tokio::time::Instant::now() + READY_TIMEOUT;

    loop {
        let ready = page
            .evaluate(probe.as_str())
            .await
            .ok()
            .and_then(|result| result.into_value::<bool>().ok())
            .unwrap_or(false);
        if ready {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(RenderError::Timeout);
        }
        tokio::time::sleep(READY_POLL).await;
    }
}
