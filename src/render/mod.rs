//! The renderer capability: an injectable seam over a shared headless
//! browser. One long-lived browser per run, one short-lived page per job.
//! Tests substitute deterministic stubs; production uses [`chrome`].

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub mod chrome;

/// Where the Slack message builder lives.
pub const BUILDER_URL: &str = "https://api.slack.com/docs/messages/builder";
/// Element that disappears once the builder has finished rendering.
pub const LOADING_INDICATOR: &str = "#message_loading_indicator";
/// Container whose exact bounding box is captured.
pub const MESSAGE_CONTAINER: &str = "#msgs_div";
/// Upper bound on the readiness wait.
pub const READY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("message builder did not become ready within {}s", READY_TIMEOUT.as_secs())]
    Timeout,
    #[error("browser error: {0}")]
    Browser(String),
    #[error("capture failed: {0}")]
    Capture(String),
}

/// Builder URL carrying the wire-serialized message as the `msg` parameter.
pub fn builder_url(wire: &str) -> Result<Url, RenderError> {
    Url::parse_with_params(BUILDER_URL, &[("msg", wire)])
        .map_err(|e| RenderError::Browser(e.to_string()))
}

/// One isolated page session. A failed capture may be retried on the same
/// page before it is released.
#[async_trait]
pub trait RenderPage: Send {
    /// Navigate to the builder carrying `wire`, wait for readiness, then
    /// screenshot the message container.
    async fn capture(&mut self, wire: &str) -> Result<Vec<u8>, RenderError>;

    /// Release the page. Failures are logged, never propagated.
    async fn close(self: Box<Self>);
}

/// The long-lived browser shared by the whole run. Pages are handed out to
/// concurrently running jobs; the browser itself is only torn down after all
/// jobs have settled.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn open_page(&self) -> Result<Box<dyn RenderPage>, RenderError>;

    async fn shutdown(&self) -> Result<(), RenderError>;
}
