//! Bounded-concurrency render fan-out. One page per job against the shared
//! renderer, at most `limit` jobs inside the capture protocol at once, one
//! retry per job. Every submitted job settles before the run moves on;
//! completion order is unconstrained.

use crate::internal::models::{JobMap, Message};
use crate::render::{RenderError, Renderer};
use futures::{StreamExt, stream};

/// Terminal state of one render job.
#[derive(Debug)]
pub struct RenderOutcome {
    pub path: String,
    pub result: Result<Vec<u8>, RenderError>,
}

/// Render every job in the map through one run-wide concurrency gate.
pub async fn render_all(renderer: &dyn Renderer, jobs: JobMap, limit: usize) -> Vec<RenderOutcome> {
    let limit = limit.max(1);
    stream::iter(jobs)
        .map(|(path, message)| render_one(renderer, path, message))
        .buffer_unordered(limit)
        .collect()
        .await
}

/// One page per job; the capture is retried exactly once, then the job fails
/// permanently. The page is released regardless of outcome.
async fn render_one(renderer: &dyn Renderer, path: String, message: Message) -> RenderOutcome {
    let wire = message.to_wire();

    let mut page = match renderer.open_page().await {
        Ok(page) => page,
        Err(e) => {
            tracing::error!(path = %path, error = %e, "could not open a page");
            return RenderOutcome {
                path,
                result: Err(e),
            };
        }
    };

    let result = match page.capture(&wire).await {
        Ok(bytes) => Ok(bytes),
        Err(first) => {
            tracing::warn!(path = %path, error = %first, "render failed, retrying");
            page.capture(&wire).await
        }
    };
    page.close().await;

    match &result {
        Ok(bytes) => tracing::info!(path = %path, bytes = bytes.len(), "rendered"),
        Err(e) => tracing::error!(path = %path, error = %e, "render failed permanently"),
    }

    RenderOutcome { path, result }
}
