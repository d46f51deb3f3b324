//! Page rendering collaborators.
//!
//! The pipeline only needs a way to open a listing, reveal more of it,
//! sample a cheap "has anything changed" signal and read the final markup.
//!
//! ```text
//! PageRenderer::open(url) → RenderSession → reveal_more / signal / trigger_more → snapshot
//! ```
//!
//! - [`ChromeRenderer`]: headless Chrome, for script-driven listings
//! - [`HttpRenderer`]: plain HTTP, for server-rendered listings

mod chrome;
mod config;
mod http;
mod scripts;

#[cfg(test)]
pub(crate) mod fake;

use std::sync::Arc;

pub use chrome::ChromeRenderer;
pub use config::{RendererBackend, RendererConfig};
pub use http::HttpRenderer;

use crate::app::Result;
use async_trait::async_trait;

/// Something that can render a dynamic page.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Open `url` and wait for the initial content to settle.
    async fn open(&self, url: &str) -> Result<Box<dyn RenderSession>>;
}

/// One rendered page kept open across pagination rounds.
#[async_trait]
pub trait RenderSession: Send {
    fn url(&self) -> &str;

    /// Ask the page to load more content (scroll to the bottom).
    async fn reveal_more(&mut self) -> Result<()>;

    /// Cheap structural signal, e.g. document height.
    async fn signal(&mut self) -> Result<u64>;

    /// Click an explicit "load more" control. `false` when none is present.
    async fn trigger_more(&mut self) -> Result<bool>;

    /// Current markup of the whole document.
    async fn snapshot(&mut self) -> Result<String>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Build the renderer selected in `config`.
pub async fn from_config(config: &RendererConfig) -> Result<Arc<dyn PageRenderer>> {
    Ok(match config.backend {
        RendererBackend::Chrome => Arc::new(ChromeRenderer::new(config.clone()).await?),
        RendererBackend::Http => Arc::new(HttpRenderer::new(config)?),
    })
}
