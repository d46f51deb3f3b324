use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::app::{RatecastError, Result};
use crate::renderer::config::RendererConfig;
use crate::renderer::scripts::{self, DOCUMENT_HEIGHT, SCROLL_TO_BOTTOM};
use crate::renderer::{PageRenderer, RenderSession};

/// Chrome-based renderer using chromiumoxide
pub struct ChromeRenderer {
    browser: Arc<Browser>,
    config: RendererConfig,
    sessions: Arc<Semaphore>,
}

impl ChromeRenderer {
    /// Launch a browser with the given configuration
    pub async fn new(config: RendererConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer")
            .window_size(1920, 1080);

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder.build().map_err(|e| {
            RatecastError::Config(format!("Failed to build browser config: {}", e))
        })?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            RatecastError::Config(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        // Drive the CDP connection
        tokio::spawn(async move { while let Some(_event) = handler.next().await {} });

        let sessions = Arc::new(Semaphore::new(config.max_sessions.max(1)));

        Ok(Self {
            browser: Arc::new(browser),
            config,
            sessions,
        })
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn open(&self, url: &str) -> Result<Box<dyn RenderSession>> {
        let permit = self
            .sessions
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| RatecastError::render_failure(url, format!("Semaphore error: {}", e)))?;

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RatecastError::render_failure(url, format!("Failed to create page: {}", e)))?;
        let tab = TabGuard(Some(page.clone()));

        if let Some(ref ua) = self.config.user_agent {
            page.set_user_agent(ua).await.map_err(|e| {
                RatecastError::render_failure(url, format!("Failed to set user agent: {}", e))
            })?;
        }

        page.goto(url)
            .await
            .map_err(|e| RatecastError::render_failure(url, format!("Navigation failed: {}", e)))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| RatecastError::render_failure(url, format!("Navigation failed: {}", e)))?;

        // Additional wait for dynamic content
        tokio::time::sleep(self.config.wait_after_load()).await;

        Ok(Box::new(ChromeSession {
            url: url.to_string(),
            page,
            load_more: scripts::load_more_script(
                &self.config.load_more_labels,
                &self.config.load_more_scope,
            ),
            tab,
            _permit: permit,
        }))
    }
}

/// Closes the tab in the background if dropped while still armed.
///
/// A dropped `Page` does not close its target; this covers an `open` that
/// fails or is cancelled halfway and a session dropped without `close`.
struct TabGuard(Option<Page>);

impl TabGuard {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        let Some(page) = self.0.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        debug!("Failed to close abandoned tab: {}", e);
                    }
                });
            }
            Err(_) => warn!("Abandoned browser tab left open: no runtime to close it"),
        }
    }
}

/// One open browser tab.
struct ChromeSession {
    url: String,
    page: Page,
    load_more: String,
    tab: TabGuard,
    _permit: OwnedSemaphorePermit,
}

impl ChromeSession {
    async fn eval_number(&self, script: &str) -> Result<u64> {
        let height: f64 = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| RatecastError::render_failure(&self.url, format!("Script execution failed: {}", e)))?
            .into_value()
            .map_err(|e| RatecastError::render_failure(&self.url, format!("Failed to parse result: {:?}", e)))?;
        Ok(height.max(0.0) as u64)
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    fn url(&self) -> &str {
        &self.url
    }

    async fn reveal_more(&mut self) -> Result<()> {
        self.eval_number(SCROLL_TO_BOTTOM).await.map(|_| ())
    }

    async fn signal(&mut self) -> Result<u64> {
        self.eval_number(DOCUMENT_HEIGHT).await
    }

    async fn trigger_more(&mut self) -> Result<bool> {
        let clicked: bool = self
            .page
            .evaluate(self.load_more.as_str())
            .await
            .map_err(|e| RatecastError::render_failure(&self.url, format!("Script execution failed: {}", e)))?
            .into_value()
            .map_err(|e| RatecastError::render_failure(&self.url, format!("Failed to parse result: {:?}", e)))?;
        if clicked {
            debug!("Clicked load-more on {}", self.url);
        }
        Ok(clicked)
    }

    async fn snapshot(&mut self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| RatecastError::render_failure(&self.url, format!("Failed to read content: {}", e)))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromeSession { url, page, mut tab, .. } = *self;
        tab.disarm();
        page.close()
            .await
            .map_err(|e| RatecastError::render_failure(&url, format!("Failed to close page: {}", e)))
    }
}
