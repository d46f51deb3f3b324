use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::{RatecastError, Result};
use crate::renderer::config::RendererConfig;
use crate::renderer::{PageRenderer, RenderSession};

/// Fetches server-rendered listings without executing scripts.
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(config: &RendererConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true);

        if let Some(ref ua) = config.user_agent {
            builder = builder.user_agent(ua.clone());
        }

        let client = builder
            .build()
            .map_err(|e| RatecastError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn open(&self, url: &str) -> Result<Box<dyn RenderSession>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RatecastError::render_failure(url, e))?;

        let response = response
            .error_for_status()
            .map_err(|e| RatecastError::render_failure(url, e))?;

        let markup = response
            .text()
            .await
            .map_err(|e| RatecastError::render_failure(url, e))?;

        Ok(Box::new(StaticSession {
            url: url.to_string(),
            markup,
        }))
    }
}

/// A fully materialized document; nothing more can be revealed.
struct StaticSession {
    url: String,
    markup: String,
}

#[async_trait]
impl RenderSession for StaticSession {
    fn url(&self) -> &str {
        &self.url
    }

    async fn reveal_more(&mut self) -> Result<()> {
        Ok(())
    }

    async fn signal(&mut self) -> Result<u64> {
        Ok(self.markup.len() as u64)
    }

    async fn trigger_more(&mut self) -> Result<bool> {
        Ok(false)
    }

    async fn snapshot(&mut self) -> Result<String> {
        Ok(self.markup.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
