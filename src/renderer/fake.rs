//! Scripted renderer for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::app::{RatecastError, Result};
use crate::renderer::{PageRenderer, RenderSession};

/// How the document height evolves across `signal` calls.
#[derive(Debug, Clone)]
pub enum Heights {
    /// Played back in order; the last value repeats.
    Sequence(Vec<u64>),
    /// Grows on every sample; never stabilizes.
    Growing,
    /// `signal` never returns.
    Hang,
}

#[derive(Debug, Default)]
pub struct Log {
    pub opened: Vec<(String, Instant)>,
    pub reveals: usize,
    pub triggers: usize,
    pub closed: usize,
}

pub struct FakeRenderer {
    markup: String,
    heights: Heights,
    load_more_clicks: usize,
    failing: Vec<String>,
    pub log: Arc<Mutex<Log>>,
}

impl FakeRenderer {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            heights: Heights::Sequence(vec![1000]),
            load_more_clicks: 0,
            failing: Vec::new(),
            log: Arc::new(Mutex::new(Log::default())),
        }
    }

    pub fn with_heights(mut self, heights: Heights) -> Self {
        self.heights = heights;
        self
    }

    /// Number of times `trigger_more` reports a click before giving up.
    pub fn with_load_more_clicks(mut self, clicks: usize) -> Self {
        self.load_more_clicks = clicks;
        self
    }

    /// Opening any URL containing `fragment` fails.
    pub fn failing_on(mut self, fragment: &str) -> Self {
        self.failing.push(fragment.to_string());
        self
    }

    pub fn log(&self) -> std::sync::MutexGuard<'_, Log> {
        self.log.lock().unwrap()
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn open(&self, url: &str) -> Result<Box<dyn RenderSession>> {
        self.log
            .lock()
            .unwrap()
            .opened
            .push((url.to_string(), Instant::now()));

        if self.failing.iter().any(|f| url.contains(f.as_str())) {
            return Err(RatecastError::render_failure(url, "scripted failure"));
        }

        Ok(Box::new(FakeSession {
            url: url.to_string(),
            markup: self.markup.clone(),
            heights: self.heights.clone(),
            samples: 0,
            clicks_left: self.load_more_clicks,
            log: self.log.clone(),
        }))
    }
}

struct FakeSession {
    url: String,
    markup: String,
    heights: Heights,
    samples: usize,
    clicks_left: usize,
    log: Arc<Mutex<Log>>,
}

#[async_trait]
impl RenderSession for FakeSession {
    fn url(&self) -> &str {
        &self.url
    }

    async fn reveal_more(&mut self) -> Result<()> {
        self.log.lock().unwrap().reveals += 1;
        Ok(())
    }

    async fn signal(&mut self) -> Result<u64> {
        let index = self.samples;
        self.samples += 1;
        match &self.heights {
            Heights::Sequence(values) => Ok(values[index.min(values.len() - 1)]),
            Heights::Growing => Ok(1000 + 100 * index as u64),
            Heights::Hang => std::future::pending().await,
        }
    }

    async fn trigger_more(&mut self) -> Result<bool> {
        self.log.lock().unwrap().triggers += 1;
        if self.clicks_left > 0 {
            self.clicks_left -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn snapshot(&mut self) -> Result<String> {
        Ok(self.markup.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}
