//! Progressive loading of a review listing.
//!
//! The driver is a bounded state machine:
//!
//! ```text
//! Scrolling ──signal unchanged, no load-more──▶ Stabilized
//!     │
//!     └──────────round limit reached──────────▶ Exhausted
//! ```
//!
//! Every renderer call is bounded by a timeout, and every round waits a
//! settle period before re-sampling the signal. An opened session is always
//! closed, including when an overall budget expires.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::app::{RatecastError, Result};
use crate::renderer::{PageRenderer, RenderSession};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Hard upper bound on reveal rounds (default: 50)
    pub max_rounds: u32,

    /// Wait after each scroll before re-sampling, in milliseconds (default: 1500)
    pub settle_ms: u64,

    /// Wait after clicking "load more", in milliseconds (default: 1000)
    pub trigger_settle_ms: u64,

    /// Emit a progress event every N rounds (default: 10, 0 disables)
    pub progress_every: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_rounds: 50,
            settle_ms: 1500,
            trigger_settle_ms: 1000,
            progress_every: 10,
        }
    }
}

impl PaginationConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn trigger_settle(&self) -> Duration {
        Duration::from_millis(self.trigger_settle_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    Scrolling,
    /// The signal stopped changing and nothing was left to click.
    Stabilized,
    /// The round limit was hit first.
    Exhausted,
}

/// Final markup of a listing plus how it was obtained.
#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub url: String,
    pub markup: String,
    pub rounds: u32,
    pub state: PaginationState,
}

pub struct PaginationDriver {
    renderer: Arc<dyn PageRenderer>,
    config: PaginationConfig,
    call_timeout: Duration,
}

impl PaginationDriver {
    pub fn new(renderer: Arc<dyn PageRenderer>, config: PaginationConfig, call_timeout: Duration) -> Self {
        Self {
            renderer,
            config,
            call_timeout,
        }
    }

    pub fn max_rounds(&self) -> u32 {
        self.config.max_rounds
    }

    /// Render `url`, reveal as much as possible within `max_rounds`, return the markup.
    pub async fn load_all(&self, url: &Url, max_rounds: u32) -> Result<LoadedPage> {
        self.load(url, max_rounds, None).await
    }

    /// Like [`load_all`](Self::load_all), but the whole load must finish within `budget`.
    ///
    /// The session is closed even when the budget runs out mid-pagination.
    pub async fn load_within(&self, url: &Url, max_rounds: u32, budget: Duration) -> Result<LoadedPage> {
        self.load(url, max_rounds, Some(budget)).await
    }

    async fn load(&self, url: &Url, max_rounds: u32, budget: Option<Duration>) -> Result<LoadedPage> {
        let url = url.as_str();
        info!("Loading {}", url);

        let deadline = budget.map(|budget| (Instant::now() + budget, budget));
        let over_budget = |after: Duration| RatecastError::RenderTimeout {
            url: url.to_string(),
            after,
        };

        let open = self.bounded(url, self.renderer.open(url));
        let mut session = match deadline {
            Some((at, budget)) => timeout_at(at, open).await.map_err(|_| over_budget(budget))??,
            None => open.await?,
        };

        let work = self.collect(session.as_mut(), url, max_rounds);
        let outcome = match deadline {
            Some((at, budget)) => timeout_at(at, work)
                .await
                .unwrap_or_else(|_| Err(over_budget(budget))),
            None => work.await,
        };

        if let Err(e) = self.bounded(url, session.close()).await {
            warn!("Failed to close session for {}: {}", url, e);
        }

        if let Ok(ref page) = outcome {
            info!(
                "Finished loading {} after {} rounds ({:?})",
                url, page.rounds, page.state
            );
        }
        outcome
    }

    async fn collect(&self, session: &mut dyn RenderSession, url: &str, max_rounds: u32) -> Result<LoadedPage> {
        let (rounds, state) = self.paginate(session, max_rounds).await?;
        let markup = self.bounded(url, session.snapshot()).await?;
        Ok(LoadedPage {
            url: url.to_string(),
            markup,
            rounds,
            state,
        })
    }

    async fn paginate(
        &self,
        session: &mut dyn RenderSession,
        max_rounds: u32,
    ) -> Result<(u32, PaginationState)> {
        let url = session.url().to_string();
        let mut last = self.bounded(&url, session.signal()).await?;
        let mut rounds = 0;
        let mut state = PaginationState::Scrolling;

        while state == PaginationState::Scrolling {
            if rounds >= max_rounds {
                state = PaginationState::Exhausted;
                continue;
            }

            state = self.round(session, &url, &mut last).await?;
            rounds += 1;

            if self.config.progress_every > 0 && rounds % self.config.progress_every == 0 {
                info!(rounds, signal = last, "Pagination progress on {}", url);
            }
        }

        Ok((rounds, state))
    }

    /// One reveal-settle-sample step.
    async fn round(
        &self,
        session: &mut dyn RenderSession,
        url: &str,
        last: &mut u64,
    ) -> Result<PaginationState> {
        self.bounded(url, session.reveal_more()).await?;
        tokio::time::sleep(self.config.settle()).await;

        let current = self.bounded(url, session.signal()).await?;
        let mut state = PaginationState::Scrolling;

        if current == *last {
            if self.bounded(url, session.trigger_more()).await? {
                debug!("Signal stable at {}, clicked load-more", current);
                tokio::time::sleep(self.config.trigger_settle()).await;
            } else {
                state = PaginationState::Stabilized;
            }
        }

        *last = current;
        Ok(state)
    }

    async fn bounded<T>(&self, url: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| RatecastError::RenderTimeout {
                url: url.to_string(),
                after: self.call_timeout,
            })?
    }
}
