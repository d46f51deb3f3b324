//! End-to-end analysis of one product and batches of products.
//!
//! ```text
//! request → ProductId → PaginationDriver → ReviewExtractor → RatingAggregator → AnalysisResult
//! ```

pub mod batch;
mod in_flight;

pub use batch::{BatchConfig, BatchCoordinator, BatchItem, BatchOutcome, BatchReport, MAX_BATCH_SIZE};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::app::Result;
use crate::config::Config;
use crate::domain::{AnalysisRequest, AnalysisResult, ProductId};
use crate::extract::{Diagnostics, ReviewExtractor};
use crate::pagination::{PaginationDriver, PaginationState};
use crate::rating::{self, RatingAggregator};
use crate::renderer::PageRenderer;

use in_flight::InFlight;

/// A finished analysis together with what happened along the way.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub diagnostics: Diagnostics,
    pub rounds: u32,
    pub pagination: PaginationState,
}

pub struct Analyzer {
    driver: PaginationDriver,
    extractor: ReviewExtractor,
    base_url: String,
    analysis_timeout: Duration,
    in_flight: InFlight,
}

impl Analyzer {
    pub fn new(renderer: Arc<dyn PageRenderer>, config: &Config) -> Result<Self> {
        Ok(Self {
            driver: PaginationDriver::new(
                renderer,
                config.pagination.clone(),
                config.renderer.timeout(),
            ),
            extractor: ReviewExtractor::new(config.extractor.clone())?,
            base_url: config.renderer.base_url.clone(),
            analysis_timeout: config.batch.analysis_timeout(),
            in_flight: InFlight::default(),
        })
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<Analysis> {
        self.analyze_at(request, Utc::now()).await
    }

    /// Analyze with an explicit reference time for review ages.
    pub async fn analyze_at(&self, request: &AnalysisRequest, now: DateTime<Utc>) -> Result<Analysis> {
        let product = ProductId::resolve(&request.input)?;
        rating::ensure_valid_target(request.target_rating)?;
        let url = product.reviews_url(&self.base_url)?;

        let page = {
            let _guard = self.in_flight.acquire(&product).await;
            self.driver
                .load_within(&url, self.driver.max_rounds(), self.analysis_timeout)
                .await?
        };

        let extraction = self.extractor.extract(&page.markup, now)?;
        let result = RatingAggregator::new(&extraction.reviews, now)
            .analyze(product, request.target_rating)?;

        info!(
            "Analyzed {}: rating {:.2}, {} reviews, {} more 5-star needed for {}",
            result.product_id,
            result.current_rating,
            result.statistics.total_reviews,
            result.required_5star_reviews,
            result.target_rating
        );

        Ok(Analysis {
            result,
            diagnostics: extraction.diagnostics,
            rounds: page.rounds,
            pagination: page.state,
        })
    }
}
