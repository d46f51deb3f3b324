//! Conversion of rendered review listings into [`Review`] records.
//!
//! ```text
//! markup → containers (cascade) → {rating, date, text} per container → Review
//! ```
//!
//! Faults are local: a container that cannot be read is skipped and recorded
//! in [`Diagnostics`], the rest of the listing is still processed.

pub mod config;
pub mod dates;
pub mod selectors;

pub use config::ExtractorConfig;
pub use dates::{DateLocale, DateParseWarning, DateResolver, Resolution};
pub use selectors::SelectorChain;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use tracing::{debug, info};

use crate::app::Result;
use crate::domain::Review;

/// Why a single container did not produce a review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerFault {
    /// No filled-star indicators under any strategy; not a review.
    NoRating,
    /// More indicators than the rating scale allows.
    RatingOutOfRange(usize),
    /// Neither date selector found any text.
    MissingDate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionWarning {
    DateParse(DateParseWarning),
    ContainerSkipped { index: usize, fault: ContainerFault },
}

/// Side channel returned with every extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    /// Selector that located the containers, if any did.
    pub container_selector: Option<String>,
    pub containers_found: usize,
    pub warnings: Vec<ExtractionWarning>,
}

impl Diagnostics {
    pub fn date_warnings(&self) -> impl Iterator<Item = &DateParseWarning> {
        self.warnings.iter().filter_map(|w| match w {
            ExtractionWarning::DateParse(d) => Some(d),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (usize, &ContainerFault)> {
        self.warnings.iter().filter_map(|w| match w {
            ExtractionWarning::ContainerSkipped { index, fault } => Some((*index, fault)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub reviews: Vec<Review>,
    pub diagnostics: Diagnostics,
}

struct CompiledCascades {
    containers: SelectorChain,
    rating: SelectorChain,
    date: SelectorChain,
    text: SelectorChain,
}

impl CompiledCascades {
    fn compile(config: &ExtractorConfig) -> Result<Self> {
        Ok(Self {
            containers: SelectorChain::compile(&config.containers)?,
            rating: SelectorChain::compile(&config.rating)?,
            date: SelectorChain::compile(&config.date)?,
            text: SelectorChain::compile(&config.text)?,
        })
    }
}

pub struct ReviewExtractor {
    cascades: CompiledCascades,
    dates: DateResolver,
}

impl ReviewExtractor {
    /// Compiles every configured selector up front.
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        Self::with_resolver(config, DateResolver::with_default_locales()?)
    }

    pub fn with_resolver(config: ExtractorConfig, dates: DateResolver) -> Result<Self> {
        Ok(Self {
            cascades: CompiledCascades::compile(&config)?,
            dates,
        })
    }

    /// Extract every review in `markup`, resolving relative dates against `now`.
    pub fn extract(&self, markup: &str, now: DateTime<Utc>) -> Result<Extraction> {
        let cascades = &self.cascades;
        let document = Html::parse_document(markup);
        let mut extraction = Extraction::default();

        let Some((selector, containers)) = cascades.containers.first_nonempty(&document) else {
            info!("No review containers found");
            return Ok(extraction);
        };

        extraction.diagnostics.container_selector = Some(selector.to_string());
        extraction.diagnostics.containers_found = containers.len();
        info!("Found {} review containers via {}", containers.len(), selector);

        for (index, container) in containers.into_iter().enumerate() {
            match self.extract_container(cascades, container, now, &mut extraction.diagnostics) {
                Ok(review) => extraction.reviews.push(review),
                Err(fault) => {
                    debug!("Skipping container {}: {:?}", index, fault);
                    extraction
                        .diagnostics
                        .warnings
                        .push(ExtractionWarning::ContainerSkipped { index, fault });
                }
            }
        }

        info!("Extracted {} reviews", extraction.reviews.len());
        Ok(extraction)
    }

    fn extract_container(
        &self,
        cascades: &CompiledCascades,
        container: ElementRef<'_>,
        now: DateTime<Utc>,
        diagnostics: &mut Diagnostics,
    ) -> std::result::Result<Review, ContainerFault> {
        let stars = cascades
            .rating
            .first_count(container)
            .ok_or(ContainerFault::NoRating)?;
        let rating = u8::try_from(stars).map_err(|_| ContainerFault::RatingOutOfRange(stars))?;

        let date_text = cascades
            .date
            .first_text(container)
            .ok_or(ContainerFault::MissingDate)?;
        let resolution = self.dates.resolve(&date_text, now);
        let text = cascades.text.first_text(container);

        let review = Review::new(rating, resolution.at, text)
            .ok_or(ContainerFault::RatingOutOfRange(stars))?;

        if let Some(warning) = resolution.warning {
            diagnostics.warnings.push(ExtractionWarning::DateParse(warning));
        }
        Ok(review)
    }
}
