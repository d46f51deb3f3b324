//! # ratecast
//!
//! Forecasts how many fresh 5-star reviews a marketplace product needs to
//! reach a target rating, given that older reviews count for less.
//!
//! ## Architecture
//!
//! ```text
//! ProductId → PaginationDriver → ReviewExtractor → RatingAggregator → AnalysisResult
//! ```
//!
//! - [`renderer`]: headless Chrome or plain HTTP page rendering
//! - [`pagination`]: reveals every review on a listing page
//! - [`extract`]: turns markup into dated, rated reviews
//! - [`rating`]: time-decayed weighting and the required-count solver
//!
//! ## Quick Start
//!
//! ```bash
//! # One product
//! ratecast analyze https://www.ozon.ru/product/some-item-123456789/ --target 4.7
//!
//! # Many products, one per line
//! ratecast batch products.txt --output report.csv
//!
//! # Watch a product
//! ratecast monitor 123456789 --interval 6h
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the renderer,
/// the analyzer and the result cache.
pub mod app;

/// Configuration loaded from `~/.config/ratecast/config.toml`.
pub mod config;

/// Command-line interface using clap.
///
/// - `analyze <product>` - Analyze one product
/// - `batch <file>` - Analyze a list of products
/// - `monitor <product>` - Re-analyze on an interval
/// - `cache purge` - Drop expired cached results
pub mod cli;

/// Core domain models.
///
/// - [`ProductId`](domain::ProductId): Canonical product identifier
/// - [`Review`](domain::Review): A rated, dated review
/// - [`AnalysisResult`](domain::AnalysisResult): Outcome of one analysis
pub mod domain;

/// Review extraction from rendered listing markup.
pub mod extract;

/// Periodic re-analysis of one product.
pub mod monitor;

/// Reveal-until-stable pagination over a [`RenderSession`](renderer::RenderSession).
pub mod pagination;

/// Single-product and batch analysis.
pub mod pipeline;

/// Time-decayed rating math.
pub mod rating;

/// Page rendering backends.
///
/// - [`PageRenderer`](renderer::PageRenderer): Async trait for opening pages
/// - [`ChromeRenderer`](renderer::ChromeRenderer): chromiumoxide-based implementation
/// - [`HttpRenderer`](renderer::HttpRenderer): reqwest-based implementation
pub mod renderer;

/// Result cache.
///
/// - [`ResultCache`](store::ResultCache): Trait defining cache operations
/// - [`SqliteCache`](store::SqliteCache): SQLite implementation
pub mod store;
