use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::app::{AppContext, RatecastError, Result};
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::domain::{AnalysisRequest, AnalysisResult, ProductId};
use crate::monitor::{self, Monitor, Observation};
use crate::pipeline::{BatchCoordinator, BatchItem, BatchOutcome, BatchReport, MAX_BATCH_SIZE};
use crate::store::{ResultCache, SqliteCache};

const HISTOGRAM_WIDTH: usize = 30;

pub async fn analyze(
    ctx: &AppContext,
    input: &str,
    target: f64,
    format: OutputFormat,
    force_refresh: bool,
) -> Result<()> {
    let request = AnalysisRequest::new(input, target)?;
    let product = ProductId::resolve(&request.input)?;
    let now = Utc::now();
    let cache = ctx.cache.as_deref();

    if !force_refresh {
        if let Some(cached) = cache.and_then(|c| cached_result(c, &product, request.target_rating, now)) {
            return print_result(&cached, format);
        }
    }

    let analysis = ctx.analyzer.analyze_at(&request, now).await?;

    let date_warnings = analysis.diagnostics.date_warnings().count();
    let skipped = analysis.diagnostics.skipped().count();
    if date_warnings > 0 || skipped > 0 {
        eprintln!(
            "Note: {} unparsed dates counted as today, {} containers skipped",
            date_warnings, skipped
        );
    }

    print_result(&analysis.result, format)?;

    if let Some(cache) = cache {
        store_result(cache, &analysis.result, now, ctx.config.cache.ttl());
    }
    Ok(())
}

/// Cached result for `(product, target)`; an unreadable cache counts as a miss.
fn cached_result(
    cache: &dyn ResultCache,
    product: &ProductId,
    target: f64,
    now: DateTime<Utc>,
) -> Option<AnalysisResult> {
    match cache.get(product, target, now) {
        Ok(Some(cached)) => {
            info!("Using cached result for {} (expires {})", product, cached.expires_at);
            Some(cached.result)
        }
        Ok(None) => None,
        Err(e) => {
            warn!("Ignoring cache entry for {}: {}", product, e);
            None
        }
    }
}

fn store_result(cache: &dyn ResultCache, result: &AnalysisResult, now: DateTime<Utc>, ttl: chrono::Duration) {
    if let Err(e) = cache.put(result, now, ttl) {
        warn!("Failed to cache result for {}: {}", result.product_id, e);
    }
}

pub async fn batch(
    ctx: &AppContext,
    path: &Path,
    target: f64,
    output: Option<&Path>,
    format: Option<OutputFormat>,
) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let requests = read_requests(&content, target)?;

    if requests.is_empty() {
        println!("No products in {}", path.display());
        return Ok(());
    }

    println!("Analyzing {} products...", requests.len());
    let report = run_in_chunks(&ctx.batch(), requests).await?;

    let format = match (output, format) {
        (_, Some(format)) => format,
        (Some(_), None) => OutputFormat::Csv,
        (None, None) => OutputFormat::Table,
    };

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            write_report(&report, format, file)?;
            println!("Report written to {}", path.display());
            print!("{}", render_batch_summary(&report));
        }
        None if format == OutputFormat::Table => print!("{}", render_batch_summary(&report)),
        None => write_report(&report, format, std::io::stdout())?,
    }

    Ok(())
}

pub async fn monitor(ctx: &AppContext, input: &str, every: &str, target: f64) -> Result<()> {
    let secs = monitor::parse_interval(every).map_err(RatecastError::InvalidRequest)?;
    let request = AnalysisRequest::new(input, target)?;

    println!(
        "Monitoring {} every {} (Ctrl-C to stop)",
        request.input,
        monitor::format_interval(secs)
    );

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    Monitor::new(ctx.analyzer.clone(), request, Duration::from_secs(secs))
        .run(shutdown, |outcome| {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            match outcome {
                Ok(observation) => println!("[{}] {}", timestamp, describe_observation(observation)),
                Err(e) => eprintln!("[{}] Analysis failed: {}", timestamp, e),
            }
        })
        .await
}

pub fn purge_cache(config: &Config) -> Result<()> {
    if !config.cache.enabled {
        println!("Result cache is disabled");
        return Ok(());
    }

    let path = config
        .cache_path()
        .map_err(|e| RatecastError::Config(e.to_string()))?;
    let cache = SqliteCache::new(&path)?;
    let removed = cache.purge_expired(Utc::now())?;
    println!("Removed {} expired entries from {}", removed, path.display());
    Ok(())
}

/// One request per non-empty line.
fn read_requests(content: &str, target: f64) -> Result<Vec<AnalysisRequest>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| AnalysisRequest::new(line, target))
        .collect()
}

/// Feed the coordinator at most [`MAX_BATCH_SIZE`] requests at a time,
/// keeping indices relative to the whole input.
async fn run_in_chunks(
    coordinator: &BatchCoordinator,
    requests: Vec<AnalysisRequest>,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    for (chunk_no, chunk) in requests.chunks(MAX_BATCH_SIZE).enumerate() {
        let offset = chunk_no * MAX_BATCH_SIZE;
        let partial = coordinator.run(chunk.to_vec()).await?;
        report.items.extend(partial.items.into_iter().map(|mut item| {
            item.index += offset;
            item
        }));
    }
    Ok(report)
}

fn print_result(result: &AnalysisResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print!("{}", render_table(result)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer.serialize(ResultRow::from(result))?;
            writer.flush()?;
        }
    }
    Ok(())
}

fn write_report<W: Write>(report: &BatchReport, format: OutputFormat, mut out: W) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, report)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for item in &report.items {
                writer.serialize(BatchRow::from(item))?;
            }
            writer.flush()?;
        }
        OutputFormat::Table => write!(out, "{}", render_batch_summary(report))?,
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    product_id: &'a str,
    current_rating: f64,
    target_rating: f64,
    required_5star_reviews: u64,
    total_reviews: usize,
    active_reviews: usize,
    total_weight: f64,
    weighted_sum: f64,
    average_age_days: f64,
}

impl<'a> From<&'a AnalysisResult> for ResultRow<'a> {
    fn from(result: &'a AnalysisResult) -> Self {
        Self {
            product_id: result.product_id.as_str(),
            current_rating: result.current_rating,
            target_rating: result.target_rating,
            required_5star_reviews: result.required_5star_reviews,
            total_reviews: result.statistics.total_reviews,
            active_reviews: result.statistics.active_reviews,
            total_weight: result.total_weight,
            weighted_sum: result.weighted_sum,
            average_age_days: result.statistics.average_age_days,
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchRow<'a> {
    index: usize,
    input: &'a str,
    status: &'static str,
    product_id: Option<&'a str>,
    current_rating: Option<f64>,
    target_rating: Option<f64>,
    required_5star_reviews: Option<u64>,
    total_reviews: Option<usize>,
    active_reviews: Option<usize>,
    error: Option<&'a str>,
}

impl<'a> From<&'a BatchItem> for BatchRow<'a> {
    fn from(item: &'a BatchItem) -> Self {
        let mut row = Self {
            index: item.index,
            input: &item.input,
            status: "failure",
            product_id: None,
            current_rating: None,
            target_rating: None,
            required_5star_reviews: None,
            total_reviews: None,
            active_reviews: None,
            error: None,
        };
        match &item.outcome {
            BatchOutcome::Success { result } => {
                row.status = "success";
                row.product_id = Some(result.product_id.as_str());
                row.current_rating = Some(result.current_rating);
                row.target_rating = Some(result.target_rating);
                row.required_5star_reviews = Some(result.required_5star_reviews);
                row.total_reviews = Some(result.statistics.total_reviews);
                row.active_reviews = Some(result.statistics.active_reviews);
            }
            BatchOutcome::Failure { error, .. } => row.error = Some(error),
        }
        row
    }
}

/// Bar of `count` scaled so that `max` fills the whole width.
fn histogram_bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (count * HISTOGRAM_WIDTH + max / 2) / max;
    "█".repeat(len)
}

fn render_table(result: &AnalysisResult) -> String {
    let stats = &result.statistics;
    let mut out = String::new();

    let _ = writeln!(out, "Product:            {}", result.product_id);
    let _ = writeln!(out, "Current rating:     {:.2}", result.current_rating);
    let _ = writeln!(out, "Target rating:      {:.2}", result.target_rating);
    if result.goal_reached() {
        let _ = writeln!(out, "5★ reviews needed:  0 (target already reached)");
    } else {
        let _ = writeln!(out, "5★ reviews needed:  {}", result.required_5star_reviews);
    }
    let _ = writeln!(
        out,
        "Reviews:            {} total, {} active",
        stats.total_reviews, stats.active_reviews
    );
    let _ = writeln!(
        out,
        "Weight:             {:.2} (weighted sum {:.2})",
        result.total_weight, result.weighted_sum
    );
    let _ = writeln!(
        out,
        "Review age:         {:.1} days avg, newest {}, oldest {}",
        stats.average_age_days, stats.newest_review_days, stats.oldest_review_days
    );

    let max = stats.rating_distribution.values().copied().max().unwrap_or(0);
    let _ = writeln!(out, "\nDistribution");
    for (stars, count) in stats.rating_distribution.iter().rev() {
        let _ = writeln!(
            out,
            "{}★ {:<width$} {}",
            stars,
            histogram_bar(*count, max),
            count,
            width = HISTOGRAM_WIDTH
        );
    }

    out
}

fn render_batch_summary(report: &BatchReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Batch complete: {} succeeded, {} failed\n",
        report.successes().count(),
        report.failures().count()
    );
    let _ = writeln!(
        out,
        "{:>3}  {:<14} {:>7} {:>7} {:>7}  {}",
        "#", "product", "rating", "target", "needed", "note"
    );
    for item in &report.items {
        match &item.outcome {
            BatchOutcome::Success { result } => {
                let _ = writeln!(
                    out,
                    "{:>3}  {:<14} {:>7.2} {:>7.2} {:>7}  {} reviews",
                    item.index,
                    result.product_id.as_str(),
                    result.current_rating,
                    result.target_rating,
                    result.required_5star_reviews,
                    result.statistics.total_reviews
                );
            }
            BatchOutcome::Failure { error, .. } => {
                let _ = writeln!(
                    out,
                    "{:>3}  {:<14} {:>7} {:>7} {:>7}  {}",
                    item.index, item.input, "-", "-", "-", error
                );
            }
        }
    }
    out
}

fn describe_observation(observation: &Observation) -> String {
    let result = &observation.result;
    let change = match observation.delta {
        None => String::new(),
        Some(delta) if delta.abs() < 0.005 => " (unchanged)".to_string(),
        Some(delta) => format!(" ({:+.2})", delta),
    };
    if observation.reached_target() {
        format!(
            "{}: {:.2}{}, target {:.2} reached",
            result.product_id, result.current_rating, change, result.target_rating
        )
    } else {
        format!(
            "{}: {:.2}{}, {} more 5★ reviews needed for {:.2}",
            result.product_id,
            result.current_rating,
            change,
            result.required_5star_reviews,
            result.target_rating
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RatingSnapshot, Statistics};
    use crate::pipeline::tests::{fast_config, listing};
    use crate::pipeline::BatchConfig;
    use crate::renderer::fake::FakeRenderer;
    use crate::store::CachedResult;
    use std::sync::Arc;

    /// Cache whose every call fails the way a stale schema or a broken disk would.
    struct BrokenCache;

    impl ResultCache for BrokenCache {
        fn get(&self, _: &ProductId, _: f64, _: DateTime<Utc>) -> Result<Option<CachedResult>> {
            Err(serde_json::from_str::<AnalysisResult>("{\"schema\": 0}").unwrap_err().into())
        }

        fn put(&self, _: &AnalysisResult, _: DateTime<Utc>, _: chrono::Duration) -> Result<()> {
            Err(RatecastError::Config("cache database is read-only".into()))
        }

        fn purge_expired(&self, _: DateTime<Utc>) -> Result<usize> {
            Ok(0)
        }
    }

    fn context(renderer: Arc<FakeRenderer>) -> AppContext {
        AppContext::with_renderer(fast_config(), renderer).unwrap()
    }

    fn result(required: u64) -> AnalysisResult {
        let mut stats = Statistics::default();
        stats.total_reviews = 30;
        stats.active_reviews = 25;
        stats.rating_distribution.insert(5, 20);
        stats.rating_distribution.insert(4, 10);
        AnalysisResult::new(
            ProductId::resolve("123456").unwrap(),
            4.5,
            RatingSnapshot {
                current_rating: 4.2,
                total_weight: 20.0,
                weighted_sum: 84.0,
            },
            required,
            stats,
        )
    }

    #[test]
    fn test_histogram_bar_scaling() {
        assert_eq!(histogram_bar(20, 20).chars().count(), HISTOGRAM_WIDTH);
        assert_eq!(histogram_bar(10, 20).chars().count(), 15);
        assert_eq!(histogram_bar(0, 20), "");
        assert_eq!(histogram_bar(0, 0), "");
    }

    #[test]
    fn test_render_table_lists_stars_high_to_low() {
        let table = render_table(&result(12));
        assert!(table.contains("5★ reviews needed:  12"));

        let five = table.find("5★ █").unwrap();
        let one = table.find("1★ ").unwrap();
        assert!(five < one);
    }

    #[test]
    fn test_read_requests_skips_blank_lines() {
        let requests = read_requests("123456\n\n  https://x.test/product/a-654321/ \n", 4.5).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].input, "https://x.test/product/a-654321/");
    }

    #[test]
    fn test_read_requests_rejects_bad_target() {
        assert!(read_requests("123456", 7.0).is_err());
    }

    #[test]
    fn test_batch_csv_rows() {
        let report = BatchReport {
            items: vec![
                BatchItem {
                    index: 0,
                    input: "123456".into(),
                    outcome: BatchOutcome::Success { result: result(3) },
                },
                BatchItem {
                    index: 1,
                    input: "nope".into(),
                    outcome: BatchOutcome::Failure {
                        kind: "unresolved_identifier".into(),
                        error: "Could not resolve".into(),
                    },
                },
            ],
        };

        let mut buf = Vec::new();
        write_report(&report, OutputFormat::Csv, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("index,input,status,product_id"));
        assert!(lines[1].starts_with("0,123456,success,123456,4.2,4.5,3,30,25,"));
        assert_eq!(lines[2], "1,nope,failure,,,,,,,Could not resolve");
    }

    #[test]
    fn test_describe_observation() {
        let first = Observation {
            result: result(3),
            delta: None,
        };
        assert_eq!(
            describe_observation(&first),
            "123456: 4.20, 3 more 5★ reviews needed for 4.50"
        );

        let reached = Observation {
            result: result(0),
            delta: Some(0.1),
        };
        assert_eq!(describe_observation(&reached), "123456: 4.20 (+0.10), target 4.50 reached");
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_survives_a_failing_cache() {
        let renderer = Arc::new(FakeRenderer::new(listing()));
        let mut ctx = context(renderer.clone());
        ctx.cache = Some(Arc::new(BrokenCache));

        tokio_test::assert_ok!(analyze(&ctx, "123456", 4.5, OutputFormat::Json, false).await);
        assert_eq!(renderer.log().opened.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_reuses_cached_result() {
        let renderer = Arc::new(FakeRenderer::new(listing()));
        let ctx = context(renderer.clone());

        analyze(&ctx, "123456", 4.5, OutputFormat::Json, false).await.unwrap();
        analyze(&ctx, "123456", 4.5, OutputFormat::Json, false).await.unwrap();
        assert_eq!(renderer.log().opened.len(), 1);

        analyze(&ctx, "123456", 4.5, OutputFormat::Json, true).await.unwrap();
        assert_eq!(renderer.log().opened.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_in_chunks_keeps_global_indices() {
        let renderer = Arc::new(FakeRenderer::new(listing()).failing_on("777777"));
        let analyzer = Arc::new(crate::pipeline::Analyzer::new(renderer, &fast_config()).unwrap());
        let coordinator = BatchCoordinator::new(analyzer, &BatchConfig::default());

        let mut inputs: Vec<String> = (0..12).map(|i| format!("{}", 100000 + i)).collect();
        inputs[11] = "777777".into();
        let requests = inputs
            .iter()
            .map(|i| AnalysisRequest::new(i, 4.5).unwrap())
            .collect();

        let report = run_in_chunks(&coordinator, requests).await.unwrap();
        let indices: Vec<_> = report.items.iter().map(|item| item.index).collect();
        assert_eq!(indices, (0..12).collect::<Vec<_>>());
        assert_eq!(report.successes().count(), 11);

        let (failed, _) = report.failures().next().unwrap();
        assert_eq!(failed.index, 11);
        assert_eq!(failed.input, "777777");
    }
}
