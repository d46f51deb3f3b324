//! Periodic re-analysis of a single product.
//!
//! Runs until the shutdown future resolves (Ctrl-C from the CLI), reporting
//! how the weighted rating moved since the previous run.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::app::{RatecastError, Result};
use crate::domain::{AnalysisRequest, AnalysisResult};
use crate::pipeline::Analyzer;

/// Parse interval string like "1h", "30m", "6h", "1d"
pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim().to_lowercase();

    let secs = if let Some(hours) = s.strip_suffix('h') {
        hours
            .parse::<u64>()
            .map(|h| h * 3600)
            .map_err(|_| format!("Invalid hours: {}", hours))
    } else if let Some(minutes) = s.strip_suffix('m') {
        minutes
            .parse::<u64>()
            .map(|m| m * 60)
            .map_err(|_| format!("Invalid minutes: {}", minutes))
    } else if let Some(days) = s.strip_suffix('d') {
        days.parse::<u64>()
            .map(|d| d * 86400)
            .map_err(|_| format!("Invalid days: {}", days))
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>()
            .map_err(|_| format!("Invalid seconds: {}", secs))
    } else {
        s.parse::<u64>()
            .map_err(|_| format!("Invalid interval: {}. Use format like '1h', '30m', '1d'", s))
    }?;

    if secs == 0 {
        return Err("Interval must be greater than zero".to_string());
    }
    Ok(secs)
}

/// Format interval for display
pub fn format_interval(secs: u64) -> String {
    if secs >= 86400 && secs.is_multiple_of(86400) {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs.is_multiple_of(3600) {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs.is_multiple_of(60) {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// One monitoring tick.
#[derive(Debug, Clone)]
pub struct Observation {
    pub result: AnalysisResult,
    /// Rating change versus the previous successful tick.
    pub delta: Option<f64>,
}

impl Observation {
    pub fn reached_target(&self) -> bool {
        self.result.goal_reached()
    }
}

pub struct Monitor {
    analyzer: Arc<Analyzer>,
    request: AnalysisRequest,
    every: Duration,
    previous: Option<f64>,
}

impl Monitor {
    pub fn new(analyzer: Arc<Analyzer>, request: AnalysisRequest, every: Duration) -> Self {
        Self {
            analyzer,
            request,
            every,
            previous: None,
        }
    }

    /// Analyze once and compare with the last successful tick.
    pub async fn tick(&mut self) -> Result<Observation> {
        let analysis = self.analyzer.analyze(&self.request).await?;
        let rating = analysis.result.current_rating;
        let delta = self.previous.map(|prev| rating - prev);
        self.previous = Some(rating);
        Ok(Observation {
            result: analysis.result,
            delta,
        })
    }

    /// Tick immediately, then every interval, until `shutdown` resolves.
    ///
    /// Transient failures are reported and retried on the next tick; an
    /// identifier or target that can never succeed ends the loop.
    pub async fn run<S, F>(&mut self, shutdown: S, mut report: F) -> Result<()>
    where
        S: Future<Output = ()>,
        F: FnMut(&Result<Observation>),
    {
        info!(
            "Monitoring {} every {}",
            self.request.input,
            format_interval(self.every.as_secs())
        );

        let mut timer = interval(self.every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = timer.tick() => {
                    let outcome = self.tick().await;
                    report(&outcome);
                    if let Err(e) = outcome {
                        if matches!(e, RatecastError::UnresolvedIdentifier(_) | RatecastError::InvalidTarget(_)) {
                            return Err(e);
                        }
                        warn!("Monitoring tick for {} failed: {}", self.request.input, e);
                    }
                }
            }
        }

        info!("Monitoring of {} stopped", self.request.input);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{fast_config, listing};
    use crate::renderer::fake::FakeRenderer;

    fn monitor(renderer: FakeRenderer, input: &str, target: f64) -> Monitor {
        let analyzer = Arc::new(Analyzer::new(Arc::new(renderer), &fast_config()).unwrap());
        let request = AnalysisRequest::new(input, target).unwrap();
        Monitor::new(analyzer, request, Duration::from_secs(3600))
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("1h").unwrap(), 3600);
        assert_eq!(parse_interval("30m").unwrap(), 1800);
        assert_eq!(parse_interval("1d").unwrap(), 86400);
        assert_eq!(parse_interval("60s").unwrap(), 60);
        assert_eq!(parse_interval("3600").unwrap(), 3600);
        assert_eq!(parse_interval(" 6H ").unwrap(), 21600);
        assert!(parse_interval("invalid").is_err());
        assert!(parse_interval("0m").is_err());
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(3600), "1h");
        assert_eq!(format_interval(1800), "30m");
        assert_eq!(format_interval(86400), "1d");
        assert_eq!(format_interval(90), "90s");
        assert_eq!(format_interval(7200), "2h");
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_reports_delta_after_first_run() {
        let mut monitor = monitor(FakeRenderer::new(listing()), "123456", 4.8);

        let first = tokio_test::assert_ok!(monitor.tick().await);
        assert!(first.delta.is_none());
        assert!(!first.reached_target());

        let second = monitor.tick().await.unwrap();
        assert!(second.delta.unwrap().abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_shutdown() {
        let mut monitor = monitor(FakeRenderer::new(listing()), "123456", 1.5);
        let mut seen = Vec::new();

        let shutdown = tokio::time::sleep(Duration::from_secs(3 * 3600 + 1));
        monitor
            .run(shutdown, |outcome| seen.push(outcome.as_ref().map(|o| o.reached_target()).ok()))
            .await
            .unwrap();

        assert_eq!(seen, vec![Some(true); 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_keeps_going_after_render_failure() {
        let renderer = FakeRenderer::new(listing()).failing_on("123456");
        let mut monitor = monitor(renderer, "123456", 4.5);
        let mut failures = 0;

        let shutdown = tokio::time::sleep(Duration::from_secs(3600 + 1));
        monitor
            .run(shutdown, |outcome| {
                if outcome.is_err() {
                    failures += 1;
                }
            })
            .await
            .unwrap();

        assert_eq!(failures, 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_invalid_target() {
        let mut monitor = monitor(FakeRenderer::new(listing()), "123456", 5.0);
        let err = tokio_test::assert_err!(monitor.run(std::future::pending(), |_| {}).await);
        assert!(matches!(err, RatecastError::InvalidTarget(_)));
    }
}
