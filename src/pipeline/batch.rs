use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::app::{RatecastError, Result};
use crate::domain::{AnalysisRequest, AnalysisResult};
use crate::pipeline::Analyzer;

/// Fixed ceiling on identifiers per batch invocation.
pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Minimum gap between successive renders in milliseconds (default: 2000)
    pub pacing_ms: u64,

    /// Concurrent analyses; 1 keeps the batch sequential (default: 1)
    pub workers: usize,

    /// Wall-clock bound for rendering one identifier in seconds (default: 300)
    pub analysis_timeout_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            pacing_ms: 2000,
            workers: 1,
            analysis_timeout_secs: 300,
        }
    }
}

impl BatchConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }
}

/// Shared gate spacing out render starts across all workers.
pub struct PacingGate {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl PacingGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Waits until `interval` has passed since the previous pass, then records this one.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.interval).await;
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchOutcome {
    Success { result: AnalysisResult },
    Failure { kind: String, error: String },
}

impl BatchOutcome {
    fn from_result(result: Result<AnalysisResult>) -> Self {
        match result {
            Ok(result) => BatchOutcome::Success { result },
            Err(e) => BatchOutcome::Failure {
                kind: e.kind().to_string(),
                error: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub index: usize,
    pub input: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

/// Per-item outcomes in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn successes(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.items.iter().filter_map(|item| match &item.outcome {
            BatchOutcome::Success { result } => Some(result),
            BatchOutcome::Failure { .. } => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&BatchItem, &str)> {
        self.items.iter().filter_map(|item| match &item.outcome {
            BatchOutcome::Failure { error, .. } => Some((item, error.as_str())),
            BatchOutcome::Success { .. } => None,
        })
    }
}

pub struct BatchCoordinator {
    analyzer: Arc<Analyzer>,
    gate: Arc<PacingGate>,
    workers: usize,
}

impl BatchCoordinator {
    pub fn new(analyzer: Arc<Analyzer>, config: &BatchConfig) -> Self {
        Self {
            analyzer,
            gate: Arc::new(PacingGate::new(config.pacing())),
            workers: config.workers.max(1),
        }
    }

    /// Analyze up to [`MAX_BATCH_SIZE`] requests; one failure never aborts the rest.
    pub async fn run(&self, requests: Vec<AnalysisRequest>) -> Result<BatchReport> {
        if requests.len() > MAX_BATCH_SIZE {
            return Err(RatecastError::BatchTooLarge {
                len: requests.len(),
                max: MAX_BATCH_SIZE,
            });
        }

        info!(
            "Running batch of {} requests with {} worker(s)",
            requests.len(),
            self.workers
        );

        let items = if self.workers == 1 {
            self.run_sequential(requests).await
        } else {
            self.run_parallel(requests).await
        };

        let report = BatchReport { items };
        info!(
            "Batch complete: {} succeeded, {} failed",
            report.successes().count(),
            report.failures().count()
        );
        Ok(report)
    }

    async fn run_sequential(&self, requests: Vec<AnalysisRequest>) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(requests.len());
        for (index, request) in requests.into_iter().enumerate() {
            let outcome = analyze_one(&self.analyzer, &self.gate, &request).await;
            items.push(BatchItem {
                index,
                input: request.input,
                outcome,
            });
        }
        items
    }

    async fn run_parallel(&self, requests: Vec<AnalysisRequest>) -> Vec<BatchItem> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(requests.len());

        for (index, request) in requests.into_iter().enumerate() {
            let analyzer = self.analyzer.clone();
            let gate = self.gate.clone();
            let semaphore = semaphore.clone();
            let input = request.input.clone();

            let handle = tokio::spawn(async move {
                match semaphore.acquire().await {
                    Ok(_permit) => analyze_one(&analyzer, &gate, &request).await,
                    Err(e) => BatchOutcome::Failure {
                        kind: "internal".into(),
                        error: format!("Semaphore error: {}", e),
                    },
                }
            });
            handles.push((index, input, handle));
        }

        let mut items = Vec::with_capacity(handles.len());
        for (index, input, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Task join error: {}", e);
                    BatchOutcome::Failure {
                        kind: "internal".into(),
                        error: format!("Task join error: {}", e),
                    }
                }
            };
            items.push(BatchItem {
                index,
                input,
                outcome,
            });
        }
        items
    }
}

async fn analyze_one(analyzer: &Analyzer, gate: &PacingGate, request: &AnalysisRequest) -> BatchOutcome {
    gate.wait().await;
    let result = analyzer.analyze(request).await.map(|analysis| analysis.result);
    if let Err(ref e) = result {
        warn!("Analysis of {} failed: {}", request.input, e);
    }
    BatchOutcome::from_result(result)
}
