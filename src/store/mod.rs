//! Result cache for front ends.
//!
//! The analysis pipeline never reads or writes this; boundary layers wrap
//! whole [`AnalysisResult`]s keyed by `(product, target)` with a TTL.

pub mod sqlite;

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::app::Result;
use crate::domain::{AnalysisResult, ProductId};

pub use sqlite::SqliteCache;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache analysis results between runs (default: true)
    pub enabled: bool,

    /// Lifetime of a cached result in hours (default: 6)
    pub ttl_hours: i64,

    /// Database location (default: user data directory)
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: 6,
            path: None,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::hours(self.ttl_hours.max(0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    pub result: AnalysisResult,
    pub expires_at: DateTime<Utc>,
}

/// Deterministic key for a product and target rating.
pub fn cache_key(product: &ProductId, target: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(product.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(target.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

pub trait ResultCache {
    /// Unexpired entry for `(product, target)` as of `now`.
    fn get(&self, product: &ProductId, target: f64, now: DateTime<Utc>) -> Result<Option<CachedResult>>;
    fn put(&self, result: &AnalysisResult, now: DateTime<Utc>, ttl: Duration) -> Result<()>;
    /// Delete entries expired as of `now`; returns how many were removed.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
