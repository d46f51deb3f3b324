use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};
use tracing::{debug, warn};

use crate::app::{RatecastError, Result};
use crate::domain::{AnalysisResult, ProductId};
use crate::store::{cache_key, CachedResult, ResultCache};

pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.run_migrations()?;
        Ok(cache)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.run_migrations()?;
        Ok(cache)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            RatecastError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| RatecastError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn format_datetime(dt: DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }
}

impl ResultCache for SqliteCache {
    fn get(&self, product: &ProductId, target: f64, now: DateTime<Utc>) -> Result<Option<CachedResult>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT payload, expires_at FROM analysis_cache WHERE cache_key = ?1",
                params![cache_key(product, target)],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((payload, expires_at)) = row else {
            return Ok(None);
        };

        let Some(expires_at) = Self::parse_datetime(&expires_at) else {
            warn!("Ignoring cache entry for {} with bad expiry {:?}", product, expires_at);
            return Ok(None);
        };
        if expires_at <= now {
            debug!("Cache entry for {} expired at {}", product, expires_at);
            return Ok(None);
        }

        let result: AnalysisResult = serde_json::from_str(&payload)?;
        Ok(Some(CachedResult { result, expires_at }))
    }

    fn put(&self, result: &AnalysisResult, now: DateTime<Utc>, ttl: Duration) -> Result<()> {
        let conn = self.conn()?;
        let payload = serde_json::to_string(result)?;

        conn.execute(
            "INSERT INTO analysis_cache (cache_key, product_id, target_rating, payload, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(cache_key) DO UPDATE SET
                payload = excluded.payload,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at",
            params![
                cache_key(&result.product_id, result.target_rating),
                result.product_id.as_str(),
                result.target_rating,
                payload,
                Self::format_datetime(now),
                Self::format_datetime(now + ttl),
            ],
        )?;

        Ok(())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM analysis_cache WHERE expires_at <= ?1",
            params![Self::format_datetime(now)],
        )?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RatingSnapshot, Statistics};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn result(id: &str, target: f64) -> AnalysisResult {
        let snapshot = RatingSnapshot {
            current_rating: 4.2,
            total_weight: 10.0,
            weighted_sum: 42.0,
        };
        AnalysisResult::new(
            ProductId::resolve(id).unwrap(),
            target,
            snapshot,
            3,
            Statistics::default(),
        )
    }

    #[test]
    fn test_put_and_get() {
        let cache = SqliteCache::in_memory().unwrap();
        let stored = result("123456", 4.5);
        cache.put(&stored, now(), Duration::hours(6)).unwrap();

        let cached = cache
            .get(&stored.product_id, 4.5, now() + Duration::hours(1))
            .unwrap()
            .unwrap();
        assert_eq!(cached.result, stored);
        assert_eq!(cached.expires_at, now() + Duration::hours(6));
    }

    #[test]
    fn test_miss_for_other_target() {
        let cache = SqliteCache::in_memory().unwrap();
        let stored = result("123456", 4.5);
        cache.put(&stored, now(), Duration::hours(6)).unwrap();
        assert!(cache.get(&stored.product_id, 4.7, now()).unwrap().is_none());
    }

    #[test]
    fn test_expired_entries_are_ignored_and_purged() {
        let cache = SqliteCache::in_memory().unwrap();
        let stored = result("123456", 4.5);
        cache.put(&stored, now(), Duration::hours(6)).unwrap();
        cache.put(&result("654321", 4.5), now(), Duration::hours(24)).unwrap();

        let later = now() + Duration::hours(7);
        assert!(cache.get(&stored.product_id, 4.5, later).unwrap().is_none());
        assert_eq!(cache.purge_expired(later).unwrap(), 1);
        assert_eq!(cache.purge_expired(later).unwrap(), 0);
    }

    #[test]
    fn test_unreadable_payload_is_an_error() {
        let cache = SqliteCache::in_memory().unwrap();
        let stored = result("123456", 4.5);
        cache.put(&stored, now(), Duration::hours(6)).unwrap();
        cache
            .conn()
            .unwrap()
            .execute("UPDATE analysis_cache SET payload = '{\"schema\": 0}'", [])
            .unwrap();

        let err = cache.get(&stored.product_id, 4.5, now()).unwrap_err();
        assert!(matches!(err, RatecastError::Serialization(_)));
    }

    #[test]
    fn test_put_overwrites() {
        let cache = SqliteCache::in_memory().unwrap();
        let mut stored = result("123456", 4.5);
        cache.put(&stored, now(), Duration::hours(6)).unwrap();
        stored.required_5star_reviews = 9;
        cache.put(&stored, now(), Duration::hours(6)).unwrap();

        let cached = cache.get(&stored.product_id, 4.5, now()).unwrap().unwrap();
        assert_eq!(cached.result.required_5star_reviews, 9);
    }

    #[test]
    fn test_file_backed_cache_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");
        let stored = result("123456", 4.5);
        {
            let cache = SqliteCache::new(&path).unwrap();
            cache.put(&stored, now(), Duration::hours(6)).unwrap();
        }
        let cache = SqliteCache::new(&path).unwrap();
        assert!(cache.get(&stored.product_id, 4.5, now()).unwrap().is_some());
    }
}
