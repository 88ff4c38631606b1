use super::models::CacheStats;
use super::{Database, Result};
use chrono::Utc;
use rusqlite::{OptionalExtension, params};

const SECONDS_PER_DAY: i64 = 86_400;

impl Database {
    /// Look up a cached payload. Entries past the TTL count as missing.
    pub fn cache_get(&self, key: &str) -> Result<Option<String>> {
        self.cache_get_at(key, Utc::now().timestamp())
    }

    /// Store (or replace) a payload, stamped with the current time.
    pub fn cache_put(&self, key: &str, payload: &str) -> Result<()> {
        self.cache_put_at(key, payload, Utc::now().timestamp())
    }

    pub(crate) fn cache_get_at(&self, key: &str, now: i64) -> Result<Option<String>> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT payload, fetched_at FROM fetch_cache WHERE cache_key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((payload, fetched_at)) if !self.is_expired(fetched_at, now) => Ok(Some(payload)),
            Some(_) => {
                log::debug!("Cache entry {key} expired");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub(crate) fn cache_put_at(&self, key: &str, payload: &str, fetched_at: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO fetch_cache (cache_key, payload, fetched_at, payload_bytes)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(cache_key) DO UPDATE SET
                payload = excluded.payload,
                fetched_at = excluded.fetched_at,
                payload_bytes = excluded.payload_bytes",
            params![key, payload, fetched_at, payload.len() as i64],
        )?;
        Ok(())
    }

    /// Drop every cached payload. Returns the number removed.
    pub fn cache_clear(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM fetch_cache", [])?;
        Ok(removed)
    }

    /// Entry count, payload bytes and age of the cache.
    pub fn cache_stats(&self) -> Result<CacheStats> {
        let (entries, total_bytes, oldest_fetched_at): (i64, i64, Option<i64>) =
            self.conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(payload_bytes), 0), MIN(fetched_at)
                 FROM fetch_cache",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        let expired = match self.ttl_days {
            Some(days) => self.conn.query_row(
                "SELECT COUNT(*) FROM fetch_cache WHERE fetched_at < ?1",
                params![Utc::now().timestamp() - days * SECONDS_PER_DAY],
                |row| row.get(0),
            )?,
            None => 0,
        };

        Ok(CacheStats {
            entries,
            total_bytes,
            oldest_fetched_at,
            expired,
        })
    }

    fn is_expired(&self, fetched_at: i64, now: i64) -> bool {
        match self.ttl_days {
            Some(days) => now - fetched_at > days * SECONDS_PER_DAY,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.cache_get("tracks").unwrap(), None);

        db.cache_put("tracks", "[]").unwrap();
        assert_eq!(db.cache_get("tracks").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_put_replaces() {
        let db = Database::open_in_memory().unwrap();
        db.cache_put("periods:month", r#"["2025-01"]"#).unwrap();
        db.cache_put("periods:month", r#"["2025-01","2025-02"]"#).unwrap();

        assert_eq!(
            db.cache_get("periods:month").unwrap().as_deref(),
            Some(r#"["2025-01","2025-02"]"#)
        );
        assert_eq!(db.cache_stats().unwrap().entries, 1);
    }

    #[test]
    fn test_ttl_expiry() {
        let db = Database::open_in_memory().unwrap().with_ttl_days(7);
        let now = 1_750_000_000;
        db.cache_put_at("fresh", "a", now - 6 * SECONDS_PER_DAY).unwrap();
        db.cache_put_at("stale", "b", now - 8 * SECONDS_PER_DAY).unwrap();

        assert_eq!(db.cache_get_at("fresh", now).unwrap().as_deref(), Some("a"));
        assert_eq!(db.cache_get_at("stale", now).unwrap(), None);
    }

    #[test]
    fn test_no_ttl_keeps_everything() {
        let db = Database::open_in_memory().unwrap().with_ttl_days(0);
        assert_eq!(db.ttl_days(), None);
        db.cache_put_at("old", "x", 0).unwrap();
        assert_eq!(db.cache_get_at("old", 1_750_000_000).unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_clear_and_stats() {
        let db = Database::open_in_memory().unwrap();
        let stats = db.cache_stats().unwrap();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.oldest_fetched_at, None);

        db.cache_put_at("a", "1234", 100).unwrap();
        db.cache_put_at("b", "56", 50).unwrap();
        let stats = db.cache_stats().unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.total_bytes, 6);
        assert_eq!(stats.oldest_fetched_at, Some(50));

        assert_eq!(db.cache_clear().unwrap(), 2);
        assert_eq!(db.cache_stats().unwrap().entries, 0);
    }

    #[test]
    fn test_reopen_runs_migrations_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        {
            let db = Database::open(&path).unwrap();
            db.cache_put("k", "v").unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.cache_get("k").unwrap().as_deref(), Some("v"));
        let version: i32 = db
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_stats_count_utf8_bytes() {
        let db = Database::open_in_memory().unwrap();
        db.cache_put("accent", "é").unwrap();
        db.cache_put("snowman", "☃").unwrap();
        assert_eq!(db.cache_stats().unwrap().total_bytes, 5);
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        {
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", 9).unwrap();
        }
        assert!(matches!(
            Database::open(&path),
            Err(crate::db::DbError::Migration(_))
        ));
    }
}
