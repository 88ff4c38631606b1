use std::cell::RefCell;
use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Result, TrackSource};
use crate::db::Database;
use crate::models::{Granularity, Track};

/// Key/value cache for fetched payloads. Faults are the cache's problem:
/// a failed read is a miss and a failed write is dropped.
pub trait Cache {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: &str);
}

impl<C: Cache + ?Sized> Cache for Box<C> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) {
        (**self).put(key, value)
    }
}

/// Process-lifetime cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

impl Cache for Database {
    fn get(&self, key: &str) -> Option<String> {
        match self.cache_get(key) {
            Ok(hit) => hit,
            Err(e) => {
                log::warn!("Cache read failed for {key}: {e}");
                None
            }
        }
    }

    fn put(&self, key: &str, value: &str) {
        if let Err(e) = self.cache_put(key, value) {
            log::warn!("Cache write failed for {key}: {e}");
        }
    }
}

pub fn tracks_key() -> String {
    "tracks".to_string()
}

pub fn periods_key(granularity: Granularity) -> String {
    format!("periods:{granularity}")
}

pub fn period_key(granularity: Granularity, period: &str) -> String {
    format!("period:{granularity}:{period}")
}

/// Read-through cache in front of any [`TrackSource`]. Hits are served
/// without touching the inner source; only successful fetches are stored.
pub struct CachedStore<S, C> {
    inner: S,
    cache: C,
}

impl<S: TrackSource, C: Cache> CachedStore<S, C> {
    pub fn new(inner: S, cache: C) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn cached<T, F>(&self, key: &str, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&S) -> Result<T>,
    {
        if let Some(raw) = self.cache.get(key) {
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    log::debug!("Cache hit: {key}");
                    return Ok(value);
                }
                Err(e) => log::warn!("Discarding unreadable cache entry {key}: {e}"),
            }
        }

        let value = fetch(&self.inner)?;
        match serde_json::to_string(&value) {
            Ok(raw) => self.cache.put(key, &raw),
            Err(e) => log::warn!("Could not serialize {key} for caching: {e}"),
        }
        Ok(value)
    }
}

impl<S: TrackSource, C: Cache> TrackSource for CachedStore<S, C> {
    fn fetch_all_tracks(&self) -> Result<Vec<Track>> {
        self.cached(&tracks_key(), |s| s.fetch_all_tracks())
    }

    fn fetch_periods(&self, granularity: Granularity) -> Result<Vec<String>> {
        self.cached(&periods_key(granularity), |s| s.fetch_periods(granularity))
    }

    fn fetch_period_tracks(&self, granularity: Granularity, period: &str) -> Result<Vec<Track>> {
        self.cached(&period_key(granularity, period), |s| {
            s.fetch_period_tracks(granularity, period)
        })
    }
}
