pub mod cache;
pub mod file;
pub mod http;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Granularity, Track};
use crate::periods::period_granularity;

pub use cache::{Cache, CachedStore, MemoryCache};
pub use file::FileStore;
pub use http::HttpStore;

/// Every variant means the same thing to callers: the data is unavailable.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Data unavailable: failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Data unavailable: request to {url} failed: {message}")]
    Http { url: String, message: String },
    #[error("Data unavailable: malformed payload from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Data unavailable: '{period}' is not a {granularity} period")]
    InvalidPeriod {
        period: String,
        granularity: Granularity,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Read side of a listening-history store.
///
/// Data is either one flat track list or per-period track lists keyed by
/// `YYYY-MM` / `YYYY`.
pub trait TrackSource {
    fn fetch_all_tracks(&self) -> Result<Vec<Track>>;
    fn fetch_periods(&self, granularity: Granularity) -> Result<Vec<String>>;
    fn fetch_period_tracks(&self, granularity: Granularity, period: &str) -> Result<Vec<Track>>;
}

impl<S: TrackSource + ?Sized> TrackSource for Box<S> {
    fn fetch_all_tracks(&self) -> Result<Vec<Track>> {
        (**self).fetch_all_tracks()
    }

    fn fetch_periods(&self, granularity: Granularity) -> Result<Vec<String>> {
        (**self).fetch_periods(granularity)
    }

    fn fetch_period_tracks(&self, granularity: Granularity, period: &str) -> Result<Vec<Track>> {
        (**self).fetch_period_tracks(granularity, period)
    }
}

/// `tracks.json`: the flat, all-time track list.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TracksFile {
    /// Name of the first history file the data was built from.
    #[serde(default)]
    pub already_loaded: Option<String>,
    pub data: Vec<Track>,
}

/// `periods/<granularity>/<period>.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PeriodFile {
    pub data: Vec<Track>,
}

/// Relative locations of the store layout, shared by file and HTTP stores.
pub mod layout {
    use crate::models::Granularity;

    pub const TRACKS: &str = "tracks.json";

    pub fn periods_index(granularity: Granularity) -> String {
        format!("periods/{granularity}/index.json")
    }

    pub fn period(granularity: Granularity, period: &str) -> String {
        format!("periods/{granularity}/{period}.json")
    }
}

/// Reject keys that don't belong to `granularity` before they reach a path or URL.
pub(crate) fn check_period(granularity: Granularity, period: &str) -> Result<()> {
    if period_granularity(period) == Some(granularity) {
        Ok(())
    } else {
        Err(StoreError::InvalidPeriod {
            period: period.to_string(),
            granularity,
        })
    }
}
