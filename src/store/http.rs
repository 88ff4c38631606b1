use std::time::Duration;

use serde::de::DeserializeOwned;

use super::{PeriodFile, Result, StoreError, TrackSource, TracksFile, check_period, layout};
use crate::models::{Granularity, Track};

/// Store layout served over HTTP, e.g. a static site hosting the files
/// `ingest` writes.
pub struct HttpStore {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", self.base_url, relative)
    }

    fn get_json<T: DeserializeOwned>(&self, relative: &str) -> Result<T> {
        let url = self.url_for(relative);
        log::debug!("Fetching {url}");

        let body = self
            .agent
            .get(&url)
            .call()
            .and_then(|mut response| response.body_mut().read_to_string())
            .map_err(|e| StoreError::Http {
                url: url.clone(),
                message: e.to_string(),
            })?;

        serde_json::from_str(&body).map_err(|source| StoreError::Parse { origin: url, source })
    }
}

impl TrackSource for HttpStore {
    fn fetch_all_tracks(&self) -> Result<Vec<Track>> {
        let file: TracksFile = self.get_json(layout::TRACKS)?;
        Ok(file.data)
    }

    fn fetch_periods(&self, granularity: Granularity) -> Result<Vec<String>> {
        self.get_json(&layout::periods_index(granularity))
    }

    fn fetch_period_tracks(&self, granularity: Granularity, period: &str) -> Result<Vec<Track>> {
        check_period(granularity, period)?;
        let file: PeriodFile = self.get_json(&layout::period(granularity, period))?;
        Ok(file.data)
    }
}
