use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;

use super::{PeriodFile, Result, StoreError, TrackSource, TracksFile, check_period, layout};
use crate::models::{Granularity, Track};

/// Store layout read from a local directory (usually written by `ingest`).
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_json<T: DeserializeOwned>(&self, relative: &str) -> Result<T> {
        let path = self.root.join(relative);
        log::debug!("Reading {}", path.display());
        let raw = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            origin: path.display().to_string(),
            source,
        })
    }
}

impl TrackSource for FileStore {
    fn fetch_all_tracks(&self) -> Result<Vec<Track>> {
        let file: TracksFile = self.read_json(layout::TRACKS)?;
        Ok(file.data)
    }

    fn fetch_periods(&self, granularity: Granularity) -> Result<Vec<String>> {
        self.read_json(&layout::periods_index(granularity))
    }

    fn fetch_period_tracks(&self, granularity: Granularity, period: &str) -> Result<Vec<Track>> {
        check_period(granularity, period)?;
        let file: PeriodFile = self.read_json(&layout::period(granularity, period))?;
        Ok(file.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write(root: &Path, relative: &str, body: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    const ONE_TRACK: &str = r#"{"data": [{
        "song": "Windowlicker", "artist": "Aphex Twin", "album": "Windowlicker",
        "playCount": 4, "skipCount": 1, "avgSkipTime": 30, "duration": 1460
    }]}"#;

    #[test]
    fn test_reads_layout() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "tracks.json", ONE_TRACK);
        write(dir.path(), "periods/month/index.json", r#"["2025-01"]"#);
        write(dir.path(), "periods/month/2025-01.json", ONE_TRACK);

        let store = FileStore::new(dir.path());
        assert_eq!(store.fetch_all_tracks().unwrap()[0].song, "Windowlicker");
        assert_eq!(store.fetch_periods(Granularity::Month).unwrap(), vec!["2025-01"]);
        let tracks = store.fetch_period_tracks(Granularity::Month, "2025-01").unwrap();
        assert_eq!(tracks[0].play_count, 4);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(store.fetch_all_tracks(), Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "periods/year/index.json", "{not json");
        let store = FileStore::new(dir.path());
        assert!(matches!(
            store.fetch_periods(Granularity::Year),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn test_rejects_foreign_period_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(
            store.fetch_period_tracks(Granularity::Month, "2025"),
            Err(StoreError::InvalidPeriod { .. })
        ));
    }
}
