use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

/// Application configuration loaded from TOML config file.
/// Every field has a default, so the file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Store layout directory (overrides XDG default).
    pub data_dir: Option<PathBuf>,
    /// Read the store layout from this base URL instead of `data_dir`.
    pub remote_url: Option<String>,
    /// Custom fetch-cache database path (overrides XDG default).
    pub cache_path: Option<PathBuf>,
    /// Cached payloads older than this are refetched. 0 = never expire.
    pub cache_ttl_days: i64,
    /// Rows per page of `songs`.
    pub page_size: usize,
    /// Number of parallel ingest workers. 0 = auto-detect.
    pub workers: usize,
    /// Timeout for a single request to `remote_url`.
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            remote_url: None,
            cache_path: None,
            cache_ttl_days: 7,
            page_size: crate::DEFAULT_PAGE_SIZE,
            workers: 0,
            http_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/tracklog/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Resolve worker count: 0 → all cores, via rayon's default.
    pub fn resolve_workers(&self, cli_jobs: usize) -> usize {
        if cli_jobs > 0 { cli_jobs } else { self.workers }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Default store layout directory, under the XDG data directory.
pub fn default_data_dir() -> PathBuf {
    match ProjectDirs::from("", "", crate::APP_NAME) {
        Some(dirs) => dirs.data_dir().join("store"),
        // Fallback: current directory
        None => PathBuf::from("tracklog-data"),
    }
}

/// Default fetch-cache path, under the XDG cache directory.
pub fn default_cache_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        let cache_dir = dirs.cache_dir();
        std::fs::create_dir_all(cache_dir).ok();
        cache_dir.join("fetch-cache.db")
    } else {
        PathBuf::from("tracklog-cache.db")
    }
}
