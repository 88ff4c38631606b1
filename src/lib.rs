pub mod config;
pub mod db;
pub mod format;
pub mod ingest;
pub mod layout;
pub mod models;
pub mod pagination;
pub mod periods;
pub mod query;
pub mod store;
pub mod summary;
pub mod view;

/// Page sizes offered by the songs table.
pub const PAGE_SIZE_OPTIONS: &[usize] = &[5, 10, 20, 40, 80];

/// Page size used until the user picks another one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Application name for XDG paths
pub const APP_NAME: &str = "tracklog";
