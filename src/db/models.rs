/// Cache occupancy, for `tracklog cache stats`.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub entries: i64,
    pub total_bytes: i64,
    /// Unix seconds of the oldest entry, if any.
    pub oldest_fetched_at: Option<i64>,
    pub expired: i64,
}
