//! State holders for the two screens. Each mutator recomputes everything
//! downstream of it, so a host only has to call a setter and redraw.

use crate::format::{format_clock, format_period_label, format_value, group_thousands};
use crate::layout::{ChartLayout, compact_label};
use crate::models::{Granularity, Metric, PeriodData, PeriodSummary, SortSpec, Track, TrackField};
use crate::pagination::{KeyOutcome, NavKey, PageItem, Pagination, parse_page_input};
use crate::periods::{aggregate, available_years, select_periods};
use crate::query::{filter_and_sort, header_labels};
use crate::store::{self, TrackSource};
use crate::summary::{SummaryDisplay, summarize};

/// The songs table: search box, sortable headers, page picker and page jump.
pub struct SongsTable {
    tracks: Vec<Track>,
    query: String,
    sort: SortSpec,
    filtered: Vec<Track>,
    pagination: Pagination,
    page_input: String,
}

impl SongsTable {
    pub fn new(tracks: Vec<Track>, page_size: usize) -> Self {
        let mut table = Self {
            tracks,
            query: String::new(),
            sort: SortSpec::default(),
            filtered: Vec::new(),
            pagination: Pagination::new(page_size, 0),
            page_input: String::new(),
        };
        table.recompute();
        table
    }

    fn recompute(&mut self) {
        self.filtered = filter_and_sort(&self.tracks, &self.query, self.sort);
        self.pagination.reset(self.filtered.len());
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.recompute();
    }

    /// Header click.
    pub fn toggle_sort(&mut self, field: TrackField) {
        self.sort = self.sort.toggled(field);
        self.recompute();
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
        self.recompute();
    }

    /// Ignored (returns false) for sizes that aren't offered.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        self.pagination.set_page_size(page_size)
    }

    pub fn go_to_page(&mut self, page: i64) -> bool {
        self.pagination.go_to_page(page)
    }

    pub fn set_page_input(&mut self, raw: &str) {
        self.page_input = raw.to_string();
    }

    /// Jump to the typed page. Text that doesn't start with a number, or a
    /// number outside the page range, leaves the page alone.
    pub fn submit_page_input(&mut self) -> bool {
        match parse_page_input(&self.page_input) {
            Some(page) => self.pagination.go_to_page(page),
            None => false,
        }
    }

    pub fn handle_key(&mut self, key: NavKey, focus_in_field: bool) -> KeyOutcome {
        self.pagination.handle_key(key, focus_in_field)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn page_input(&self) -> &str {
        &self.page_input
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn total_results(&self) -> usize {
        self.filtered.len()
    }

    /// Rows on the current page.
    pub fn rows(&self) -> &[Track] {
        self.pagination.slice(&self.filtered)
    }

    pub fn headers(&self) -> Vec<String> {
        header_labels(self.sort)
    }

    pub fn window(&self) -> Vec<PageItem> {
        self.pagination.window()
    }
}

/// Display cells for one row, in [`TrackField::ALL`] order.
pub fn row_cells(track: &Track) -> Vec<String> {
    TrackField::ALL
        .iter()
        .map(|field| match field {
            TrackField::Song => track.song.clone(),
            TrackField::Artist => track.artist.clone(),
            TrackField::Album => track.album.clone(),
            TrackField::PlayCount => group_thousands(track.play_count),
            TrackField::SkipCount => group_thousands(track.skip_count),
            TrackField::Duration => format_clock(track.duration),
            TrackField::AvgSkipTime => format_clock(track.avg_skip_time),
        })
        .collect()
}

/// Fetch the periods of `view`, keep the ones the view shows and load their tracks.
pub fn load_period_data<S: TrackSource + ?Sized>(
    store: &S,
    view: Granularity,
    year: Option<&str>,
) -> store::Result<PeriodData> {
    let periods = store.fetch_periods(view)?;
    load_selected_periods(store, view, &periods, year)
}

/// Like [`load_period_data`], for a caller that already holds the period index.
pub fn load_selected_periods<S: TrackSource + ?Sized>(
    store: &S,
    view: Granularity,
    periods: &[String],
    year: Option<&str>,
) -> store::Result<PeriodData> {
    let mut data = PeriodData::new();
    for period in select_periods(periods, view, year) {
        let tracks = store.fetch_period_tracks(view, &period)?;
        data.insert(period, tracks);
    }
    log::debug!("Loaded {} {view} periods", data.len());
    Ok(data)
}

/// Chart controls: month/year view, the year shown in month view, and the metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartState {
    pub view: Granularity,
    pub chosen_year: Option<String>,
    pub metric: Metric,
    /// Years offered by the year picker, oldest first. Filled by [`ChartState::load`].
    pub years: Vec<String>,
}

impl Default for ChartState {
    fn default() -> Self {
        Self {
            view: Granularity::Month,
            chosen_year: None,
            metric: Metric::Plays,
            years: Vec::new(),
        }
    }
}

impl ChartState {
    /// Load data for the current controls. In month view with no year picked,
    /// the latest year with data is picked. A store failure is reported on
    /// the returned view, never as an error.
    pub fn load<S: TrackSource + ?Sized>(&mut self, store: &S) -> ChartView {
        let loaded = store.fetch_periods(self.view).and_then(|periods| {
            if self.view == Granularity::Month {
                self.years = available_years(&periods);
                if self.chosen_year.is_none() {
                    self.chosen_year = self.years.last().cloned();
                }
            }
            load_selected_periods(store, self.view, &periods, self.chosen_year.as_deref())
        });

        match loaded {
            Ok(data) => ChartView::build(&data, self.metric, false),
            Err(e) => {
                log::warn!("{e}");
                ChartView::build(&PeriodData::new(), self.metric, true)
            }
        }
    }
}

/// One bar: the raw period key, its display label and value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub period: String,
    pub label: String,
    pub value: f64,
}

/// Everything a chart sink needs to draw one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub metric: Metric,
    pub points: Vec<ChartPoint>,
    pub summary: Option<PeriodSummary>,
    pub summary_display: Option<SummaryDisplay>,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub color: &'static str,
    pub data_unavailable: bool,
}

impl ChartView {
    pub fn build(period_data: &PeriodData, metric: Metric, data_unavailable: bool) -> Self {
        let series = aggregate(period_data, metric);
        let summary = summarize(&series);
        let summary_display = summary.as_ref().map(|s| SummaryDisplay::new(s, metric));
        let points = series
            .into_iter()
            .map(|p| ChartPoint {
                label: format_period_label(&p.period),
                period: p.period,
                value: p.value,
            })
            .collect();
        Self {
            metric,
            points,
            summary,
            summary_display,
            x_title: "Period",
            y_title: metric.axis_title(),
            color: metric.bar_color(),
            data_unavailable,
        }
    }

    /// Horizontal bar chart, one line per point.
    pub fn render(&self, layout: &ChartLayout) -> Vec<String> {
        let max = self.points.iter().map(|p| p.value).fold(0.0, f64::max);
        self.points
            .iter()
            .map(|p| {
                let label = if layout.compact_labels {
                    compact_label(&p.period)
                } else {
                    p.label.clone()
                };
                let bar = "█".repeat(layout.bar_len(p.value, max));
                let value = format_value(p.value, self.metric);
                format!(
                    "{label:<lw$}  {bar:<bw$}  {value:>vw$}",
                    lw = layout.label_width,
                    bw = layout.bar_width,
                    vw = layout.value_width,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortDirection;
    use crate::store::{MemoryCache, StoreError};
    use std::cell::Cell;

    fn track(song: &str, artist: &str, plays: u64) -> Track {
        Track {
            song: song.into(),
            artist: artist.into(),
            album: "Album".into(),
            play_count: plays,
            skip_count: plays / 3,
            duration: plays as f64 * 180.0,
            ..Track::default()
        }
    }

    fn library(n: u64) -> Vec<Track> {
        (1..=n).map(|i| track(&format!("Song {i}"), "Artist", i)).collect()
    }

    #[test]
    fn test_table_defaults_to_play_count_desc() {
        let table = SongsTable::new(library(25), 10);
        assert_eq!(table.rows().len(), 10);
        assert_eq!(table.rows()[0].play_count, 25);
        assert_eq!(table.total_results(), 25);
        assert_eq!(table.pagination().total_pages(), 3);
        assert!(table.headers()[3].ends_with('↓'));
    }

    #[test]
    fn test_mutators_reset_page() {
        let mut table = SongsTable::new(library(25), 10);
        assert!(table.go_to_page(3));
        table.set_query("song 1");
        assert_eq!(table.pagination().current_page(), 1);
        // "song 1", "song 10".."song 19"
        assert_eq!(table.total_results(), 11);

        table.set_query("");
        table.go_to_page(2);
        table.toggle_sort(TrackField::PlayCount);
        assert_eq!(table.pagination().current_page(), 1);
        assert_eq!(table.sort().direction, SortDirection::Ascending);
        assert_eq!(table.rows()[0].play_count, 1);

        table.go_to_page(2);
        assert!(table.set_page_size(5));
        assert_eq!(table.pagination().current_page(), 1);
        assert_eq!(table.pagination().total_pages(), 5);
    }

    #[test]
    fn test_unoffered_page_size_is_ignored() {
        let mut table = SongsTable::new(library(25), 10);
        assert!(!table.set_page_size(7));
        assert_eq!(table.pagination().page_size(), 10);
    }

    #[test]
    fn test_page_input() {
        let mut table = SongsTable::new(library(25), 10);
        table.set_page_input(" 2abc");
        assert!(table.submit_page_input());
        assert_eq!(table.pagination().current_page(), 2);

        table.set_page_input("nope");
        assert!(!table.submit_page_input());
        table.set_page_input("9");
        assert!(!table.submit_page_input());
        assert_eq!(table.pagination().current_page(), 2);
        assert_eq!(table.page_input(), "9");
    }

    #[test]
    fn test_keys_respect_focus() {
        let mut table = SongsTable::new(library(25), 10);
        assert_eq!(table.handle_key(NavKey::Right, false), KeyOutcome::Moved(2));
        assert_eq!(table.handle_key(NavKey::Right, true), KeyOutcome::Ignored);
        assert_eq!(table.handle_key(NavKey::Escape, true), KeyOutcome::ReleaseFocus);
        assert_eq!(table.pagination().current_page(), 2);
    }

    #[test]
    fn test_empty_library() {
        let table = SongsTable::new(Vec::new(), 10);
        assert!(table.rows().is_empty());
        assert_eq!(table.total_results(), 0);
    }

    #[test]
    fn test_row_cells() {
        let t = Track {
            song: "Long One".into(),
            artist: "A".into(),
            album: "B".into(),
            play_count: 1234,
            skip_count: 2,
            avg_skip_time: 75.0,
            duration: 3725.0,
        };
        assert_eq!(
            row_cells(&t),
            vec!["Long One", "A", "B", "1,234", "2", "1:02:05", "0:01:15"]
        );
    }

    /// In-memory store with a fixed month/year layout.
    struct FixtureStore {
        fail_tracks: Cell<bool>,
        index_fetches: Cell<usize>,
    }

    impl TrackSource for FixtureStore {
        fn fetch_all_tracks(&self) -> store::Result<Vec<Track>> {
            Ok(Vec::new())
        }

        fn fetch_periods(&self, granularity: Granularity) -> store::Result<Vec<String>> {
            self.index_fetches.set(self.index_fetches.get() + 1);
            Ok(match granularity {
                Granularity::Month => vec!["2024-11".into(), "2024-12".into(), "2025-01".into()],
                Granularity::Year => vec!["2024".into(), "2025".into()],
            })
        }

        fn fetch_period_tracks(&self, _g: Granularity, period: &str) -> store::Result<Vec<Track>> {
            if self.fail_tracks.get() {
                return Err(StoreError::Http {
                    url: period.into(),
                    message: "timed out".into(),
                });
            }
            let plays = match period {
                "2024-11" => 10,
                "2024-12" => 30,
                "2025-01" => 20,
                "2024" => 40,
                _ => 20,
            };
            Ok(vec![track("x", "y", plays)])
        }
    }

    fn fixture() -> FixtureStore {
        FixtureStore {
            fail_tracks: Cell::new(false),
            index_fetches: Cell::new(0),
        }
    }

    #[test]
    fn test_load_period_data_selects_year() {
        let data = load_period_data(&fixture(), Granularity::Month, Some("2024")).unwrap();
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["2024-11", "2024-12"]);

        let none = load_period_data(&fixture(), Granularity::Month, None).unwrap();
        assert!(none.is_empty());

        let years = load_period_data(&fixture(), Granularity::Year, None).unwrap();
        assert_eq!(years.len(), 2);
    }

    #[test]
    fn test_chart_defaults_to_latest_year() {
        let mut state = ChartState::default();
        let view = state.load(&fixture());
        assert_eq!(state.years, vec!["2024", "2025"]);
        assert_eq!(state.chosen_year.as_deref(), Some("2025"));
        assert_eq!(view.points.len(), 1);
        assert_eq!(view.points[0].label, "Jan 2025");
    }

    #[test]
    fn test_month_view_reads_period_index_once() {
        let store = fixture();
        let mut state = ChartState::default();
        state.load(&store);
        assert_eq!(store.index_fetches.get(), 1);

        state.view = Granularity::Year;
        state.load(&store);
        assert_eq!(store.index_fetches.get(), 2);
    }

    #[test]
    fn test_chart_view_summary() {
        let mut state = ChartState {
            chosen_year: Some("2024".into()),
            ..ChartState::default()
        };
        let view = state.load(&fixture());
        let summary = view.summary.unwrap();
        assert_eq!(summary.max_period, "2024-12");
        assert_eq!(summary.total_value, 40.0);
        assert_eq!(view.summary_display.unwrap().peak_period, "Dec 2024");
        assert_eq!(view.y_title, "Total Play Count");
        assert_eq!(view.x_title, "Period");
        assert!(!view.data_unavailable);
    }

    #[test]
    fn test_failed_fetch_yields_empty_chart() {
        let store = fixture();
        store.fail_tracks.set(true);
        let mut state = ChartState {
            view: Granularity::Year,
            metric: Metric::Duration,
            ..ChartState::default()
        };
        let view = state.load(&store);
        assert!(view.data_unavailable);
        assert!(view.points.is_empty());
        assert!(view.summary.is_none());
        assert_eq!(view.y_title, "Total Listening Time (min)");
    }

    #[test]
    fn test_chart_through_cached_store() {
        let cached = store::CachedStore::new(fixture(), MemoryCache::new());
        let mut state = ChartState::default();
        let first = state.load(&cached);
        let second = state.load(&cached);
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_scales_bars() {
        let mut data = PeriodData::new();
        data.insert("2025-01".into(), vec![track("a", "b", 5)]);
        data.insert("2025-02".into(), vec![track("a", "b", 10)]);
        let view = ChartView::build(&data, Metric::Plays, false);

        let layout = ChartLayout::for_viewport(80);
        let lines = view.render(&layout);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Jan 2025"));
        assert!(lines[1].ends_with("10 plays"));
        let full = lines[1].matches('█').count();
        assert_eq!(full, layout.bar_width);
        let half = (layout.bar_width as f64 / 2.0).round() as usize;
        assert_eq!(lines[0].matches('█').count(), half);

        let narrow = view.render(&ChartLayout::for_viewport(45));
        assert!(narrow[0].starts_with("01/25"));
    }
}
