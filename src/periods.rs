use std::sync::LazyLock;

use regex::Regex;

use crate::format::js_round;
use crate::models::{Granularity, Metric, PeriodData, PeriodPoint, Track};

static MONTH_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<year>\d{4})-(?P<month>0[1-9]|1[0-2])$").unwrap());

static YEAR_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());

/// Reduce each period's tracks to one value for `metric`.
///
/// Values are rounded to two decimals. The series follows the key order of
/// the map, which is plain lexicographic order. An empty map gives an
/// empty series.
pub fn aggregate(period_data: &PeriodData, metric: Metric) -> Vec<PeriodPoint> {
    period_data
        .iter()
        .map(|(period, tracks)| PeriodPoint {
            period: period.clone(),
            value: round2(reduce(tracks, metric)),
        })
        .collect()
}

fn reduce(tracks: &[Track], metric: Metric) -> f64 {
    tracks.iter().map(|t| metric.track_value(t)).sum()
}

/// `round(value * 100) / 100`, halves rounding up like a browser would.
pub fn round2(value: f64) -> f64 {
    js_round(value * 100.0) / 100.0
}

/// Which granularity a key belongs to, or `None` for a malformed key.
pub fn period_granularity(key: &str) -> Option<Granularity> {
    if MONTH_KEY_RE.is_match(key) {
        Some(Granularity::Month)
    } else if YEAR_KEY_RE.is_match(key) {
        Some(Granularity::Year)
    } else {
        None
    }
}

/// Split a `YYYY-MM` key into numeric parts.
pub fn parse_month_key(key: &str) -> Option<(i32, u32)> {
    let caps = MONTH_KEY_RE.captures(key)?;
    let year = caps["year"].parse().ok()?;
    let month = caps["month"].parse().ok()?;
    Some((year, month))
}

/// Periods to chart for a view.
///
/// The month view keeps the periods that contain `year`; with no year
/// chosen it keeps nothing. The year view keeps every period.
pub fn select_periods(periods: &[String], view: Granularity, year: Option<&str>) -> Vec<String> {
    match view {
        Granularity::Year => periods.to_vec(),
        Granularity::Month => match year {
            Some(y) => periods.iter().filter(|p| p.contains(y)).cloned().collect(),
            None => Vec::new(),
        },
    }
}

/// Distinct years appearing in month keys, oldest first.
pub fn available_years(month_periods: &[String]) -> Vec<String> {
    let mut years: Vec<String> = month_periods
        .iter()
        .filter_map(|p| p.get(..4))
        .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect();
    years.sort();
    years.dedup();
    years
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plays(n: u64) -> Track {
        Track {
            play_count: n,
            skip_count: n / 2,
            duration: n as f64 * 100.5,
            ..Track::default()
        }
    }

    #[test]
    fn test_aggregate_sums_per_period() {
        let mut data = PeriodData::new();
        data.insert("2025-03".into(), vec![plays(3), plays(5)]);
        data.insert("2025-01".into(), vec![plays(1)]);

        let series = aggregate(&data, Metric::Plays);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].period, "2025-01");
        assert_eq!(series[1].period, "2025-03");
        assert_eq!(series[1].value, 8.0);

        let skips = aggregate(&data, Metric::Skips);
        assert_eq!(skips[1].value, 3.0);

        let time = aggregate(&data, Metric::Duration);
        assert_eq!(time[1].value, 804.0);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(&PeriodData::new(), Metric::Duration).is_empty());
    }

    #[test]
    fn test_period_with_no_tracks_is_zero() {
        let mut data = PeriodData::new();
        data.insert("2024".into(), Vec::new());
        let series = aggregate(&data, Metric::Plays);
        assert_eq!(series[0].value, 0.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.005 * 1000.0), 1005.0);
        assert_eq!(round2(2.345678), 2.35);
        assert_eq!(round2(0.1 + 0.2), 0.3);
        assert_eq!(round2(7.0), 7.0);
    }

    #[test]
    fn test_period_granularity() {
        assert_eq!(period_granularity("2025-03"), Some(Granularity::Month));
        assert_eq!(period_granularity("2025"), Some(Granularity::Year));
        assert_eq!(period_granularity("2025-13"), None);
        assert_eq!(period_granularity("25-03"), None);
        assert_eq!(parse_month_key("1999-12"), Some((1999, 12)));
    }

    #[test]
    fn test_select_periods() {
        let months: Vec<String> = ["2024-11", "2024-12", "2025-01", "2025-02"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let picked = select_periods(&months, Granularity::Month, Some("2025"));
        assert_eq!(picked, vec!["2025-01", "2025-02"]);
        assert!(select_periods(&months, Granularity::Month, None).is_empty());

        let years = vec!["2024".to_string(), "2025".to_string()];
        assert_eq!(select_periods(&years, Granularity::Year, Some("2025")), years);
    }

    #[test]
    fn test_available_years() {
        let months: Vec<String> = ["2025-01", "2023-05", "2025-02", "bad"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(available_years(&months), vec!["2023", "2025"]);
    }
}
