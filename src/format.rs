use chrono::NaiveDate;

use crate::models::Metric;
use crate::periods::parse_month_key;

const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Round half up, matching `Math.round` for the non-negative values we format.
pub fn js_round(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Number with comma thousands separators and at most three decimals,
/// trailing zeros dropped: 1234567.5 -> "1,234,567.5".
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let negative = value < 0.0;
    let scaled = js_round(value.abs() * 1000.0) as u64;
    let whole = scaled / 1000;
    let frac = scaled % 1000;

    let mut out = String::new();
    if negative && scaled > 0 {
        out.push('-');
    }
    out.push_str(&group_thousands(whole));
    if frac > 0 {
        let digits = format!("{frac:03}");
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

/// "1234567" -> "1,234,567".
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Seconds as `H:MM:SS`, every part floored; hours are not padded.
pub fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours}:{minutes:02}:{secs:02}")
}

/// Human value for a chart tooltip or summary line.
///
/// Counts get a unit suffix. Durations are seconds: over a day they read
/// as days/hours/minutes, over an hour as hours/minutes.
pub fn format_value(value: f64, metric: Metric) -> String {
    match metric {
        Metric::Plays => format!("{} plays", format_number(value)),
        Metric::Skips => format!("{} skips", format_number(value)),
        Metric::Duration => format_listening_time(value),
    }
}

fn format_listening_time(seconds: f64) -> String {
    if seconds > SECONDS_PER_DAY {
        let days = (seconds / SECONDS_PER_DAY).floor();
        let hours = ((seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR).floor();
        let minutes = js_round((seconds % SECONDS_PER_HOUR) / 60.0);
        format!("{days} days {hours} hr {minutes} min")
    } else if seconds > SECONDS_PER_HOUR {
        let hours = (seconds / SECONDS_PER_HOUR).floor();
        let minutes = js_round((seconds / 60.0) % 60.0);
        format!("{hours} hr {minutes} min")
    } else {
        // FIXME: raw seconds printed under a "minutes" unit. Known mismatch,
        // left in place until the tooltip text can change (see DESIGN.md).
        format!("{} minutes", js_round(seconds))
    }
}

/// "2025-03" -> "Mar 2025". Year keys and anything unrecognised pass through.
pub fn format_period_label(period: &str) -> String {
    parse_month_key(period)
        .and_then(|(year, month)| NaiveDate::from_ymd_opt(year, month, 1))
        .map(|date| date.format("%b %Y").to_string())
        .unwrap_or_else(|| period.to_string())
}
