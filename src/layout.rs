/// Narrowest chart we draw; anything smaller is treated as this wide.
const MIN_WIDTH: usize = 40;

/// Below this width period labels switch to their compact form.
const COMPACT_BELOW: usize = 60;

/// Columns between the label and the bar, and after the value.
const GUTTER: usize = 2;

/// Chart dimensions for a viewport `width` columns wide.
///
/// Callers pass the width explicitly whenever it changes; nothing here
/// reads the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartLayout {
    pub label_width: usize,
    pub value_width: usize,
    pub bar_width: usize,
    pub compact_labels: bool,
}

impl ChartLayout {
    pub fn for_viewport(width: usize) -> Self {
        let width = width.max(MIN_WIDTH);
        let compact_labels = width < COMPACT_BELOW;
        // "Mar 2025" vs "03/25"
        let label_width = if compact_labels { 5 } else { 8 };
        let value_width = if compact_labels { 10 } else { 22 };
        let bar_width = width - label_width - value_width - 2 * GUTTER;
        Self {
            label_width,
            value_width,
            bar_width,
            compact_labels,
        }
    }

    /// Number of cells a bar of `value` fills, scaled against `max`.
    pub fn bar_len(&self, value: f64, max: f64) -> usize {
        if max <= 0.0 || value <= 0.0 {
            return 0;
        }
        let cells = (value / max * self.bar_width as f64).round() as usize;
        cells.clamp(1, self.bar_width)
    }
}

/// Shorten a full label for narrow viewports: "Mar 2025" -> "03/25".
pub fn compact_label(period: &str) -> String {
    match crate::periods::parse_month_key(period) {
        Some((year, month)) => format!("{month:02}/{:02}", year.rem_euclid(100)),
        None => period.to_string(),
    }
}
