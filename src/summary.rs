use crate::format::{format_period_label, format_value};
use crate::models::{Metric, PeriodPoint, PeriodSummary};

/// Peak, average and total of a series, or `None` when it is empty.
///
/// The peak is the first entry with the greatest value.
pub fn summarize(series: &[PeriodPoint]) -> Option<PeriodSummary> {
    let (first, rest) = series.split_first()?;

    let mut max = first;
    let mut total = first.value;
    for point in rest {
        if point.value > max.value {
            max = point;
        }
        total += point.value;
    }

    Some(PeriodSummary {
        max_period: max.period.clone(),
        max_value: max.value,
        avg_value: total / series.len() as f64,
        total_value: total,
    })
}

/// A summary rendered for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryDisplay {
    pub peak_period: String,
    pub peak_value: String,
    pub average: String,
    pub total: String,
}

impl SummaryDisplay {
    pub fn new(summary: &PeriodSummary, metric: Metric) -> Self {
        Self {
            peak_period: format_period_label(&summary.max_period),
            peak_value: format_value(summary.max_value, metric),
            average: format_value(summary.avg_value, metric),
            total: format_value(summary.total_value, metric),
        }
    }
}
