use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One row of listening history: a song with its play and skip statistics.
///
/// Durations are in seconds. Rows are not unique; two entries with the same
/// song/artist/album are distinct rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub song: String,
    pub artist: String,
    pub album: String,
    pub play_count: u64,
    pub skip_count: u64,
    pub avg_skip_time: f64,
    pub duration: f64,
}

/// Period key -> tracks listened to in that period.
///
/// Keys are `YYYY` or `YYYY-MM`; `BTreeMap` iteration order is the
/// lexicographic (and, for zero-padded keys, chronological) order.
pub type PeriodData = BTreeMap<String, Vec<Track>>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error(
        "Unknown track field '{0}'. Expected one of: song, artist, album, playCount, \
         skipCount, avgSkipTime, duration"
    )]
    UnknownField(String),
    #[error("Unknown metric '{0}'. Expected one of: plays, duration, skips")]
    UnknownMetric(String),
    #[error("Unknown view '{0}'. Expected month or year")]
    UnknownView(String),
}

/// A sortable column of [`Track`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackField {
    Song,
    Artist,
    Album,
    PlayCount,
    SkipCount,
    AvgSkipTime,
    Duration,
}

/// Value of a single field, used by the sort comparator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
}

impl TrackField {
    /// Columns in table order.
    pub const ALL: [TrackField; 7] = [
        Self::Song,
        Self::Artist,
        Self::Album,
        Self::PlayCount,
        Self::SkipCount,
        Self::Duration,
        Self::AvgSkipTime,
    ];

    /// Wire name, matching the JSON field.
    pub fn key(self) -> &'static str {
        match self {
            Self::Song => "song",
            Self::Artist => "artist",
            Self::Album => "album",
            Self::PlayCount => "playCount",
            Self::SkipCount => "skipCount",
            Self::AvgSkipTime => "avgSkipTime",
            Self::Duration => "duration",
        }
    }

    /// Column header: "playCount" -> "Play Count".
    pub fn header(self) -> &'static str {
        match self {
            Self::Song => "Song",
            Self::Artist => "Artist",
            Self::Album => "Album",
            Self::PlayCount => "Play Count",
            Self::SkipCount => "Skip Count",
            Self::AvgSkipTime => "Avg Skip Time",
            Self::Duration => "Duration",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::PlayCount | Self::SkipCount | Self::AvgSkipTime | Self::Duration
        )
    }

    pub fn value(self, track: &Track) -> FieldValue<'_> {
        match self {
            Self::Song => FieldValue::Text(&track.song),
            Self::Artist => FieldValue::Text(&track.artist),
            Self::Album => FieldValue::Text(&track.album),
            Self::PlayCount => FieldValue::Number(track.play_count as f64),
            Self::SkipCount => FieldValue::Number(track.skip_count as f64),
            Self::AvgSkipTime => FieldValue::Number(track.avg_skip_time),
            Self::Duration => FieldValue::Number(track.duration),
        }
    }
}

impl fmt::Display for TrackField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TrackField {
    type Err = QueryError;

    /// Accepts the wire name, its snake_case/kebab-case spelling, or the
    /// short forms `plays`, `skips` and `avg-skip`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "song" => Ok(Self::Song),
            "artist" => Ok(Self::Artist),
            "album" => Ok(Self::Album),
            "playcount" | "plays" => Ok(Self::PlayCount),
            "skipcount" | "skips" => Ok(Self::SkipCount),
            "avgskiptime" | "avgskip" => Ok(Self::AvgSkipTime),
            "duration" => Ok(Self::Duration),
            _ => Err(QueryError::UnknownField(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Multiplier applied to the primary comparison.
    pub fn factor(self) -> f64 {
        match self {
            Self::Ascending => 1.0,
            Self::Descending => -1.0,
        }
    }

    /// Header arrow shown next to the active column.
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Ascending => "↑",
            Self::Descending => "↓",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: TrackField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: TrackField::PlayCount,
            direction: SortDirection::Descending,
        }
    }
}

impl SortSpec {
    /// Clicking a column: the active descending column flips to ascending,
    /// anything else becomes the new column, descending.
    pub fn toggled(self, field: TrackField) -> Self {
        let direction = if self.field == field && self.direction == SortDirection::Descending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        };
        Self { field, direction }
    }
}

/// Calendar bucket size of a period key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Month,
    Year,
}

impl Granularity {
    /// Path segment used by the store layout.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "month" | "monthly" => Ok(Self::Month),
            "year" | "yearly" => Ok(Self::Year),
            _ => Err(QueryError::UnknownView(s.to_string())),
        }
    }
}

/// What a chart bar measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Plays,
    Duration,
    Skips,
}

impl Metric {
    /// Reduce one track to its contribution to this metric.
    pub fn track_value(self, track: &Track) -> f64 {
        match self {
            Self::Plays => track.play_count as f64,
            Self::Duration => track.duration,
            Self::Skips => track.skip_count as f64,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Plays => "plays",
            Self::Duration => "duration",
            Self::Skips => "skips",
        }
    }

    /// Value-axis title shown by the chart sink.
    pub fn axis_title(self) -> &'static str {
        match self {
            Self::Plays => "Total Play Count",
            Self::Duration => "Total Listening Time (min)",
            Self::Skips => "Total Skip Count",
        }
    }

    /// Fixed bar colour per metric.
    pub fn bar_color(self) -> &'static str {
        match self {
            Self::Plays => "#1db954",
            Self::Duration => "#1aa34a",
            Self::Skips => "#1ed760",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plays" | "playcount" => Ok(Self::Plays),
            "duration" | "time" | "listening" => Ok(Self::Duration),
            "skips" | "skipcount" => Ok(Self::Skips),
            _ => Err(QueryError::UnknownMetric(s.to_string())),
        }
    }
}

/// One bar of an aggregated series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodPoint {
    pub period: String,
    pub value: f64,
}

/// Peak, mean and total over a [`PeriodPoint`] series.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSummary {
    pub max_period: String,
    pub max_value: f64,
    pub avg_value: f64,
    pub total_value: f64,
}
