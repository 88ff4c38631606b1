use std::collections::HashMap;

use chrono::DateTime;
use serde::Deserialize;

use crate::models::Track;

/// `reason_end` values that count as a skip when `skipped` is missing.
const SKIP_REASONS: &[&str] = &["endplay", "backbtn", "fwdbtn", "clickrow"];

/// One event of a streaming-history export. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct PlayEvent {
    pub ts: String,
    #[serde(default)]
    pub ms_played: u64,
    pub master_metadata_track_name: Option<String>,
    pub master_metadata_album_artist_name: Option<String>,
    pub master_metadata_album_album_name: Option<String>,
    pub episode_show_name: Option<String>,
    pub skipped: Option<bool>,
    pub reason_end: Option<String>,
}

/// Songs are identified by title, album and artist together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SongKey {
    pub song: String,
    pub album: String,
    pub artist: String,
}

/// A play that survived filtering, ready to be tallied.
#[derive(Debug, Clone, PartialEq)]
pub struct Play {
    /// `YYYY-MM`
    pub month: String,
    pub key: SongKey,
    pub seconds: u64,
    pub skipped: bool,
}

/// Why an event was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dropped {
    /// No track name: a podcast episode or a broken row.
    NoTrack,
    /// Less than a second played.
    ZeroLength,
    BadTimestamp,
}

impl PlayEvent {
    pub fn into_play(self) -> std::result::Result<Play, Dropped> {
        let song = self.master_metadata_track_name.ok_or(Dropped::NoTrack)?;

        let seconds = self.ms_played / 1000;
        if seconds == 0 {
            return Err(Dropped::ZeroLength);
        }

        let month = month_of(&self.ts).ok_or(Dropped::BadTimestamp)?;

        let show = self.episode_show_name;
        let artist = self
            .master_metadata_album_artist_name
            .or_else(|| show.clone())
            .unwrap_or_default();
        let album = self
            .master_metadata_album_album_name
            .or(show)
            .unwrap_or_default();

        let skipped = self.skipped.unwrap_or_else(|| {
            self.reason_end
                .as_deref()
                .is_some_and(|r| SKIP_REASONS.contains(&r))
        });

        Ok(Play {
            month,
            key: SongKey { song, album, artist },
            seconds,
            skipped,
        })
    }
}

/// `YYYY-MM` of an RFC 3339 timestamp such as `2024-11-03T21:14:09Z`.
/// The month is read off the written date, so a non-UTC offset never moves
/// a play into a neighbouring month.
pub fn month_of(ts: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(ts).ok()?;
    ts.get(..7).map(str::to_string)
}

/// Running totals for one song.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SongTotals {
    pub plays: u64,
    pub seconds: u64,
    pub skips: u64,
    pub skipped_seconds: u64,
}

impl SongTotals {
    pub fn add_play(&mut self, seconds: u64, skipped: bool) {
        self.plays += 1;
        self.seconds += seconds;
        if skipped {
            self.skips += 1;
            self.skipped_seconds += seconds;
        }
    }

    pub fn merge(&mut self, other: &SongTotals) {
        self.plays += other.plays;
        self.seconds += other.seconds;
        self.skips += other.skips;
        self.skipped_seconds += other.skipped_seconds;
    }

    /// Whole seconds listened before skipping, floored; 0 without skips.
    pub fn avg_skip_seconds(&self) -> u64 {
        self.skipped_seconds.checked_div(self.skips).unwrap_or(0)
    }

    pub fn to_track(&self, key: &SongKey) -> Track {
        Track {
            song: key.song.clone(),
            artist: key.artist.clone(),
            album: key.album.clone(),
            play_count: self.plays,
            skip_count: self.skips,
            avg_skip_time: self.avg_skip_seconds() as f64,
            duration: self.seconds as f64,
        }
    }
}

/// Per-song totals in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct SongLog {
    order: Vec<SongKey>,
    totals: HashMap<SongKey, SongTotals>,
}

impl SongLog {
    pub fn record(&mut self, key: &SongKey, seconds: u64, skipped: bool) {
        self.entry(key).add_play(seconds, skipped);
    }

    /// Fold another log in; songs new to `self` go to the end in `other`'s order.
    pub fn absorb(&mut self, other: &SongLog) {
        for (key, totals) in other.iter() {
            self.entry(key).merge(totals);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SongKey, &SongTotals)> {
        self.order.iter().filter_map(|k| self.totals.get(k).map(|t| (k, t)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn totals(&self) -> SongTotals {
        let mut sum = SongTotals::default();
        for (_, t) in self.iter() {
            sum.merge(t);
        }
        sum
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.iter().map(|(k, t)| t.to_track(k)).collect()
    }

    fn entry(&mut self, key: &SongKey) -> &mut SongTotals {
        if !self.totals.contains_key(key) {
            self.order.push(key.clone());
        }
        self.totals.entry(key.clone()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(json: &str) -> PlayEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_music_event() {
        let play = event(
            r#"{"ts": "2024-11-03T21:14:09Z", "ms_played": 215999,
                "master_metadata_track_name": "Roygbiv",
                "master_metadata_album_artist_name": "Boards of Canada",
                "master_metadata_album_album_name": "Music Has the Right to Children",
                "skipped": false, "reason_end": "trackdone"}"#,
        )
        .into_play()
        .unwrap();

        assert_eq!(play.month, "2024-11");
        assert_eq!(play.seconds, 215);
        assert!(!play.skipped);
        assert_eq!(play.key.artist, "Boards of Canada");
    }

    #[test]
    fn test_podcast_is_dropped() {
        let e = event(
            r#"{"ts": "2024-11-03T21:14:09Z", "ms_played": 900000,
                "master_metadata_track_name": null,
                "episode_name": "Ep. 12", "episode_show_name": "Some Show"}"#,
        );
        assert_eq!(e.into_play(), Err(Dropped::NoTrack));
    }

    #[test]
    fn test_sub_second_is_dropped() {
        let e = event(
            r#"{"ts": "2024-11-03T21:14:09Z", "ms_played": 999,
                "master_metadata_track_name": "Intro"}"#,
        );
        assert_eq!(e.into_play(), Err(Dropped::ZeroLength));
    }

    #[test]
    fn test_bad_timestamp_is_dropped() {
        let e = event(
            r#"{"ts": "yesterday", "ms_played": 5000, "master_metadata_track_name": "X"}"#,
        );
        assert_eq!(e.into_play(), Err(Dropped::BadTimestamp));
    }

    #[test]
    fn test_month_is_the_written_date() {
        assert_eq!(month_of("2024-11-03T21:14:09Z").as_deref(), Some("2024-11"));
        assert_eq!(month_of("2024-03-31T23:30:00-05:00").as_deref(), Some("2024-03"));
        assert_eq!(month_of("2024-04-01T00:30:00+02:00").as_deref(), Some("2024-04"));
        assert_eq!(month_of("2024-13-01T00:00:00Z"), None);
        assert_eq!(month_of("2024-11"), None);
    }

    #[test]
    fn test_missing_artist_falls_back_to_show() {
        let play = event(
            r#"{"ts": "2023-01-09T08:00:00Z", "ms_played": 60000,
                "master_metadata_track_name": "Chapter 1",
                "episode_show_name": "Audiobook"}"#,
        )
        .into_play()
        .unwrap();
        assert_eq!(play.key.artist, "Audiobook");
        assert_eq!(play.key.album, "Audiobook");
    }

    #[test]
    fn test_skip_falls_back_to_reason_end() {
        let base = |reason: &str| {
            event(&format!(
                r#"{{"ts": "2023-01-09T08:00:00Z", "ms_played": 4000,
                    "master_metadata_track_name": "A", "skipped": null,
                    "reason_end": "{reason}"}}"#
            ))
            .into_play()
            .unwrap()
            .skipped
        };
        assert!(base("fwdbtn"));
        assert!(base("endplay"));
        assert!(!base("trackdone"));
    }

    #[test]
    fn test_explicit_skip_wins_over_reason() {
        let play = event(
            r#"{"ts": "2023-01-09T08:00:00Z", "ms_played": 4000,
                "master_metadata_track_name": "A", "skipped": false,
                "reason_end": "fwdbtn"}"#,
        )
        .into_play()
        .unwrap();
        assert!(!play.skipped);
    }

    #[test]
    fn test_avg_skip_floors() {
        let mut t = SongTotals::default();
        t.add_play(10, true);
        t.add_play(15, true);
        t.add_play(200, false);
        assert_eq!(t.plays, 3);
        assert_eq!(t.skips, 2);
        assert_eq!(t.seconds, 225);
        assert_eq!(t.avg_skip_seconds(), 12);
        assert_eq!(SongTotals::default().avg_skip_seconds(), 0);
    }

    #[test]
    fn test_song_log_keeps_first_seen_order() {
        let a = SongKey {
            song: "a".into(),
            album: "x".into(),
            artist: "y".into(),
        };
        let b = SongKey {
            song: "b".into(),
            album: "x".into(),
            artist: "y".into(),
        };
        let mut log = SongLog::default();
        log.record(&b, 10, false);
        log.record(&a, 10, false);
        log.record(&b, 5, true);

        let tracks = log.tracks();
        assert_eq!(tracks[0].song, "b");
        assert_eq!(tracks[0].play_count, 2);
        assert_eq!(tracks[1].song, "a");
        assert_eq!(log.totals().plays, 3);
    }

    #[test]
    fn test_same_title_different_album_is_distinct() {
        let mut log = SongLog::default();
        let live = SongKey {
            song: "Song".into(),
            album: "Live".into(),
            artist: "Band".into(),
        };
        let studio = SongKey {
            song: "Song".into(),
            album: "Studio".into(),
            artist: "Band".into(),
        };
        log.record(&live, 1, false);
        log.record(&studio, 1, false);
        assert_eq!(log.len(), 2);
    }
}
