use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::models::{FieldValue, SortSpec, Track, TrackField};

/// Filter tracks by a search query and sort them.
///
/// A track is kept when the lower-cased query is a substring of its song,
/// artist or album. The query is not trimmed, so a trailing space is part of
/// the needle. The input is left untouched; ties that survive the tie-break
/// keep their input order.
pub fn filter_and_sort(tracks: &[Track], query: &str, sort: SortSpec) -> Vec<Track> {
    let needle = query.to_lowercase();
    let matched = tracks.iter().filter(|t| matches_query(t, &needle));

    if sort.field.is_numeric() {
        let mut out: Vec<Track> = matched.cloned().collect();
        out.sort_by(|a, b| compare_tracks(a, b, sort));
        return out;
    }

    // Text columns: one collation key per row.
    let mut keyed: Vec<(CollationKey, &Track)> = matched
        .map(|t| (CollationKey::new(text_of(sort.field, t)), t))
        .collect();
    keyed.sort_by(|(ka, a), (kb, b)| text_order(ka.cmp(kb), a, b, sort));
    keyed.into_iter().map(|(_, t)| t.clone()).collect()
}

fn text_of(field: TrackField, track: &Track) -> &str {
    match field.value(track) {
        FieldValue::Text(s) => s,
        FieldValue::Number(_) => unreachable!("field {field} is not a text column"),
    }
}

/// Direction applies to the collation result; the play-count tie-break does not.
fn text_order(collated: Ordering, a: &Track, b: &Track, sort: SortSpec) -> Ordering {
    let primary = match collated {
        Ordering::Equal => Ordering::Equal,
        ord if sort.direction.factor() < 0.0 => ord.reverse(),
        ord => ord,
    };
    primary.then(a.play_count.cmp(&b.play_count))
}

/// `needle` must already be lower-cased.
pub fn matches_query(track: &Track, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    track.song.to_lowercase().contains(needle)
        || track.artist.to_lowercase().contains(needle)
        || track.album.to_lowercase().contains(needle)
}

/// Full comparator: primary field scaled by direction, then the tie-break.
///
/// Numeric columns break ties by duration ascending, text columns by play
/// count ascending. The tie-break ignores the direction.
pub fn compare_tracks(a: &Track, b: &Track, sort: SortSpec) -> Ordering {
    let factor = sort.direction.factor();
    match (sort.field.value(a), sort.field.value(b)) {
        (FieldValue::Number(x), FieldValue::Number(y)) => {
            let primary = (x - y) * factor;
            if primary != 0.0 {
                return primary.partial_cmp(&0.0).unwrap_or(Ordering::Equal);
            }
            a.duration
                .partial_cmp(&b.duration)
                .unwrap_or(Ordering::Equal)
        }
        (FieldValue::Text(x), FieldValue::Text(y)) => text_order(locale_compare(x, y), a, b, sort),
        // Same field on both sides, so the variants always agree.
        _ => unreachable!("field {} yielded mixed value kinds", sort.field),
    }
}

/// Locale-style string ordering.
///
/// Letters are compared ignoring accents and case first, then accents, then
/// case with lower-case ahead of upper-case ("a" < "A" < "b").
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    CollationKey::new(a).cmp(&CollationKey::new(b))
}

/// Sort key behind [`locale_compare`]. Field order is comparison order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollationKey {
    /// NFD, combining marks removed, lower-cased.
    base: Vec<char>,
    /// NFD with marks kept, lower-cased.
    accent: Vec<char>,
    /// 1 per upper-case char.
    case: Vec<u8>,
}

impl CollationKey {
    pub fn new(s: &str) -> Self {
        Self {
            base: s
                .nfd()
                .filter(|c| !is_combining_mark(*c))
                .flat_map(char::to_lowercase)
                .collect(),
            accent: s.nfd().flat_map(char::to_lowercase).collect(),
            case: s.chars().map(|c| u8::from(c.is_uppercase())).collect(),
        }
    }
}

/// Every column a user can sort by, with the active one marked.
pub fn header_labels(sort: SortSpec) -> Vec<String> {
    TrackField::ALL
        .iter()
        .map(|&field| {
            if field == sort.field {
                format!("{} {}", field.header(), sort.direction.arrow())
            } else {
                field.header().to_string()
            }
        })
        .collect()
}
