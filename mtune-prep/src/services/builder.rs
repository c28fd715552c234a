//! Mood dataset builder
//!
//! Reads the cleaned table, drops duplicate tracks, tags every row with its
//! mood and writes two tables: the full table with every column plus `mood`,
//! and the small projection used downstream by the index builder.

use mtune_common::models::TrackColumn;
use mtune_common::table::{self, Schema};
use mtune_common::{CleanTrack, Mood, MoodTrack, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Numeric columns the classifier and index builder expect
const EXPECTED_NUMERIC: [TrackColumn; 5] = [
    TrackColumn::Valence,
    TrackColumn::Energy,
    TrackColumn::Danceability,
    TrackColumn::Acousticness,
    TrackColumn::Tempo,
];

/// Columns of the small projection, in output order
pub const SMALL_COLUMNS: [TrackColumn; 11] = [
    TrackColumn::TrackId,
    TrackColumn::TrackName,
    TrackColumn::ArtistName,
    TrackColumn::Genres,
    TrackColumn::Popularity,
    TrackColumn::Valence,
    TrackColumn::Energy,
    TrackColumn::Danceability,
    TrackColumn::Tempo,
    TrackColumn::Mood,
    TrackColumn::Uri,
];

/// Totals of one builder run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub rows_in: usize,
    pub duplicates_dropped: usize,
    pub rows_out: usize,
    /// Row count per mood label, ordered by label
    pub mood_counts: BTreeMap<String, usize>,
}

/// Drop repeated (track_name, artist_name) pairs, keeping the first
///
/// A missing artist name is a key value of its own, so two unattributed
/// tracks with the same name are duplicates.
pub fn dedup(tracks: Vec<CleanTrack>) -> Vec<CleanTrack> {
    let mut seen: HashSet<(String, Option<String>)> = HashSet::with_capacity(tracks.len());
    tracks
        .into_iter()
        .filter(|t| {
            let (name, artist) = t.identity();
            seen.insert((name.to_string(), artist.map(str::to_string)))
        })
        .collect()
}

/// Deduplicate and classify, preserving row order
pub fn tag_moods(tracks: Vec<CleanTrack>) -> (Vec<MoodTrack>, BuildSummary) {
    let rows_in = tracks.len();
    let unique = dedup(tracks);

    let mut mood_counts: BTreeMap<String, usize> = Mood::ALL.iter().map(|m| (m.to_string(), 0)).collect();
    let tagged: Vec<MoodTrack> = unique
        .into_iter()
        .map(|track| {
            let row = MoodTrack::classify(track);
            *mood_counts.entry(row.mood.to_string()).or_default() += 1;
            row
        })
        .collect();

    let summary = BuildSummary {
        rows_in,
        duplicates_dropped: rows_in - tagged.len(),
        rows_out: tagged.len(),
        mood_counts,
    };
    (tagged, summary)
}

/// Builds the mood-tagged tables from the cleaned table
#[derive(Debug, Clone, Default)]
pub struct DatasetBuilder;

impl DatasetBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Read `clean_path`, then write `full_path` and `small_path`
    ///
    /// `small_path` may be the same file as `clean_path`; the input is fully
    /// read before anything is written.
    pub fn build(&self, clean_path: &Path, full_path: &Path, small_path: &Path) -> Result<BuildSummary> {
        let (header, tracks) = table::read_rows(clean_path, CleanTrack::from_row)?;
        info!(rows = tracks.len(), "Read cleaned table {}", clean_path.display());

        let full_schema = full_schema(&header.schema());
        let small_schema = full_schema.intersect(&SMALL_COLUMNS);

        let (tagged, summary) = tag_moods(tracks);
        debug!(columns = ?full_schema.header_record(), "Full table schema");

        table::write_table(full_path, &full_schema, &tagged)?;
        table::write_table(small_path, &small_schema, &tagged)?;

        info!(
            rows_in = summary.rows_in,
            duplicates_dropped = summary.duplicates_dropped,
            rows_out = summary.rows_out,
            "Wrote {} and {}",
            full_path.display(),
            small_path.display()
        );
        for (mood, count) in &summary.mood_counts {
            info!(mood = %mood, count, "Mood distribution");
        }
        Ok(summary)
    }
}

/// Input columns, then any missing expected numeric column, then `mood`
fn full_schema(input: &Schema) -> Schema {
    let with_numeric = EXPECTED_NUMERIC
        .iter()
        .fold(input.clone(), |schema, column| schema.with(*column));
    with_numeric.with(TrackColumn::Mood)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str, artist: Option<&str>, valence: f64) -> CleanTrack {
        CleanTrack {
            track_name: name.to_string(),
            artist_name: artist.map(str::to_string),
            valence: Some(valence),
            energy: Some(0.8),
            ..Default::default()
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let rows = vec![
            track("Song", Some("A"), 0.1),
            track("Song", Some("B"), 0.2),
            track("Song", Some("A"), 0.3),
            track("Song", None, 0.4),
            track("Song", None, 0.5),
        ];
        let unique = dedup(rows);
        let valences: Vec<f64> = unique.iter().filter_map(|t| t.valence).collect();
        assert_eq!(valences, vec![0.1, 0.2, 0.4]);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let rows = vec![track("x", Some("A"), 0.1), track("x", Some("A"), 0.9), track("y", None, 0.5)];
        let once = dedup(rows);
        let twice = dedup(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_tag_moods_counts() {
        let (tagged, summary) = tag_moods(vec![
            track("a", None, 0.9),
            track("a", None, 0.9),
            track("b", None, 0.5),
        ]);
        assert_eq!(tagged.len(), 2);
        assert_eq!(summary.duplicates_dropped, 1);
        assert_eq!(summary.mood_counts["Happy"], 1);
        assert_eq!(summary.mood_counts["Energetic"], 1);
        assert_eq!(summary.mood_counts["Sad"], 0);
    }

    #[test]
    fn test_full_schema_adds_missing_numeric_and_mood() {
        let input = Schema::new(vec![TrackColumn::TrackName, TrackColumn::Energy]);
        let schema = full_schema(&input);
        assert_eq!(
            schema.columns(),
            &[
                TrackColumn::TrackName,
                TrackColumn::Energy,
                TrackColumn::Valence,
                TrackColumn::Danceability,
                TrackColumn::Acousticness,
                TrackColumn::Tempo,
                TrackColumn::Mood,
            ]
        );
    }
}
