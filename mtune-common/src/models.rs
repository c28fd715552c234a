//! Track and artist records
//!
//! Raw catalog rows, cleaned rows, mood-tagged rows and indexed rows. Fields
//! that can legitimately be absent are `Option`; numeric cells that are blank
//! or unparseable read as `None`.

use serde::{Deserialize, Serialize};

use crate::features::Feature;
use crate::mood::{classify, Mood, MoodFeatures};
use crate::table::{format_opt_number, RowView, TableRow};

/// Column of a derived track table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackColumn {
    TrackId,
    TrackName,
    AlbumName,
    ReleaseDate,
    Popularity,
    DurationMs,
    Danceability,
    Energy,
    Loudness,
    Speechiness,
    Acousticness,
    Instrumentalness,
    Liveness,
    Valence,
    Tempo,
    Uri,
    ArtistName,
    Genres,
    Mood,
}

impl TrackColumn {
    pub fn name(&self) -> &'static str {
        match self {
            TrackColumn::TrackId => "track_id",
            TrackColumn::TrackName => "track_name",
            TrackColumn::AlbumName => "album_name",
            TrackColumn::ReleaseDate => "release_date",
            TrackColumn::Popularity => "popularity",
            TrackColumn::DurationMs => "duration_ms",
            TrackColumn::Danceability => "danceability",
            TrackColumn::Energy => "energy",
            TrackColumn::Loudness => "loudness",
            TrackColumn::Speechiness => "speechiness",
            TrackColumn::Acousticness => "acousticness",
            TrackColumn::Instrumentalness => "instrumentalness",
            TrackColumn::Liveness => "liveness",
            TrackColumn::Valence => "valence",
            TrackColumn::Tempo => "tempo",
            TrackColumn::Uri => "uri",
            TrackColumn::ArtistName => "artist_name",
            TrackColumn::Genres => "genres",
            TrackColumn::Mood => "mood",
        }
    }

    pub fn from_name(name: &str) -> Option<TrackColumn> {
        ALL_COLUMNS.iter().copied().find(|c| c.name() == name)
    }
}

const ALL_COLUMNS: [TrackColumn; 19] = [
    TrackColumn::TrackId,
    TrackColumn::TrackName,
    TrackColumn::AlbumName,
    TrackColumn::ReleaseDate,
    TrackColumn::Popularity,
    TrackColumn::DurationMs,
    TrackColumn::Danceability,
    TrackColumn::Energy,
    TrackColumn::Loudness,
    TrackColumn::Speechiness,
    TrackColumn::Acousticness,
    TrackColumn::Instrumentalness,
    TrackColumn::Liveness,
    TrackColumn::Valence,
    TrackColumn::Tempo,
    TrackColumn::Uri,
    TrackColumn::ArtistName,
    TrackColumn::Genres,
    TrackColumn::Mood,
];

/// Columns of the cleaned table, in output order
pub const CLEAN_COLUMNS: [TrackColumn; 18] = [
    TrackColumn::TrackId,
    TrackColumn::TrackName,
    TrackColumn::AlbumName,
    TrackColumn::ReleaseDate,
    TrackColumn::Popularity,
    TrackColumn::DurationMs,
    TrackColumn::Danceability,
    TrackColumn::Energy,
    TrackColumn::Loudness,
    TrackColumn::Speechiness,
    TrackColumn::Acousticness,
    TrackColumn::Instrumentalness,
    TrackColumn::Liveness,
    TrackColumn::Valence,
    TrackColumn::Tempo,
    TrackColumn::Uri,
    TrackColumn::ArtistName,
    TrackColumn::Genres,
];

/// Metadata columns leading every indexed tracks table
pub const INDEXED_META_COLUMNS: [TrackColumn; 5] = [
    TrackColumn::TrackId,
    TrackColumn::TrackName,
    TrackColumn::ArtistName,
    TrackColumn::Genres,
    TrackColumn::Mood,
];

/// Artist row of the raw catalog (`artists.csv`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArtist {
    pub artist_id: Option<String>,
    pub artist_name: Option<String>,
    pub genres: Option<String>,
    pub popularity: Option<f64>,
    pub followers: Option<f64>,
}

impl RawArtist {
    /// Raw column names read from the artists file
    pub const COLUMNS: [&'static str; 5] = ["id", "name", "genres", "popularity", "followers"];

    pub fn from_row(row: RowView<'_>) -> Self {
        Self {
            artist_id: row.owned_text("id"),
            artist_name: row.owned_text("name"),
            genres: row.owned_text("genres"),
            popularity: row.number("popularity"),
            followers: row.number("followers"),
        }
    }
}

/// Track row of the raw catalog (`tracks.csv`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTrack {
    pub track_id: Option<String>,
    pub track_name: Option<String>,
    /// Free-text artist reference(s), possibly a list literal
    pub artists: Option<String>,
    pub artist_id: Option<String>,
    pub album_name: Option<String>,
    pub release_date: Option<String>,
    pub popularity: Option<f64>,
    pub duration_ms: Option<f64>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub loudness: Option<f64>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
    pub uri: Option<String>,
}

impl RawTrack {
    /// Raw column names read from the tracks file
    pub const COLUMNS: [&'static str; 18] = [
        "id",
        "name",
        "artists",
        "artist_id",
        "album_name",
        "release_date",
        "popularity",
        "duration_ms",
        "danceability",
        "energy",
        "loudness",
        "speechiness",
        "acousticness",
        "instrumentalness",
        "liveness",
        "valence",
        "tempo",
        "uri",
    ];

    pub fn from_row(row: RowView<'_>) -> Self {
        Self {
            track_id: row.owned_text("id"),
            track_name: row.owned_text("name"),
            artists: row.owned_text("artists"),
            artist_id: row.owned_text("artist_id"),
            album_name: row.owned_text("album_name"),
            release_date: row.owned_text("release_date"),
            popularity: row.number("popularity"),
            duration_ms: row.number("duration_ms"),
            danceability: row.number("danceability"),
            energy: row.number("energy"),
            loudness: row.number("loudness"),
            speechiness: row.number("speechiness"),
            acousticness: row.number("acousticness"),
            instrumentalness: row.number("instrumentalness"),
            liveness: row.number("liveness"),
            valence: row.number("valence"),
            tempo: row.number("tempo"),
            uri: row.owned_text("uri"),
        }
    }
}

/// Cleaned track joined with (at most) one artist
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanTrack {
    pub track_id: Option<String>,
    pub track_name: String,
    pub album_name: Option<String>,
    pub release_date: Option<String>,
    pub popularity: Option<f64>,
    pub duration_ms: Option<f64>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub loudness: Option<f64>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
    pub uri: Option<String>,
    pub artist_name: Option<String>,
    pub genres: Option<String>,
}

impl CleanTrack {
    /// Read a cleaned row; rows without a track name are rejected
    pub fn from_row(row: RowView<'_>) -> Option<Self> {
        Some(Self {
            track_id: row.owned_text("track_id"),
            track_name: row.owned_text("track_name")?,
            album_name: row.owned_text("album_name"),
            release_date: row.owned_text("release_date"),
            popularity: row.number("popularity"),
            duration_ms: row.number("duration_ms"),
            danceability: row.number("danceability"),
            energy: row.number("energy"),
            loudness: row.number("loudness"),
            speechiness: row.number("speechiness"),
            acousticness: row.number("acousticness"),
            instrumentalness: row.number("instrumentalness"),
            liveness: row.number("liveness"),
            valence: row.number("valence"),
            tempo: row.number("tempo"),
            uri: row.owned_text("uri"),
            artist_name: row.owned_text("artist_name"),
            genres: row.owned_text("genres"),
        })
    }

    /// Deduplication key
    pub fn identity(&self) -> (&str, Option<&str>) {
        (self.track_name.as_str(), self.artist_name.as_deref())
    }

    pub fn mood_features(&self) -> MoodFeatures<'_> {
        MoodFeatures {
            valence: self.valence,
            energy: self.energy,
            danceability: self.danceability,
            acousticness: self.acousticness,
            genres: self.genres.as_deref(),
        }
    }

    pub fn feature(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Valence => self.valence,
            Feature::Energy => self.energy,
            Feature::Danceability => self.danceability,
            Feature::Tempo => self.tempo,
            Feature::Popularity => self.popularity,
        }
    }
}

impl TableRow for CleanTrack {
    fn cell(&self, column: TrackColumn) -> Option<String> {
        match column {
            TrackColumn::TrackId => self.track_id.clone(),
            TrackColumn::TrackName => Some(self.track_name.clone()),
            TrackColumn::AlbumName => self.album_name.clone(),
            TrackColumn::ReleaseDate => self.release_date.clone(),
            TrackColumn::Popularity => format_opt_number(self.popularity),
            TrackColumn::DurationMs => format_opt_number(self.duration_ms),
            TrackColumn::Danceability => format_opt_number(self.danceability),
            TrackColumn::Energy => format_opt_number(self.energy),
            TrackColumn::Loudness => format_opt_number(self.loudness),
            TrackColumn::Speechiness => format_opt_number(self.speechiness),
            TrackColumn::Acousticness => format_opt_number(self.acousticness),
            TrackColumn::Instrumentalness => format_opt_number(self.instrumentalness),
            TrackColumn::Liveness => format_opt_number(self.liveness),
            TrackColumn::Valence => format_opt_number(self.valence),
            TrackColumn::Tempo => format_opt_number(self.tempo),
            TrackColumn::Uri => self.uri.clone(),
            TrackColumn::ArtistName => self.artist_name.clone(),
            TrackColumn::Genres => self.genres.clone(),
            TrackColumn::Mood => None,
        }
    }
}

/// Cleaned track with its mood label
#[derive(Debug, Clone, PartialEq)]
pub struct MoodTrack {
    pub track: CleanTrack,
    pub mood: Mood,
}

impl MoodTrack {
    /// Tag a cleaned track with its classified mood
    pub fn classify(track: CleanTrack) -> Self {
        let mood = classify(&track.mood_features());
        Self { track, mood }
    }

    /// Read a mood-tagged row
    ///
    /// A blank or unknown mood cell is re-derived with the classifier, which
    /// is a pure function of the row.
    pub fn from_row(row: RowView<'_>) -> Option<Self> {
        let track = CleanTrack::from_row(row)?;
        match row.text("mood").and_then(Mood::from_label) {
            Some(mood) => Some(Self { track, mood }),
            None => Some(Self::classify(track)),
        }
    }
}

impl TableRow for MoodTrack {
    fn cell(&self, column: TrackColumn) -> Option<String> {
        match column {
            TrackColumn::Mood => Some(self.mood.to_string()),
            other => self.track.cell(other),
        }
    }
}

/// Row of the indexed tracks table, aligned with the neighbor index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedTrack {
    pub track_id: Option<String>,
    pub track_name: String,
    pub artist_name: Option<String>,
    pub genres: Option<String>,
    pub mood: Option<Mood>,
    pub valence: Option<f64>,
    pub energy: Option<f64>,
    pub danceability: Option<f64>,
    pub tempo: Option<f64>,
    pub popularity: Option<f64>,
}

impl IndexedTrack {
    pub fn from_mood_track(row: &MoodTrack) -> Self {
        let t = &row.track;
        Self {
            track_id: t.track_id.clone(),
            track_name: t.track_name.clone(),
            artist_name: t.artist_name.clone(),
            genres: t.genres.clone(),
            mood: Some(row.mood),
            valence: t.valence,
            energy: t.energy,
            danceability: t.danceability,
            tempo: t.tempo,
            popularity: t.popularity,
        }
    }

    /// Read an indexed row
    ///
    /// Every row is kept (a blank track name reads as empty) so that row
    /// positions stay aligned with the neighbor index.
    pub fn from_row(row: RowView<'_>) -> Option<Self> {
        Some(Self {
            track_id: row.owned_text("track_id"),
            track_name: row.owned_text("track_name").unwrap_or_default(),
            artist_name: row.owned_text("artist_name"),
            genres: row.owned_text("genres"),
            mood: row.text("mood").and_then(Mood::from_label),
            valence: row.number("valence"),
            energy: row.number("energy"),
            danceability: row.number("danceability"),
            tempo: row.number("tempo"),
            popularity: row.number("popularity"),
        })
    }

    pub fn feature(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Valence => self.valence,
            Feature::Energy => self.energy,
            Feature::Danceability => self.danceability,
            Feature::Tempo => self.tempo,
            Feature::Popularity => self.popularity,
        }
    }

    /// Values for `features`, or `None` if any of them is missing
    pub fn feature_vector(&self, features: &[Feature]) -> Option<Vec<f64>> {
        features.iter().map(|f| self.feature(*f)).collect()
    }
}

impl TableRow for IndexedTrack {
    fn cell(&self, column: TrackColumn) -> Option<String> {
        match column {
            TrackColumn::TrackId => self.track_id.clone(),
            TrackColumn::TrackName => Some(self.track_name.clone()),
            TrackColumn::ArtistName => self.artist_name.clone(),
            TrackColumn::Genres => self.genres.clone(),
            TrackColumn::Mood => self.mood.map(|m| m.to_string()),
            TrackColumn::Valence => format_opt_number(self.valence),
            TrackColumn::Energy => format_opt_number(self.energy),
            TrackColumn::Danceability => format_opt_number(self.danceability),
            TrackColumn::Tempo => format_opt_number(self.tempo),
            TrackColumn::Popularity => format_opt_number(self.popularity),
            _ => None,
        }
    }
}
