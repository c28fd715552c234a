//! Dataset cleaner
//!
//! Joins the raw tracks file with the raw artists file and writes the cleaned
//! catalog table. Tracks are streamed in fixed-size chunks; each chunk is
//! appended to the output and flushed before the next one is read, so memory
//! use is bounded by the chunk size plus the artist lookup.

use mtune_common::models::{RawArtist, RawTrack, TrackColumn, CLEAN_COLUMNS};
use mtune_common::table::{self, Header, Schema, TableWriter};
use mtune_common::{CleanTrack, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use super::artist_key::extract_artist_key;

/// How tracks are matched to artists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Exact match of the tracks' `artist_id` on the artists' `id`
    ArtistId,
    /// Artist key derived from `artists`, matched on the artists' `name`
    ArtistName,
    /// Tracks carry no artist reference; artist columns stay empty
    Unjoined,
}

impl JoinMode {
    pub fn for_header(tracks: &Header) -> Self {
        if tracks.contains("artist_id") {
            JoinMode::ArtistId
        } else if tracks.contains("artists") {
            JoinMode::ArtistName
        } else {
            JoinMode::Unjoined
        }
    }
}

/// Artist fields carried into the cleaned table
#[derive(Debug, Clone, Default, PartialEq)]
struct ArtistInfo {
    artist_name: Option<String>,
    genres: Option<String>,
}

/// Artist rows keyed for the active join mode; the first row per key wins
#[derive(Debug, Default)]
pub struct ArtistLookup {
    by_key: HashMap<String, ArtistInfo>,
    has_name: bool,
    has_genres: bool,
}

impl ArtistLookup {
    pub fn load(path: &Path, mode: JoinMode) -> Result<Self> {
        let header = table::read_header(path)?;
        let missing: Vec<&str> = RawArtist::COLUMNS
            .iter()
            .copied()
            .filter(|c| !header.contains(c))
            .collect();
        if !missing.is_empty() {
            warn!(path = %path.display(), ?missing, "Artists file lacks expected columns");
        }

        let (_, artists) = table::read_rows(path, |row| Some(RawArtist::from_row(row)))?;
        let mut lookup = Self {
            by_key: HashMap::new(),
            has_name: header.contains("name"),
            has_genres: header.contains("genres"),
        };

        let mut duplicates = 0usize;
        for artist in artists {
            let key = match mode {
                JoinMode::ArtistId => artist.artist_id.clone(),
                JoinMode::ArtistName => artist.artist_name.clone(),
                JoinMode::Unjoined => None,
            };
            let Some(key) = key else { continue };
            if lookup.by_key.contains_key(&key) {
                duplicates += 1;
                continue;
            }
            lookup.by_key.insert(
                key,
                ArtistInfo {
                    artist_name: artist.artist_name,
                    genres: artist.genres,
                },
            );
        }

        info!(
            artists = lookup.by_key.len(),
            duplicates,
            ?mode,
            "Loaded artist lookup from {}",
            path.display()
        );
        Ok(lookup)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    fn get(&self, key: &str) -> Option<&ArtistInfo> {
        self.by_key.get(key)
    }
}

/// Totals of one cleaner run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanSummary {
    pub rows_read: usize,
    pub rows_written: usize,
    pub chunks: usize,
    pub matched_artists: usize,
}

/// Streams the raw tracks file into the cleaned table
#[derive(Debug, Clone)]
pub struct DatasetCleaner {
    chunk_size: usize,
}

impl DatasetCleaner {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Clean `tracks_path` joined with `artists_path` into `output_path`
    ///
    /// The output header is written before the first chunk, so an input with
    /// no data rows still yields a header-only file.
    pub fn clean(&self, artists_path: &Path, tracks_path: &Path, output_path: &Path) -> Result<CleanSummary> {
        let (mut reader, header) = table::open_reader(tracks_path)?;
        let mode = JoinMode::for_header(&header);
        let artists = match mode {
            JoinMode::Unjoined => {
                warn!("Tracks file has neither artist_id nor artists; artist columns stay empty");
                ArtistLookup::default()
            }
            _ => ArtistLookup::load(artists_path, mode)?,
        };

        let schema = output_schema(&header, &artists, mode);
        debug!(columns = ?schema.header_record(), "Cleaned table schema");
        let mut writer = TableWriter::create(output_path, schema)?;

        let mut summary = CleanSummary::default();
        let mut chunk: Vec<RawTrack> = Vec::with_capacity(self.chunk_size);
        let mut record = csv::StringRecord::new();
        loop {
            let more = match reader.read_record(&mut record) {
                Ok(more) => more,
                Err(e) if table::is_record_error(&e) => {
                    debug!(error = %e, "Skipping unreadable track row");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if more {
                chunk.push(RawTrack::from_row(table::RowView::new(&header, &record)));
            }
            if chunk.len() >= self.chunk_size || (!more && !chunk.is_empty()) {
                self.write_chunk(&mut writer, &artists, mode, &mut chunk, &mut summary)?;
            }
            if !more {
                break;
            }
        }

        info!(
            rows_read = summary.rows_read,
            rows_written = summary.rows_written,
            chunks = summary.chunks,
            matched_artists = summary.matched_artists,
            "Cleaned dataset written to {}",
            output_path.display()
        );
        Ok(summary)
    }

    fn write_chunk(
        &self,
        writer: &mut TableWriter,
        artists: &ArtistLookup,
        mode: JoinMode,
        chunk: &mut Vec<RawTrack>,
        summary: &mut CleanSummary,
    ) -> Result<()> {
        let rows_in = chunk.len();
        let mut written = 0usize;
        for raw in chunk.drain(..) {
            let artist = resolve_artist(&raw, artists, mode);
            let matched = artist.is_some();
            if let Some(track) = clean_track(raw, artist) {
                writer.write_row(&track)?;
                written += 1;
                if matched {
                    summary.matched_artists += 1;
                }
            }
        }
        writer.flush()?;

        summary.chunks += 1;
        summary.rows_read += rows_in;
        summary.rows_written += written;
        info!(
            chunk = summary.chunks,
            rows = rows_in,
            written,
            total_written = summary.rows_written,
            "Processed chunk"
        );
        Ok(())
    }
}

/// Columns of the cleaned table given what the inputs provide
fn output_schema(tracks: &Header, artists: &ArtistLookup, mode: JoinMode) -> Schema {
    let joined = mode != JoinMode::Unjoined;
    let present = CLEAN_COLUMNS
        .iter()
        .copied()
        .filter(|column| match column {
            TrackColumn::ArtistName => joined && artists.has_name,
            TrackColumn::Genres => joined && artists.has_genres,
            other => tracks.contains(raw_track_column(*other)),
        })
        .collect::<Vec<_>>();

    let skipped: Vec<&str> = CLEAN_COLUMNS
        .iter()
        .filter(|c| !present.contains(c))
        .map(|c| c.name())
        .collect();
    if !skipped.is_empty() {
        warn!(?skipped, "Cleaned table columns unavailable in inputs");
    }
    Schema::new(present)
}

/// Column name in the raw tracks file for a cleaned column
fn raw_track_column(column: TrackColumn) -> &'static str {
    match column {
        TrackColumn::TrackId => "id",
        TrackColumn::TrackName => "name",
        other => other.name(),
    }
}

fn resolve_artist<'a>(raw: &RawTrack, artists: &'a ArtistLookup, mode: JoinMode) -> Option<&'a ArtistInfo> {
    match mode {
        JoinMode::ArtistId => artists.get(raw.artist_id.as_deref()?),
        JoinMode::ArtistName => {
            let key = extract_artist_key(raw.artists.as_deref()?);
            artists.get(key.as_str())
        }
        JoinMode::Unjoined => None,
    }
}

/// Build the cleaned row; tracks without a name are dropped
fn clean_track(raw: RawTrack, artist: Option<&ArtistInfo>) -> Option<CleanTrack> {
    let artist = artist.cloned().unwrap_or_default();
    Some(CleanTrack {
        track_id: raw.track_id,
        track_name: raw.track_name?,
        album_name: raw.album_name,
        release_date: raw.release_date,
        popularity: raw.popularity,
        duration_ms: raw.duration_ms,
        danceability: raw.danceability,
        energy: raw.energy,
        loudness: raw.loudness,
        speechiness: raw.speechiness,
        acousticness: raw.acousticness,
        instrumentalness: raw.instrumentalness,
        liveness: raw.liveness,
        valence: raw.valence,
        tempo: raw.tempo,
        uri: raw.uri,
        artist_name: artist.artist_name,
        genres: artist.genres,
    })
}
