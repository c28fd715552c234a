//! Catalog text search

use mtune_common::IndexedTrack;
use std::sync::Arc;

/// Case-insensitive substring search on track and artist names
#[derive(Debug, Clone)]
pub struct CatalogSearch {
    tracks: Arc<[IndexedTrack]>,
}

impl CatalogSearch {
    pub fn new(tracks: Arc<[IndexedTrack]>) -> Self {
        Self { tracks }
    }

    /// Matching tracks in catalog order, at most `limit`; a blank query matches nothing
    pub fn search(&self, query: &str, limit: usize) -> Vec<IndexedTrack> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.tracks
            .iter()
            .filter(|t| {
                t.track_name.to_lowercase().contains(&needle)
                    || t.artist_name.as_deref().is_some_and(|a| a.to_lowercase().contains(&needle))
            })
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str, artist: Option<&str>) -> IndexedTrack {
        IndexedTrack {
            track_id: None,
            track_name: name.to_string(),
            artist_name: artist.map(str::to_string),
            genres: None,
            mood: None,
            valence: None,
            energy: None,
            danceability: None,
            tempo: None,
            popularity: None,
        }
    }

    fn catalog() -> CatalogSearch {
        CatalogSearch::new(Arc::from(vec![
            track("Hello", Some("Adele")),
            track("Lovely Day", None),
            track("Get Lucky", Some("Daft Punk")),
        ]))
    }

    #[test]
    fn test_matches_name_or_artist_case_insensitive() {
        let names: Vec<String> = catalog().search("DAFT", 10).into_iter().map(|t| t.track_name).collect();
        assert_eq!(names, vec!["Get Lucky"]);
        let names: Vec<String> = catalog().search("l", 10).into_iter().map(|t| t.track_name).collect();
        assert_eq!(names, vec!["Hello", "Lovely Day", "Get Lucky"]);
    }

    #[test]
    fn test_limit_and_blank_query() {
        assert_eq!(catalog().search("l", 1).len(), 1);
        assert!(catalog().search("   ", 10).is_empty());
    }
}
