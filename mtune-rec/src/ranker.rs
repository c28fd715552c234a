//! Mood-based ranking over the catalog snapshot

use mtune_common::{Feature, IndexedTrack, Mood};
use rand::Rng;
use std::cmp::Ordering;
use std::sync::Arc;

/// Ordering applied to a mood's candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMethod {
    /// Most popular first
    Popularity,
    /// Highest valence × energy first
    ValenceEnergy,
    /// Uniform sample without replacement
    Random,
}

impl RankMethod {
    /// Parse a method name; anything unrecognized ranks randomly
    pub fn parse(method: &str) -> Self {
        match method.trim().to_lowercase().as_str() {
            "popularity" => RankMethod::Popularity,
            "valence_energy" | "valence & energy" => RankMethod::ValenceEnergy,
            _ => RankMethod::Random,
        }
    }
}

/// Ranks and samples catalog tracks by mood
#[derive(Debug, Clone)]
pub struct MoodRanker {
    tracks: Arc<[IndexedTrack]>,
    has_popularity: bool,
    has_valence_energy: bool,
}

impl MoodRanker {
    /// `features` are the numeric columns present in the table
    pub fn new(tracks: Arc<[IndexedTrack]>, features: &[Feature]) -> Self {
        Self {
            tracks,
            has_popularity: features.contains(&Feature::Popularity),
            has_valence_energy: features.contains(&Feature::Valence) && features.contains(&Feature::Energy),
        }
    }

    /// An empty ranker; every query returns nothing
    pub fn empty() -> Self {
        Self::new(Arc::from(Vec::new()), &[])
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Distinct moods present in the catalog, sorted by label
    pub fn moods(&self) -> Vec<Mood> {
        let mut moods: Vec<Mood> = Vec::new();
        for mood in self.tracks.iter().filter_map(|t| t.mood) {
            if !moods.contains(&mood) {
                moods.push(mood);
            }
        }
        moods.sort_by_key(|m| m.as_str());
        moods
    }

    /// Tracks tagged with `mood`; the whole catalog when no track carries it
    ///
    /// The mood text is capitalized first, so `happy` and `HAPPY` both select
    /// `Happy`.
    fn candidates(&self, mood: &str) -> Vec<&IndexedTrack> {
        if let Some(mood) = Mood::from_label(mood) {
            let group: Vec<&IndexedTrack> = self.tracks.iter().filter(|t| t.mood == Some(mood)).collect();
            if !group.is_empty() {
                return group;
            }
        }
        self.tracks.iter().collect()
    }

    /// Up to `top_n` tracks for `mood`, ordered by `method`
    pub fn recommend(&self, mood: &str, top_n: usize, method: RankMethod) -> Vec<IndexedTrack> {
        self.recommend_with_rng(mood, top_n, method, &mut rand::thread_rng())
    }

    pub fn recommend_with_rng<R: Rng + ?Sized>(
        &self,
        mood: &str,
        top_n: usize,
        method: RankMethod,
        rng: &mut R,
    ) -> Vec<IndexedTrack> {
        let mut candidates = self.candidates(mood);
        match method {
            RankMethod::Popularity if self.has_popularity => {
                candidates.sort_by(|a, b| descending_missing_last(a.popularity, b.popularity));
                take(candidates, top_n)
            }
            RankMethod::ValenceEnergy if self.has_valence_energy => {
                candidates.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(Ordering::Equal));
                take(candidates, top_n)
            }
            _ => sample_from(&candidates, top_n, rng),
        }
    }

    /// Up to `n` random tracks for `mood`
    pub fn sample_by_mood(&self, mood: &str, n: usize) -> Vec<IndexedTrack> {
        sample_from(&self.candidates(mood), n, &mut rand::thread_rng())
    }

    /// Up to `n` random tracks from the whole catalog
    pub fn sample(&self, n: usize) -> Vec<IndexedTrack> {
        let all: Vec<&IndexedTrack> = self.tracks.iter().collect();
        sample_from(&all, n, &mut rand::thread_rng())
    }
}

fn score(track: &IndexedTrack) -> f64 {
    track.valence.unwrap_or(0.0) * track.energy.unwrap_or(0.0)
}

fn descending_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn take(candidates: Vec<&IndexedTrack>, n: usize) -> Vec<IndexedTrack> {
    candidates.into_iter().take(n).cloned().collect()
}

fn sample_from<R: Rng + ?Sized>(candidates: &[&IndexedTrack], n: usize, rng: &mut R) -> Vec<IndexedTrack> {
    let amount = n.min(candidates.len());
    rand::seq::index::sample(rng, candidates.len(), amount)
        .into_iter()
        .map(|i| candidates[i].clone())
        .collect()
}
