//! Rule-based mood classification
//!
//! Maps one track's audio features and genre text to one of six mood labels.
//! The classifier is a pure function: threshold bands on valence/energy pick a
//! base mood, then genre keywords may override it.
//!
//! # Algorithm
//! 1. Valence or energy missing: genre text and acousticness only
//! 2. Base mood from valence/energy/acousticness bands (first match wins)
//! 3. Genre correction (first matching genre group wins)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mood taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Happy,
    Sad,
    Energetic,
    Calm,
    Serious,
    Neutral,
}

impl Mood {
    /// All labels, in declaration order
    pub const ALL: [Mood; 6] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Energetic,
        Mood::Calm,
        Mood::Serious,
        Mood::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Sad => "Sad",
            Mood::Energetic => "Energetic",
            Mood::Calm => "Calm",
            Mood::Serious => "Serious",
            Mood::Neutral => "Neutral",
        }
    }

    /// Look up a mood from free text after capitalizing it
    /// ("HAPPY", "happy" and "Happy" all resolve to [`Mood::Happy`]).
    pub fn from_label(label: &str) -> Option<Mood> {
        let normalized = capitalize(label.trim());
        Mood::ALL.into_iter().find(|m| m.as_str() == normalized)
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::from_label(s).ok_or_else(|| crate::Error::InvalidInput(format!("unknown mood: {}", s)))
    }
}

/// First character upper-cased, the rest lower-cased
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Classifier input. `None` stands for a missing (NaN) value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoodFeatures<'a> {
    pub valence: Option<f64>,
    pub energy: Option<f64>,
    pub danceability: Option<f64>,
    pub acousticness: Option<f64>,
    pub genres: Option<&'a str>,
}

const ROCK_GROUP: &[&str] = &["metal", "rock", "punk"];
const CHILL_GROUP: &[&str] = &["jazz", "lofi", "indie", "acoustic", "ambient"];
const HIP_HOP_GROUP: &[&str] = &["hip hop", "rap", "trap"];
const CLASSICAL_GROUP: &[&str] = &["classical", "piano", "instrumental"];
const SAD_GROUP: &[&str] = &["sad", "emo", "ballad"];
const POP_GROUP: &[&str] = &["pop", "dance", "disco"];

fn above(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v > threshold)
}

fn contains_any(genres: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| genres.contains(k))
}

/// Classify a track's mood
pub fn classify(features: &MoodFeatures<'_>) -> Mood {
    let genres = features.genres.unwrap_or_default().to_lowercase();

    let (valence, energy) = match (features.valence, features.energy) {
        (Some(v), Some(e)) if !v.is_nan() && !e.is_nan() => (v, e),
        _ => return classify_by_genre(&genres, features),
    };

    let mut mood = base_mood(valence, energy, features.acousticness);

    if contains_any(&genres, ROCK_GROUP) {
        if energy > 0.6 {
            mood = Mood::Energetic;
        }
    } else if contains_any(&genres, CHILL_GROUP) {
        if energy < 0.6 {
            mood = Mood::Calm;
        }
    } else if contains_any(&genres, HIP_HOP_GROUP) {
        if valence < 0.5 {
            mood = Mood::Serious;
        }
    } else if contains_any(&genres, CLASSICAL_GROUP) {
        mood = Mood::Calm;
    } else if contains_any(&genres, SAD_GROUP) {
        mood = Mood::Sad;
    } else if contains_any(&genres, POP_GROUP) && valence > 0.6 && energy > 0.6 {
        mood = Mood::Happy;
    }

    mood
}

/// Fallback when valence or energy is missing
fn classify_by_genre(genres: &str, features: &MoodFeatures<'_>) -> Mood {
    if genres.contains("acoustic") || above(features.acousticness, 0.6) {
        Mood::Calm
    } else if genres.contains("rock") || genres.contains("metal") {
        Mood::Energetic
    } else if genres.contains("pop") && above(features.danceability, 0.6) {
        Mood::Happy
    } else {
        Mood::Neutral
    }
}

fn base_mood(valence: f64, energy: f64, acousticness: Option<f64>) -> Mood {
    if valence > 0.65 && energy > 0.6 {
        Mood::Happy
    } else if valence < 0.4 && energy < 0.5 {
        Mood::Sad
    } else if energy > 0.7 && (0.4..=0.65).contains(&valence) {
        Mood::Energetic
    } else if energy < 0.5 && above(acousticness, 0.5) {
        Mood::Calm
    } else {
        Mood::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(valence: f64, energy: f64, genres: &str) -> MoodFeatures<'_> {
        MoodFeatures {
            valence: Some(valence),
            energy: Some(energy),
            danceability: Some(0.5),
            acousticness: Some(0.1),
            genres: Some(genres),
        }
    }

    #[test]
    fn test_base_bands() {
        assert_eq!(classify(&features(0.8, 0.8, "")), Mood::Happy);
        assert_eq!(classify(&features(0.2, 0.3, "")), Mood::Sad);
        assert_eq!(classify(&features(0.5, 0.9, "")), Mood::Energetic);
        assert_eq!(classify(&features(0.5, 0.5, "")), Mood::Neutral);

        let calm = MoodFeatures {
            acousticness: Some(0.9),
            ..features(0.5, 0.3, "")
        };
        assert_eq!(classify(&calm), Mood::Calm);
    }

    #[test]
    fn test_energetic_band_is_inclusive() {
        assert_eq!(classify(&features(0.4, 0.75, "")), Mood::Energetic);
        assert_eq!(classify(&features(0.65, 0.75, "")), Mood::Energetic);
    }

    #[test]
    fn test_rock_overrides_happy() {
        assert_eq!(classify(&features(0.7, 0.7, "rock")), Mood::Energetic);
    }

    #[test]
    fn test_matching_group_stops_later_groups() {
        // "indie pop" hits the chill group first; energy too high to force Calm,
        // and the pop group is never consulted
        assert_eq!(classify(&features(0.7, 0.62, "indie pop")), Mood::Happy);
        assert_eq!(classify(&features(0.5, 0.65, "indie pop")), Mood::Neutral);
    }

    #[test]
    fn test_genre_corrections() {
        assert_eq!(classify(&features(0.3, 0.55, "lofi beats")), Mood::Calm);
        assert_eq!(classify(&features(0.3, 0.9, "trap")), Mood::Serious);
        assert_eq!(classify(&features(0.9, 0.9, "classical")), Mood::Calm);
        assert_eq!(classify(&features(0.9, 0.9, "['emo']")), Mood::Sad);
        assert_eq!(classify(&features(0.62, 0.62, "disco")), Mood::Happy);
    }

    #[test]
    fn test_genre_matching_ignores_case() {
        assert_eq!(classify(&features(0.9, 0.9, "['Classical', 'Baroque']")), Mood::Calm);
        assert_eq!(classify(&features(0.3, 0.8, "Hip Hop")), Mood::Serious);
    }

    #[test]
    fn test_missing_valence_uses_acousticness() {
        let f = MoodFeatures {
            valence: None,
            energy: Some(0.5),
            danceability: None,
            acousticness: Some(0.7),
            genres: Some(""),
        };
        assert_eq!(classify(&f), Mood::Calm);
    }

    #[test]
    fn test_nan_is_treated_as_missing() {
        let f = MoodFeatures {
            valence: Some(f64::NAN),
            energy: Some(0.9),
            genres: Some("heavy metal"),
            ..Default::default()
        };
        assert_eq!(classify(&f), Mood::Energetic);
    }

    #[test]
    fn test_fallback_without_acousticness_is_genre_only() {
        let pop = MoodFeatures {
            energy: None,
            danceability: Some(0.8),
            genres: Some("dance pop"),
            ..Default::default()
        };
        assert_eq!(classify(&pop), Mood::Happy);

        let nothing = MoodFeatures::default();
        assert_eq!(classify(&nothing), Mood::Neutral);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let f = features(0.55, 0.72, "punk");
        let first = classify(&f);
        for _ in 0..10 {
            assert_eq!(classify(&f), first);
        }
    }

    #[test]
    fn test_from_label_capitalizes() {
        assert_eq!(Mood::from_label("happy"), Some(Mood::Happy));
        assert_eq!(Mood::from_label("SAD"), Some(Mood::Sad));
        assert_eq!(Mood::from_label("Zzz"), None);
        assert!("calm".parse::<Mood>().is_ok());
    }
}
