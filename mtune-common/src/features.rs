//! Similarity feature set and standardization
//!
//! The neighbor index works in a scaled feature space: every feature is
//! shifted by its training mean and divided by its training standard
//! deviation. The fitted parameters are persisted with the index and must be
//! reused unchanged at query time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::TrackColumn;
use crate::{Error, Result};

/// Numeric feature used for similarity search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Valence,
    Energy,
    Danceability,
    Tempo,
    Popularity,
}

impl Feature {
    /// Full feature vector, in matrix column order
    pub const ALL: [Feature; 5] = [
        Feature::Valence,
        Feature::Energy,
        Feature::Danceability,
        Feature::Tempo,
        Feature::Popularity,
    ];

    pub fn column(&self) -> TrackColumn {
        match self {
            Feature::Valence => TrackColumn::Valence,
            Feature::Energy => TrackColumn::Energy,
            Feature::Danceability => TrackColumn::Danceability,
            Feature::Tempo => TrackColumn::Tempo,
            Feature::Popularity => TrackColumn::Popularity,
        }
    }
}

/// Fitted standardization transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    /// Index build this scaler belongs to
    pub build_id: Uuid,
    /// Features in matrix column order
    pub features: Vec<Feature>,
    /// Per-feature training mean
    pub mean: Vec<f64>,
    /// Per-feature divisor (population standard deviation, 1.0 when constant)
    pub scale: Vec<f64>,
}

impl FeatureScaler {
    /// Fit mean and scale over the rows of `matrix`
    ///
    /// Every row must have one value per feature.
    pub fn fit(build_id: Uuid, features: Vec<Feature>, matrix: &[Vec<f64>]) -> Result<Self> {
        if matrix.is_empty() {
            return Err(Error::EmptyTrainingSet("no rows to fit scaler on".to_string()));
        }
        let dims = features.len();
        if let Some(bad) = matrix.iter().position(|row| row.len() != dims) {
            return Err(Error::InvalidInput(format!(
                "row {} has {} values, expected {}",
                bad,
                matrix[bad].len(),
                dims
            )));
        }
        if let Some(bad) = matrix.iter().position(|row| row.iter().any(|x| !x.is_finite())) {
            return Err(Error::InvalidInput(format!("row {} holds a non-finite value", bad)));
        }

        let n = matrix.len() as f64;
        let mut mean = vec![0.0; dims];
        for row in matrix {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; dims];
        for row in matrix {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m) * (x - m);
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > f64::EPSILON { std } else { 1.0 }
            })
            .collect();

        Ok(Self {
            build_id,
            features,
            mean,
            scale,
        })
    }

    pub fn dims(&self) -> usize {
        self.features.len()
    }

    /// Scale one feature vector
    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>> {
        if values.len() != self.dims() {
            return Err(Error::InvalidInput(format!(
                "feature vector has {} values, scaler expects {}",
                values.len(),
                self.dims()
            )));
        }
        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    /// Scale every row of a matrix
    pub fn transform_all(&self, matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        matrix.iter().map(|row| self.transform(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> Vec<Vec<f64>> {
        vec![
            vec![0.1, 100.0],
            vec![0.5, 120.0],
            vec![0.9, 140.0],
        ]
    }

    #[test]
    fn test_fit_population_std() {
        let scaler =
            FeatureScaler::fit(Uuid::nil(), vec![Feature::Valence, Feature::Tempo], &matrix()).unwrap();
        assert!((scaler.mean[0] - 0.5).abs() < 1e-12);
        assert!((scaler.mean[1] - 120.0).abs() < 1e-12);
        // sqrt(((-20)^2 + 0 + 20^2) / 3)
        assert!((scaler.scale[1] - (800.0f64 / 3.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_transformed_training_set_is_standardized() {
        let scaler =
            FeatureScaler::fit(Uuid::nil(), vec![Feature::Valence, Feature::Tempo], &matrix()).unwrap();
        let scaled = scaler.transform_all(&matrix()).unwrap();

        for col in 0..2 {
            let values: Vec<f64> = scaled.iter().map(|r| r[col]).collect();
            let mean = values.iter().sum::<f64>() / 3.0;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-9);
            assert!((var - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_feature_scale_is_one() {
        let rows = vec![vec![3.0], vec![3.0]];
        let scaler = FeatureScaler::fit(Uuid::nil(), vec![Feature::Popularity], &rows).unwrap();
        assert_eq!(scaler.scale, vec![1.0]);
        assert_eq!(scaler.transform(&[3.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_empty_and_ragged_input_rejected() {
        assert!(matches!(
            FeatureScaler::fit(Uuid::nil(), vec![Feature::Energy], &[]),
            Err(Error::EmptyTrainingSet(_))
        ));
        let ragged = vec![vec![1.0], vec![1.0, 2.0]];
        assert!(FeatureScaler::fit(Uuid::nil(), vec![Feature::Energy], &ragged).is_err());
    }

    #[test]
    fn test_non_finite_input_rejected() {
        for bad in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let rows = vec![vec![0.1], vec![bad], vec![0.3]];
            assert!(matches!(
                FeatureScaler::fit(Uuid::nil(), vec![Feature::Popularity], &rows),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_json_round_trip_preserves_transform() {
        let scaler =
            FeatureScaler::fit(Uuid::new_v4(), vec![Feature::Valence, Feature::Tempo], &matrix()).unwrap();
        let json = serde_json::to_string(&scaler).unwrap();
        let restored: FeatureScaler = serde_json::from_str(&json).unwrap();
        let a = scaler.transform(&[0.3, 111.0]).unwrap();
        let b = restored.transform(&[0.3, 111.0]).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-12);
        }
    }
}
