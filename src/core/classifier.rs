//! The classifier boundary.
//!
//! Gesture models are trained and stored elsewhere; the pipeline only needs
//! something that maps a feature matrix to one label per row.

use crate::core::features::FeatureMatrix;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised by classifier implementations.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model has no classes")]
    EmptyModel,

    #[error("feature width mismatch: model expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("classifier failed: {0}")]
    Other(String),
}

/// Maps each feature row to a label.
///
/// Implementations are called once per session with every usable window of
/// that session and must return exactly one label per row.
pub trait Classifier {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>, ClassifierError>;
}

impl<F> Classifier for F
where
    F: Fn(&FeatureMatrix) -> Result<Vec<String>, ClassifierError>,
{
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>, ClassifierError> {
        self(features)
    }
}

/// A labelled reference point in feature space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Centroid {
    pub label: String,
    pub features: Vec<f64>,
}

/// Assigns each row the label of the closest centroid (Euclidean distance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestCentroid {
    centroids: Vec<Centroid>,
}

impl NearestCentroid {
    /// Create a classifier; all centroids must share one width.
    pub fn new(centroids: Vec<Centroid>) -> Result<Self, ClassifierError> {
        let first = centroids.first().ok_or(ClassifierError::EmptyModel)?;
        let expected = first.features.len();
        if let Some(bad) = centroids.iter().find(|c| c.features.len() != expected) {
            return Err(ClassifierError::DimensionMismatch {
                expected,
                actual: bad.features.len(),
            });
        }
        Ok(Self { centroids })
    }

    /// Load a model file of the form `{"centroids": [{"label": .., "features": [..]}]}`.
    pub fn from_path(path: &Path) -> Result<Self, ClassifierError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ClassifierError> {
        let model: NearestCentroid = serde_json::from_str(content)?;
        Self::new(model.centroids)
    }

    /// Feature width the model was built for.
    pub fn width(&self) -> usize {
        self.centroids.first().map_or(0, |c| c.features.len())
    }

    fn nearest(&self, row: &[f64]) -> &str {
        let mut best: Option<(&Centroid, f64)> = None;
        for centroid in &self.centroids {
            let distance: f64 = centroid
                .features
                .iter()
                .zip(row)
                .map(|(c, x)| (c - x).powi(2))
                .sum();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((centroid, distance));
            }
        }
        best.map_or("", |(c, _)| c.label.as_str())
    }
}

impl Classifier for NearestCentroid {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>, ClassifierError> {
        if features.is_empty() {
            return Ok(Vec::new());
        }
        if features.width() != self.width() {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.width(),
                actual: features.width(),
            });
        }

        Ok(features
            .rows()
            .iter()
            .map(|row| self.nearest(row.values()).to_string())
            .collect())
    }
}
