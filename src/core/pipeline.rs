//! End-to-end gesture classification for one recording.

use crate::core::aggregation::{aggregate, ClassificationResult};
use crate::core::classifier::{Classifier, ClassifierError};
use crate::core::features::{FeatureExtractor, FeatureMatrix};
use crate::core::windowing::{WindowConfig, WindowError, WindowSegmenter};
use crate::ingest::{Column, MotionTable};
use crate::stats::SharedStats;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort classification of a session.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("classifier returned {actual} labels for {expected} feature rows")]
    PredictionCountMismatch { expected: usize, actual: usize },
}

/// Parameters of the gesture path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub window_length_secs: f64,
    pub overlap_secs: f64,
    /// Columns summarised per window, in feature order
    pub columns: Vec<Column>,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            window_length_secs: 0.1,
            overlap_secs: 0.0,
            columns: Column::HEAD_POSE.to_vec(),
        }
    }
}

/// Segments, extracts, classifies and aggregates one recording at a time.
#[derive(Debug, Clone)]
pub struct GesturePipeline {
    segmenter: WindowSegmenter,
    extractor: FeatureExtractor,
    stats: Option<SharedStats>,
}

impl GesturePipeline {
    pub fn new(config: &GestureConfig) -> Result<Self, WindowError> {
        let window = WindowConfig::new(config.window_length_secs, config.overlap_secs)?;
        Ok(Self {
            segmenter: WindowSegmenter::new(window),
            extractor: FeatureExtractor::new(config.columns.clone()),
            stats: None,
        })
    }

    /// Count windows and classifications in shared stats.
    pub fn with_stats(mut self, stats: SharedStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Feature rows of every usable window, in window order.
    ///
    /// Windows whose vector is incomplete or not finite are counted as
    /// discarded and leave no row.
    pub fn features(&self, table: &MotionTable) -> FeatureMatrix {
        let mut matrix = FeatureMatrix::new(self.extractor.expected_len());
        let mut produced = 0u64;
        let mut discarded = 0u64;

        for window in self.segmenter.segment(table) {
            produced += 1;
            let usable = match self.extractor.extract(&window) {
                Some(features) => matrix.push(features),
                None => false,
            };
            if !usable {
                discarded += 1;
                tracing::debug!(window = window.index, start = window.start, "Window discarded");
            }
        }

        if let Some(ref stats) = self.stats {
            stats.record_windows(produced, discarded);
        }
        tracing::debug!(produced, discarded, usable = matrix.len(), "Extracted features");
        matrix
    }

    /// Classify a recording against its own session id.
    ///
    /// A session without usable windows is not an error: the result has no
    /// prediction and no metrics, and the classifier is not called.
    pub fn run<C>(&self, table: &MotionTable, classifier: &C) -> Result<ClassificationResult, PipelineError>
    where
        C: Classifier + ?Sized,
    {
        let matrix = self.features(table);
        if let Some(ref stats) = self.stats {
            stats.record_session();
        }

        let predictions = if matrix.is_empty() {
            tracing::warn!(session = table.session_id().unwrap_or("<none>"), "No usable windows");
            Vec::new()
        } else {
            let labels = classifier.predict(&matrix)?;
            if labels.len() != matrix.len() {
                return Err(PipelineError::PredictionCountMismatch {
                    expected: matrix.len(),
                    actual: labels.len(),
                });
            }
            if let Some(ref stats) = self.stats {
                stats.record_classified(labels.len() as u64);
            }
            labels
        };

        let result = aggregate(&predictions, table.session_id());
        tracing::info!(
            session = result.actual.as_deref().unwrap_or("<none>"),
            predicted = result.predicted.as_deref().unwrap_or("<none>"),
            windows = result.windows_classified,
            balanced_accuracy = ?result.balanced_accuracy,
            "Session classified"
        );
        Ok(result)
    }
}
