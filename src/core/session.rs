//! Every applicable analysis of one recording.
//!
//! The gesture path runs only when a classifier is attached, heart rate only
//! when the samples carry both velocities, and tremor only when the configured
//! tracked point has a long enough trace.

use crate::config::Config;
use crate::core::aggregation::ClassificationResult;
use crate::core::classifier::Classifier;
use crate::core::heart_rate::{HeartRateEstimator, HeartRateSeries};
use crate::core::pipeline::{GesturePipeline, PipelineError};
use crate::core::spectral::FilterDesignError;
use crate::core::tremor::{TremorAssessment, TremorDetector};
use crate::core::windowing::WindowError;
use crate::ingest::MotionTable;
use crate::stats::SharedStats;
use std::sync::Arc;
use thiserror::Error;

/// A classifier that can be shared between worker threads.
pub type SharedClassifier = Arc<dyn Classifier + Send + Sync>;

/// Errors raised while building an analyzer from configuration.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("gesture settings: {0}")]
    Window(#[from] WindowError),

    #[error("filter settings: {0}")]
    Filter(#[from] FilterDesignError),
}

/// Results of one recording; absent sections were not applicable.
#[derive(Debug, Clone, Default)]
pub struct SessionAnalysis {
    pub gesture: Option<ClassificationResult>,
    pub heart_rate: Option<HeartRateSeries>,
    pub tremor: Option<TremorAssessment>,
}

/// Runs the gesture, heart-rate and tremor paths over recordings.
pub struct SessionAnalyzer {
    pipeline: GesturePipeline,
    classifier: Option<SharedClassifier>,
    heart_rate: HeartRateEstimator,
    tremor: TremorDetector,
    stats: Option<SharedStats>,
}

impl SessionAnalyzer {
    pub fn new(config: &Config) -> Result<Self, AnalyzerError> {
        Ok(Self {
            pipeline: GesturePipeline::new(&config.gesture)?,
            classifier: None,
            heart_rate: HeartRateEstimator::new(config.heart_rate)?,
            tremor: TremorDetector::new(config.tremor)?,
            stats: None,
        })
    }

    /// Enable the gesture path.
    pub fn with_classifier(mut self, classifier: SharedClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_stats(mut self, stats: SharedStats) -> Self {
        self.pipeline = self.pipeline.with_stats(Arc::clone(&stats));
        self.stats = Some(stats);
        self
    }

    /// Analyse a recording.
    ///
    /// Heart rate is estimated from `velocity` when given, otherwise from the
    /// recording itself. Only a failure of the gesture path is an error.
    pub fn analyze(&self, table: &MotionTable, velocity: Option<&MotionTable>) -> Result<SessionAnalysis, PipelineError> {
        let mut analysis = SessionAnalysis::default();

        match self.classifier {
            Some(ref classifier) => analysis.gesture = Some(self.pipeline.run(table, classifier.as_ref())?),
            None => {
                if let Some(ref stats) = self.stats {
                    stats.record_session();
                }
            }
        }

        let heart_source = velocity.unwrap_or(table);
        if has_velocity(heart_source) {
            let series = self.heart_rate.estimate(heart_source);
            if let Some(ref stats) = self.stats {
                let estimated = series.valid().count();
                stats.record_seconds(estimated as u64, (series.len() - estimated) as u64);
            }
            analysis.heart_rate = Some(series);
        } else {
            tracing::debug!("No velocity data, skipping heart rate");
        }

        analysis.tremor = self.tremor.detect(table);
        if analysis.tremor.is_some() {
            if let Some(ref stats) = self.stats {
                stats.record_tremor_screen();
            }
        } else {
            tracing::debug!(source = ?self.tremor.config().source, "No trace long enough for tremor screening");
        }

        Ok(analysis)
    }
}

fn has_velocity(table: &MotionTable) -> bool {
    table
        .samples()
        .iter()
        .any(|s| s.linear_velocity.is_some() && s.angular_velocity.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::ClassifierError;
    use crate::core::features::FeatureMatrix;
    use crate::ingest::{MotionSample, Vec3};
    use crate::stats::create_shared_stats;

    fn head_recording() -> MotionTable {
        MotionTable::from_samples(
            (0..50)
                .map(|i| {
                    let t = i as f64 / 50.0;
                    MotionSample {
                        session_id: Some("still".to_string()),
                        head_position: Some(Vec3::new(0.0, 1.6, 0.0)),
                        head_rotation: Some(Vec3::new(0.1 * t, 0.0, 0.0)),
                        ..MotionSample::at(t)
                    }
                })
                .collect(),
        )
    }

    fn always_still() -> SharedClassifier {
        Arc::new(|features: &FeatureMatrix| -> Result<Vec<String>, ClassifierError> {
            Ok(vec!["still".to_string(); features.len()])
        })
    }

    #[test]
    fn test_without_classifier_skips_gesture() {
        let analyzer = SessionAnalyzer::new(&Config::default()).unwrap();
        let analysis = analyzer.analyze(&head_recording(), None).unwrap();

        assert!(analysis.gesture.is_none());
        assert!(analysis.heart_rate.is_none());
        assert!(analysis.tremor.is_none());
    }

    #[test]
    fn test_with_classifier_runs_gesture() {
        let stats = create_shared_stats();
        let analyzer = SessionAnalyzer::new(&Config::default())
            .unwrap()
            .with_classifier(always_still())
            .with_stats(Arc::clone(&stats));

        let analysis = analyzer.analyze(&head_recording(), None).unwrap();

        let gesture = analysis.gesture.unwrap();
        assert_eq!(gesture.predicted.as_deref(), Some("still"));
        assert_eq!(gesture.balanced_accuracy, Some(1.0));
        assert_eq!(stats.snapshot().sessions_processed, 1);
    }

    #[test]
    fn test_separate_velocity_log() {
        let velocity = MotionTable::from_samples(
            (0..100)
                .map(|i| {
                    let mut sample = MotionSample::at(i as f64 / 37.7);
                    sample.linear_velocity = Some(Vec3::new(1.0, 0.0, 0.0));
                    sample.angular_velocity = Some(Vec3::new(0.0, 0.0, 1.0));
                    sample
                })
                .collect(),
        );
        let analyzer = SessionAnalyzer::new(&Config::default()).unwrap();

        let analysis = analyzer.analyze(&head_recording(), Some(&velocity)).unwrap();

        // Constant speed: intervals exist but none has an estimate
        let series = analysis.heart_rate.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.valid().count(), 0);
    }

    #[test]
    fn test_invalid_configuration() {
        let mut config = Config::default();
        config.heart_rate.high_cut = 100.0;
        assert!(matches!(SessionAnalyzer::new(&config), Err(AnalyzerError::Filter(_))));

        let mut config = Config::default();
        config.gesture.overlap_secs = 0.5;
        assert!(matches!(SessionAnalyzer::new(&config), Err(AnalyzerError::Window(_))));
    }
}
