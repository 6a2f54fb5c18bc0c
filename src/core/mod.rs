//! Core analysis for motion-sense.
//!
//! This module contains:
//! - Sliding-window segmentation and per-window feature vectors
//! - Classifier boundary and session-level label aggregation
//! - Bandpass/FFT machinery and the heart-rate and tremor estimators
//! - Whole-session analysis and report building for export

pub mod aggregation;
pub mod classifier;
pub mod features;
pub mod heart_rate;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod spectral;
pub mod tremor;
pub mod windowing;

// Re-export commonly used types
pub use aggregation::{aggregate, balanced_accuracy, majority_vote, weighted_f1, ClassificationResult};
pub use classifier::{Centroid, Classifier, ClassifierError, NearestCentroid};
pub use features::{extract_features, FeatureExtractor, FeatureMatrix, FeatureVector, STATS_PER_COLUMN};
pub use heart_rate::{HeartRateConfig, HeartRateEstimate, HeartRateEstimator, HeartRateSeries};
pub use pipeline::{GestureConfig, GesturePipeline, PipelineError};
pub use report::{ReportBuilder, SessionReport, PRODUCER_NAME, REPORT_VERSION};
pub use session::{AnalyzerError, SessionAnalysis, SessionAnalyzer, SharedClassifier};
pub use spectral::{
    dominant_frequency, BandConfig, BandpassFilter, FilterDesignError, SpectralEstimator, Spectrum,
};
pub use tremor::{TremorAssessment, TremorConfig, TremorDetector};
pub use windowing::{segment, MotionWindow, WindowConfig, WindowError, WindowSegmenter, Windows};
