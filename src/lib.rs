//! motion-sense - gesture, heart-rate and tremor analysis of XR motion telemetry.
//!
//! This library turns recordings of head and hand tracking into:
//! - a session-level gesture label, by classifying short windows and voting
//! - a per-second heart-rate series from headset velocity
//! - a whole-session tremor-risk flag from a tracked point's position
//!
//! Whole directories of recordings can be analysed in parallel with
//! [`batch::BatchRunner`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         motion-sense                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │   Ingest    │──▶│  Windowing  │──▶│  Features   │──▶ Vote │
//! │  │ (JSON/CSV)  │   │ (0.1s bins) │   │ (5 stats)   │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │         │                                                    │
//! │         ▼                                                    │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │  Spectral   │──▶│ Heart rate  │   │   Tremor    │         │
//! │  │ (bandpass)  │──▶│ (per sec)   │   │ (session)   │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use motion_sense::core::{GestureConfig, GesturePipeline, NearestCentroid};
//! use motion_sense::ingest::MotionTable;
//! use std::path::Path;
//!
//! let json = std::fs::read_to_string("recording.json").unwrap();
//! let table = MotionTable::from_json_str(&json).unwrap();
//! let model = NearestCentroid::from_path(Path::new("centroids.json")).unwrap();
//!
//! let pipeline = GesturePipeline::new(&GestureConfig::default()).unwrap();
//! let result = pipeline.run(&table, &model).unwrap();
//! println!("{:?}", result.predicted);
//! ```

pub mod batch;
pub mod config;
pub mod core;
pub mod ingest;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use batch::{BatchRunner, BatchSummary};
pub use core::{
    ClassificationResult, Classifier, GesturePipeline, HeartRateEstimator, ReportBuilder, SessionAnalyzer,
    SessionReport, TremorDetector,
};
pub use ingest::{IngestError, MotionSample, MotionTable};
pub use stats::{ProcessingStats, SharedStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
