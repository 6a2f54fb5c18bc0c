//! Session report builder.
//!
//! A report bundles whatever analyses were run on one recording, together
//! with producer metadata, into a single JSON document.

use crate::core::aggregation::ClassificationResult;
use crate::core::heart_rate::HeartRateSeries;
use crate::core::session::SessionAnalysis;
use crate::core::tremor::TremorAssessment;
use crate::ingest::{MotionSchema, MotionTable};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

/// The current report format version.
pub const REPORT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "motion-sense";

/// Software that produced a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    /// Unique per-process identifier (UUID)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Machine the analysis ran on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// What was analysed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<MotionSchema>,
    pub samples: usize,
    /// First sample time (RFC3339), when the clock maps onto a date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub duration_secs: f64,
}

/// Heart-rate series plus its mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartRateSection {
    pub mean_bpm: Option<f64>,
    pub seconds_estimated: usize,
    pub seconds_absent: usize,
    #[serde(flatten)]
    pub series: HeartRateSeries,
}

/// Results of every analysis run on one recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub report_version: String,
    /// When this report was computed (RFC3339)
    pub computed_at_utc: String,
    pub producer: Producer,
    pub recording: RecordingInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gesture: Option<ClassificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<HeartRateSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tremor: Option<TremorAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, serde_json::Value>>,
}

/// Builder for session reports.
pub struct ReportBuilder {
    instance_id: Uuid,
    gesture: Option<ClassificationResult>,
    heart_rate: Option<HeartRateSeries>,
    tremor: Option<TremorAssessment>,
    meta: HashMap<String, serde_json::Value>,
}

impl ReportBuilder {
    /// Create a new builder with a unique instance ID.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            gesture: None,
            heart_rate: None,
            tremor: None,
            meta: HashMap::new(),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Reuse an existing instance ID, so that every report of one run shares it.
    pub fn with_instance_id(mut self, instance_id: Uuid) -> Self {
        self.instance_id = instance_id;
        self
    }

    pub fn with_gesture(mut self, result: ClassificationResult) -> Self {
        self.gesture = Some(result);
        self
    }

    pub fn with_heart_rate(mut self, series: HeartRateSeries) -> Self {
        self.heart_rate = Some(series);
        self
    }

    pub fn with_tremor(mut self, assessment: TremorAssessment) -> Self {
        self.tremor = Some(assessment);
        self
    }

    /// Attach every section present in an analysis.
    pub fn with_analysis(mut self, analysis: SessionAnalysis) -> Self {
        self.gesture = analysis.gesture;
        self.heart_rate = analysis.heart_rate;
        self.tremor = analysis.tremor;
        self
    }

    /// Attach an extra metadata entry.
    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    /// Build a report for the given recording.
    pub fn build(&self, table: &MotionTable) -> SessionReport {
        let span = table.time_span();

        let recording = RecordingInfo {
            session_id: table.session_id().map(str::to_string),
            schema: table.schema(),
            samples: table.len(),
            start: span.and_then(|(first, _)| rfc3339(first)),
            end: span.and_then(|(_, last)| rfc3339(last)),
            duration_secs: span.map_or(0.0, |(first, last)| last - first),
        };

        let heart_rate = self.heart_rate.clone().map(|series| {
            let estimated = series.valid().count();
            HeartRateSection {
                mean_bpm: series.mean_bpm(),
                seconds_estimated: estimated,
                seconds_absent: series.len() - estimated,
                series,
            }
        });

        SessionReport {
            report_version: REPORT_VERSION.to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instance_id: Some(self.instance_id.to_string()),
                host: host_name(),
            },
            recording,
            gesture: self.gesture.clone(),
            heart_rate,
            tremor: self.tremor.clone(),
            meta: (!self.meta.is_empty()).then(|| self.meta.clone()),
        }
    }

    /// Build and serialize a report to pretty JSON.
    pub fn build_json(&self, table: &MotionTable) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.build(table))
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionReport {
    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// File name for this report inside an export directory.
    pub fn file_name(&self) -> String {
        let session = self
            .recording
            .session_id
            .as_deref()
            .map(|s| s.replace(|c: char| !c.is_ascii_alphanumeric() && c != '-', "_"))
            .unwrap_or_else(|| "session".to_string());
        format!("{}_{}.json", session, Utc::now().format("%Y%m%d_%H%M%S"))
    }
}

fn host_name() -> Option<String> {
    hostname::get().ok().map(|h| h.to_string_lossy().to_string())
}

/// Seconds since the epoch as RFC3339.
fn rfc3339(secs: f64) -> Option<String> {
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    let time: DateTime<Utc> = Utc.timestamp_opt(whole as i64, nanos).single()?;
    Some(time.to_rfc3339())
}
