//! Input decoding for motion telemetry.
//!
//! This module turns the raw recordings produced by headsets and hand
//! trackers into the canonical [`MotionTable`]:
//! - JSON motion recordings in either recognized schema variant
//! - CSV velocity logs used for heart-rate estimation

pub mod motion;
pub mod types;
pub mod velocity;

use std::path::Path;
use thiserror::Error;

// Re-export commonly used types
pub use motion::{Axis, Channel, Column, MotionSchema, MotionTable};
pub use types::{MotionSample, TrackedPoint, Vec3};
pub use velocity::{parse_custom_timestamp, read_velocity_csv, VelocityRecord};

/// Errors raised while decoding input recordings.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no recognized record list; expected one of: {}", .expected.join(", "))]
    SchemaNotRecognized { expected: Vec<&'static str> },

    #[error("malformed JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read a recording from disk, choosing the decoder by file extension.
///
/// `.csv` files are velocity logs; anything else is parsed as a JSON motion
/// recording.
pub fn load_recording(path: &Path) -> Result<MotionTable, IngestError> {
    let is_csv = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let table = if is_csv {
        read_velocity_csv(std::fs::File::open(path)?)?
    } else {
        MotionTable::from_json_str(&std::fs::read_to_string(path)?)?
    };

    tracing::info!(
        path = %path.display(),
        samples = table.len(),
        session = table.session_id().unwrap_or("<none>"),
        "Loaded recording"
    );
    Ok(table)
}
