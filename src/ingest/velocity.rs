//! Velocity logs for heart-rate estimation.
//!
//! The headset logger writes one CSV row per frame with a custom timestamp
//! (`YYYY-MM-DD_HH-MM-SS-ffffff`, sometimes with more than six fractional
//! digits) and six velocity columns.

use crate::ingest::motion::MotionTable;
use crate::ingest::types::{MotionSample, Vec3};
use crate::ingest::IngestError;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::io::Read;

/// One row of a velocity log.
#[derive(Debug, Clone, Deserialize)]
pub struct VelocityRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "LinVelX")]
    pub lin_vel_x: f64,
    #[serde(rename = "LinVelY")]
    pub lin_vel_y: f64,
    #[serde(rename = "LinVelZ")]
    pub lin_vel_z: f64,
    #[serde(rename = "AngVelX")]
    pub ang_vel_x: f64,
    #[serde(rename = "AngVelY")]
    pub ang_vel_y: f64,
    #[serde(rename = "AngVelZ")]
    pub ang_vel_z: f64,
}

impl VelocityRecord {
    /// Convert to a canonical sample carrying only velocities.
    pub fn into_sample(self) -> Result<MotionSample, IngestError> {
        let mut sample = MotionSample::at(parse_custom_timestamp(&self.timestamp)?);
        sample.linear_velocity = Some(Vec3::new(self.lin_vel_x, self.lin_vel_y, self.lin_vel_z));
        sample.angular_velocity = Some(Vec3::new(self.ang_vel_x, self.ang_vel_y, self.ang_vel_z));
        Ok(sample)
    }
}

/// Maximum number of fractional digits kept from a timestamp.
const FRACTION_DIGITS: usize = 6;

/// Parse a `YYYY-MM-DD_HH-MM-SS-ffffff` timestamp into seconds since the epoch.
///
/// The fractional part is truncated to microseconds; shorter fractions are
/// read as leading digits (`-5` is half a second). Times are taken as UTC.
pub fn parse_custom_timestamp(value: &str) -> Result<f64, IngestError> {
    let invalid = |reason: &str| IngestError::InvalidTimestamp {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let (main, fraction) = value
        .trim()
        .rsplit_once('-')
        .ok_or_else(|| invalid("missing fractional seconds"))?;

    let digits: String = fraction.chars().take(FRACTION_DIGITS).collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("fractional seconds must be digits"));
    }
    let micros: u32 = format!("{digits:0<width$}", width = FRACTION_DIGITS)
        .parse()
        .map_err(|_| invalid("fractional seconds out of range"))?;

    let datetime = NaiveDateTime::parse_from_str(main, "%Y-%m-%d_%H-%M-%S")
        .map_err(|e| invalid(&e.to_string()))?;

    Ok(datetime.and_utc().timestamp() as f64 + f64::from(micros) / 1_000_000.0)
}

/// Read a velocity CSV into a motion table.
pub fn read_velocity_csv<R: Read>(reader: R) -> Result<MotionTable, IngestError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut samples = Vec::new();

    for row in csv_reader.deserialize::<VelocityRecord>() {
        samples.push(row?.into_sample()?);
    }

    tracing::debug!(rows = samples.len(), "Read velocity log");
    Ok(MotionTable::from_samples(samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_truncates_fraction() {
        let a = parse_custom_timestamp("2024-05-01_12-30-15-123456789").unwrap();
        let b = parse_custom_timestamp("2024-05-01_12-30-15-123456").unwrap();
        assert_eq!(a, b);

        let base = parse_custom_timestamp("2024-05-01_12-30-15-000000").unwrap();
        assert!((a - base - 0.123456).abs() < 1e-6);
    }

    #[test]
    fn test_parse_timestamp_short_fraction() {
        let base = parse_custom_timestamp("2024-05-01_12-30-15-0").unwrap();
        let half = parse_custom_timestamp("2024-05-01_12-30-15-5").unwrap();
        assert!((half - base - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_custom_timestamp("yesterday").is_err());
        assert!(parse_custom_timestamp("2024-05-01_12-30-15-abc").is_err());
        assert!(parse_custom_timestamp("2024-13-01_12-30-15-000001").is_err());
    }

    #[test]
    fn test_read_velocity_csv() {
        let data = "\
Timestamp,LinVelX,LinVelY,LinVelZ,AngVelX,AngVelY,AngVelZ
2024-05-01_12-30-15-500000,0.0,0.0,0.0,1.0,0.0,0.0
2024-05-01_12-30-15-000000,3.0,4.0,0.0,0.0,0.0,2.0
";
        let table = read_velocity_csv(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);

        // Rows are re-ordered by time
        let first = &table.samples()[0];
        assert_eq!(first.linear_velocity.map(|v| v.magnitude()), Some(5.0));
        assert_eq!(first.angular_velocity, Some(Vec3::new(0.0, 0.0, 2.0)));
        assert_eq!(first.session_id, None);
    }

    #[test]
    fn test_read_velocity_csv_missing_column() {
        let data = "Timestamp,LinVelX\n2024-05-01_12-30-15-500000,0.0\n";
        assert!(matches!(
            read_velocity_csv(data.as_bytes()),
            Err(IngestError::Csv(_))
        ));
    }
}
