//! Heart-rate estimation from headset velocity.
//!
//! Ballistic motion of the head carries a faint cardiac component. The
//! recording is cut into consecutive one-second intervals; within each, the
//! linear and angular speed are summed into one signal whose dominant
//! frequency in the cardiac band becomes beats per minute.

use crate::core::spectral::{BandConfig, FilterDesignError, SpectralEstimator};
use crate::ingest::{MotionSample, MotionTable};
use serde::{Deserialize, Serialize};

/// Length of one estimation interval in seconds.
pub const INTERVAL_SECS: f64 = 1.0;

/// Parameters of the cardiac band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartRateConfig {
    /// Nominal headset sampling rate in Hz
    pub sampling_rate: f64,
    /// Lower band edge in Hz (45 bpm)
    pub low_cut: f64,
    /// Upper band edge in Hz (96 bpm)
    pub high_cut: f64,
    pub filter_order: usize,
}

impl Default for HeartRateConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 37.7,
            low_cut: 0.75,
            high_cut: 1.6,
            filter_order: 2,
        }
    }
}

impl HeartRateConfig {
    fn band(&self) -> BandConfig {
        BandConfig {
            sampling_rate: self.sampling_rate,
            low_cut: self.low_cut,
            high_cut: self.high_cut,
            order: self.filter_order,
        }
    }
}

/// Estimate for one interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateEstimate {
    /// Zero-based interval number
    pub second: usize,
    /// Interval start, seconds since the epoch
    pub start: f64,
    /// Beats per minute, `None` when the interval gave no estimate
    pub bpm: Option<f64>,
}

/// Per-interval estimates of one recording.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSeries {
    pub estimates: Vec<HeartRateEstimate>,
}

impl HeartRateSeries {
    pub fn len(&self) -> usize {
        self.estimates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    /// Intervals that produced a value.
    pub fn valid(&self) -> impl Iterator<Item = f64> + '_ {
        self.estimates.iter().filter_map(|e| e.bpm)
    }

    /// Mean over the intervals that produced a value.
    pub fn mean_bpm(&self) -> Option<f64> {
        let (sum, count) = self.valid().fold((0.0, 0usize), |(s, c), bpm| (s + bpm, c + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

/// Estimates heart rate once per second of recording.
#[derive(Debug, Clone)]
pub struct HeartRateEstimator {
    config: HeartRateConfig,
    spectral: SpectralEstimator,
}

impl HeartRateEstimator {
    pub fn new(config: HeartRateConfig) -> Result<Self, FilterDesignError> {
        let spectral = SpectralEstimator::new(config.band())?;
        Ok(Self { config, spectral })
    }

    pub fn config(&self) -> HeartRateConfig {
        self.config
    }

    /// Walk the recording in one-second steps from its first sample.
    ///
    /// Only intervals that end at or before the last sample are estimated,
    /// so a trailing partial second is dropped.
    pub fn estimate(&self, table: &MotionTable) -> HeartRateSeries {
        let Some((first, last)) = table.time_span() else {
            return HeartRateSeries::default();
        };

        let mut estimates = Vec::new();
        let mut second = 0usize;
        loop {
            let start = first + second as f64 * INTERVAL_SECS;
            let end = start + INTERVAL_SECS;
            if end > last {
                break;
            }

            let bpm = self.estimate_interval(table.range(start, end));
            if bpm.is_none() {
                tracing::debug!(second, "No heart rate for interval");
            }
            estimates.push(HeartRateEstimate { second, start, bpm });
            second += 1;
        }

        let series = HeartRateSeries { estimates };
        tracing::info!(
            intervals = series.len(),
            valid = series.valid().count(),
            mean_bpm = ?series.mean_bpm(),
            "Heart rate estimated"
        );
        series
    }

    /// Beats per minute for the samples of one interval.
    pub fn estimate_interval(&self, samples: &[MotionSample]) -> Option<f64> {
        let signal = combined_speed(samples);
        if signal.is_empty() {
            return None;
        }
        self.spectral.dominant_frequency(&signal).map(|hz| hz * 60.0)
    }
}

/// Linear plus angular speed for every sample that carries both velocities.
fn combined_speed(samples: &[MotionSample]) -> Vec<f64> {
    samples
        .iter()
        .filter_map(|s| match (s.linear_velocity, s.angular_velocity) {
            (Some(lin), Some(ang)) => Some(lin.magnitude() + ang.magnitude()),
            _ => None,
        })
        .collect()
}
