//! Tremor screening from a positional trace.
//!
//! The three axes of a tracked point are collapsed into one signal (the sum
//! of each axis' deviation from its session mean), bandpassed over the whole
//! session and inspected in the frequency domain. The trace is flagged when
//! any strong spectral component falls inside the risk band.

use crate::core::spectral::{BandpassFilter, FilterDesignError, Spectrum};
use crate::ingest::{MotionTable, TrackedPoint, Vec3};
use serde::{Deserialize, Serialize};

/// Tremor band and decision thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TremorConfig {
    /// Nominal tracking rate in Hz
    pub sampling_rate: f64,
    pub low_cut: f64,
    pub high_cut: f64,
    pub filter_order: usize,
    /// Fraction of the spectral peak a bin must exceed to count
    pub peak_ratio: f64,
    /// Frequencies in `[risk_low, risk_high]` Hz indicate risk
    pub risk_low: f64,
    pub risk_high: f64,
    /// Minimum RMS of the filtered trace relative to the unfiltered one
    /// before any bin can count
    pub min_band_fraction: f64,
    /// Point whose trace is analysed
    pub source: TrackedPoint,
}

impl Default for TremorConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 100.0,
            low_cut: 4.0,
            high_cut: 8.0,
            filter_order: 5,
            peak_ratio: 0.1,
            risk_low: 4.0,
            risk_high: 7.0,
            min_band_fraction: 0.01,
            source: TrackedPoint::LeftWrist,
        }
    }
}

/// Outcome of screening one trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TremorAssessment {
    pub tremor_risk: bool,
    /// Non-negative frequencies whose magnitude passed the threshold, ascending
    pub significant_frequencies: Vec<f64>,
    /// Frequency of the strongest bin, if the filtered trace has any energy
    pub peak_frequency: Option<f64>,
    /// RMS of the filtered trace over RMS of the combined deviation
    pub band_fraction: f64,
    /// Number of positions analysed
    pub samples: usize,
}

/// Screens positional traces for tremor.
#[derive(Debug, Clone)]
pub struct TremorDetector {
    config: TremorConfig,
    filter: BandpassFilter,
}

impl TremorDetector {
    pub fn new(config: TremorConfig) -> Result<Self, FilterDesignError> {
        let filter = BandpassFilter::design(
            config.filter_order,
            config.low_cut,
            config.high_cut,
            config.sampling_rate,
        )?;
        Ok(Self { config, filter })
    }

    pub fn config(&self) -> TremorConfig {
        self.config
    }

    /// Screen the configured source point of a recording.
    ///
    /// Samples that did not report the point are skipped.
    pub fn detect(&self, table: &MotionTable) -> Option<TremorAssessment> {
        let positions: Vec<Vec3> = table
            .samples()
            .iter()
            .filter_map(|s| s.position_of(self.config.source))
            .collect();
        tracing::debug!(
            source = ?self.config.source,
            positions = positions.len(),
            samples = table.len(),
            "Collected tremor trace"
        );
        self.detect_trace(&positions)
    }

    /// Screen a trace of positions sampled at the configured rate.
    ///
    /// Returns `None` when the trace is too short to filter.
    pub fn detect_trace(&self, positions: &[Vec3]) -> Option<TremorAssessment> {
        let signal = combined_deviation(positions);
        let filtered = self.filter.filtfilt(&signal)?;

        let band_fraction = match rms(&signal) {
            total if total > 0.0 => rms(&filtered) / total,
            _ => 0.0,
        };

        let spectrum = Spectrum::of(&filtered, self.config.sampling_rate);
        let peak = spectrum.peak_magnitude();

        let mut significant: Vec<f64> = Vec::new();
        let mut peak_frequency = None;
        if peak > 0.0 && band_fraction >= self.config.min_band_fraction {
            let threshold = self.config.peak_ratio * peak;
            for (&freq, &mag) in spectrum.frequencies.iter().zip(&spectrum.magnitudes) {
                if mag == peak && peak_frequency.is_none() {
                    peak_frequency = Some(freq.abs());
                }
                if mag > threshold && freq >= 0.0 {
                    significant.push(freq);
                }
            }
        }
        significant.sort_by(f64::total_cmp);

        let tremor_risk = significant
            .iter()
            .any(|&f| f >= self.config.risk_low && f <= self.config.risk_high);

        tracing::info!(
            tremor_risk,
            peak_hz = ?peak_frequency,
            band_fraction,
            significant = significant.len(),
            "Tremor screening finished"
        );

        Some(TremorAssessment {
            tremor_risk,
            significant_frequencies: significant,
            peak_frequency,
            band_fraction,
            samples: positions.len(),
        })
    }
}

/// Sum over axes of each coordinate's deviation from that axis' mean.
///
/// The sum is signed: opposite-phase motion on two axes cancels.
pub fn combined_deviation(positions: &[Vec3]) -> Vec<f64> {
    if positions.is_empty() {
        return Vec::new();
    }
    let n = positions.len() as f64;
    let sum = positions.iter().fold(Vec3::new(0.0, 0.0, 0.0), |acc, p| {
        Vec3::new(acc.x + p.x, acc.y + p.y, acc.z + p.z)
    });
    let mean = Vec3::new(sum.x / n, sum.y / n, sum.z / n);
    positions
        .iter()
        .map(|p| (p.x - mean.x) + (p.y - mean.y) + (p.z - mean.z))
        .collect()
}

fn rms(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|v| v * v).sum::<f64>() / signal.len() as f64).sqrt()
}
