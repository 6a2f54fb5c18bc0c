//! Shared spectral machinery for the physiological estimators.
//!
//! The pipeline is: z-score the signal, run a digital Butterworth bandpass
//! forward and backward (zero phase), take the FFT, and pick the strongest
//! bin inside the passband.
//!
//! Filter design and forward-backward filtering come from `sci-rs`; the
//! filter is held as cascaded second-order sections.

use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use sci_rs::signal::filter::design::{butter_dyn, DigitalFilter, FilterBandType, FilterOutputType, Sos};
use sci_rs::signal::filter::sosfiltfilt_dyn;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::f64::consts::PI;
use thiserror::Error;

/// Errors raised when a filter cannot be designed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterDesignError {
    #[error("filter order must be at least 1")]
    InvalidOrder,

    #[error("passband {low_cut}-{high_cut} Hz is not inside (0, {nyquist}) Hz")]
    InvalidBand {
        low_cut: f64,
        high_cut: f64,
        nyquist: f64,
    },

    #[error("filter design did not yield second-order sections")]
    NotSecondOrder,
}

/// Passband and filter parameters for one estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    /// Samples per second assumed for the signal
    pub sampling_rate: f64,
    /// Lower passband edge in Hz
    pub low_cut: f64,
    /// Upper passband edge in Hz
    pub high_cut: f64,
    /// Butterworth order
    pub order: usize,
}

/// Subtract the mean and divide by the population standard deviation.
///
/// Returns `None` (leaving the signal untouched) when the signal is empty or
/// its standard deviation is zero up to rounding.
pub fn normalize(signal: &mut [f64]) -> Option<()> {
    if signal.is_empty() {
        return None;
    }

    let mean = signal.iter().mean();
    let std = signal.iter().population_std_dev();
    if !std.is_finite() || std <= f64::EPSILON * (1.0 + mean.abs()) {
        return None;
    }

    for value in signal.iter_mut() {
        *value = (*value - mean) / std;
    }
    Some(())
}

/// Digital Butterworth bandpass filter as cascaded second-order sections.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    sections: Vec<Sos<f64>>,
}

impl BandpassFilter {
    /// Design a bandpass of the given order with edges in Hz.
    ///
    /// The resulting filter has `2 * order` poles in `order` sections.
    pub fn design(
        order: usize,
        low_cut: f64,
        high_cut: f64,
        sampling_rate: f64,
    ) -> Result<Self, FilterDesignError> {
        if order == 0 {
            return Err(FilterDesignError::InvalidOrder);
        }
        // butter_dyn panics on an unrealisable band, so reject it here
        let nyquist = 0.5 * sampling_rate;
        let valid = nyquist.is_finite() && low_cut > 0.0 && low_cut < high_cut && high_cut < nyquist;
        if !valid {
            return Err(FilterDesignError::InvalidBand {
                low_cut,
                high_cut,
                nyquist,
            });
        }

        let design = butter_dyn(
            order,
            vec![low_cut, high_cut],
            Some(FilterBandType::Bandpass),
            Some(false),
            Some(FilterOutputType::Sos),
            Some(sampling_rate),
        );
        match design {
            DigitalFilter::Sos(filter) => Ok(Self { sections: filter.sos }),
            _ => Err(FilterDesignError::NotSecondOrder),
        }
    }

    /// Second-order sections, first applied first.
    pub fn sections(&self) -> &[Sos<f64>] {
        &self.sections
    }

    /// Samples reflected onto each end before zero-phase filtering.
    ///
    /// Three times the tap count of the equivalent transfer function, less
    /// the taps of sections that are only first order.
    pub fn edge_padding(&self) -> usize {
        let first_order = |coeffs: &[f64; 3]| coeffs[2] == 0.0;
        let b_short = self.sections.iter().filter(|s| first_order(&s.b)).count();
        let a_short = self.sections.iter().filter(|s| first_order(&s.a)).count();
        3 * (2 * self.sections.len() + 1 - b_short.min(a_short))
    }

    /// Magnitude response at a frequency in Hz.
    pub fn gain_at(&self, frequency: f64, sampling_rate: f64) -> f64 {
        let omega = 2.0 * PI * frequency / sampling_rate;
        let eval = |coeffs: &[f64; 3]| -> Complex64 {
            coeffs
                .iter()
                .enumerate()
                .map(|(k, &c)| Complex64::from_polar(c, -omega * k as f64))
                .sum()
        };
        self.sections
            .iter()
            .map(|s| (eval(&s.b) / eval(&s.a)).norm())
            .product()
    }

    /// Zero-phase filtering: forward pass, then a backward pass over the result.
    ///
    /// Both ends are extended by odd reflection and each pass starts from the
    /// filter's steady state. Returns `None` when the signal is not longer
    /// than [`edge_padding`](Self::edge_padding).
    pub fn filtfilt(&self, signal: &[f64]) -> Option<Vec<f64>> {
        if signal.len() <= self.edge_padding() {
            return None;
        }
        Some(sosfiltfilt_dyn(signal.iter(), &self.sections))
    }
}

/// Two-sided FFT magnitude spectrum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    /// Bin frequencies in Hz, in FFT order (non-negative first, then negative)
    pub frequencies: Vec<f64>,
    /// Absolute value of each bin
    pub magnitudes: Vec<f64>,
}

impl Spectrum {
    /// Compute the spectrum of a real signal sampled at `sampling_rate`.
    pub fn of(signal: &[f64], sampling_rate: f64) -> Self {
        let n = signal.len();
        if n == 0 {
            return Self::default();
        }

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n);
        let mut buffer: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();
        fft.process(&mut buffer);

        Self {
            frequencies: fft_frequencies(n, sampling_rate),
            magnitudes: buffer.iter().map(|c| c.norm()).collect(),
        }
    }

    /// Largest magnitude across all bins.
    pub fn peak_magnitude(&self) -> f64 {
        self.magnitudes.iter().copied().fold(0.0, f64::max)
    }

    /// Frequency of the strongest bin whose frequency lies in
    /// `[low, high]`; the first such bin wins ties.
    pub fn dominant_in(&self, low: f64, high: f64) -> Option<f64> {
        let mut best: Option<(f64, f64)> = None;
        for (&freq, &mag) in self.frequencies.iter().zip(&self.magnitudes) {
            if freq < low || freq > high {
                continue;
            }
            if best.map_or(true, |(_, top)| mag > top) {
                best = Some((freq, mag));
            }
        }
        best.map(|(freq, _)| freq.abs())
    }
}

/// Bin centre frequencies of an `n`-point FFT, non-negative bins first.
pub fn fft_frequencies(n: usize, sampling_rate: f64) -> Vec<f64> {
    let resolution = sampling_rate / n as f64;
    let positive = (n - 1) / 2 + 1;
    (0..n)
        .map(|i| {
            if i < positive {
                i as f64 * resolution
            } else {
                (i as f64 - n as f64) * resolution
            }
        })
        .collect()
}

/// Normalize, bandpass and locate the dominant frequency of one signal.
#[derive(Debug, Clone)]
pub struct SpectralEstimator {
    band: BandConfig,
    filter: BandpassFilter,
}

impl SpectralEstimator {
    pub fn new(band: BandConfig) -> Result<Self, FilterDesignError> {
        let filter = BandpassFilter::design(band.order, band.low_cut, band.high_cut, band.sampling_rate)?;
        Ok(Self { band, filter })
    }

    pub fn band(&self) -> BandConfig {
        self.band
    }

    pub fn filter(&self) -> &BandpassFilter {
        &self.filter
    }

    /// Dominant frequency in Hz within the passband.
    ///
    /// Returns `None` for a constant signal, a signal too short to filter, or
    /// when no FFT bin falls inside the passband.
    pub fn dominant_frequency(&self, signal: &[f64]) -> Option<f64> {
        let mut normalized = signal.to_vec();
        normalize(&mut normalized)?;
        let filtered = self.filter.filtfilt(&normalized)?;
        Spectrum::of(&filtered, self.band.sampling_rate).dominant_in(self.band.low_cut, self.band.high_cut)
    }
}

/// One-shot form of [`SpectralEstimator::dominant_frequency`].
///
/// An unrealisable passband also yields `None`.
pub fn dominant_frequency(
    signal: &[f64],
    sampling_rate: f64,
    low_cut: f64,
    high_cut: f64,
    order: usize,
) -> Option<f64> {
    let band = BandConfig {
        sampling_rate,
        low_cut,
        high_cut,
        order,
    };
    SpectralEstimator::new(band).ok()?.dominant_frequency(signal)
}
