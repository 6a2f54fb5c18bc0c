//! Sliding-window segmentation of a motion recording.
//!
//! Windows are fixed-length half-open intervals `[start, start + length)`
//! advanced by `step = length - overlap`, starting at the earliest sample.
//! Segmentation stops once a window would start at or after the last sample.

use crate::ingest::{MotionSample, MotionTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised for unusable window parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowError {
    #[error("invalid window configuration: length {length}s with overlap {overlap}s gives a non-positive step")]
    InvalidWindowConfig { length: f64, overlap: f64 },
}

/// Window length and overlap, both in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    length: f64,
    overlap: f64,
}

impl WindowConfig {
    /// Validate and create a window configuration.
    pub fn new(length: f64, overlap: f64) -> Result<Self, WindowError> {
        let valid = length.is_finite() && overlap.is_finite() && length > 0.0 && length - overlap > 0.0;
        if !valid {
            return Err(WindowError::InvalidWindowConfig { length, overlap });
        }
        Ok(Self { length, overlap })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn overlap(&self) -> f64 {
        self.overlap
    }

    /// Distance between consecutive window starts.
    pub fn step(&self) -> f64 {
        self.length - self.overlap
    }
}

/// A view of the samples falling inside one window.
#[derive(Debug, Clone, Copy)]
pub struct MotionWindow<'a> {
    /// Position of this window in the sequence
    pub index: usize,
    /// Inclusive start time
    pub start: f64,
    /// Exclusive end time
    pub end: f64,
    samples: &'a [MotionSample],
}

impl<'a> MotionWindow<'a> {
    /// Check if a timestamp falls within this window.
    pub fn contains(&self, timestamp: f64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Samples in timestamp order.
    pub fn samples(&self) -> &'a [MotionSample] {
        self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Get the duration of this window in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.end - self.start
    }
}

/// Produces window sequences over motion tables.
#[derive(Debug, Clone, Copy)]
pub struct WindowSegmenter {
    config: WindowConfig,
}

impl WindowSegmenter {
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> WindowConfig {
        self.config
    }

    /// Start a fresh pass over the table's windows.
    ///
    /// Each call yields the same sequence; the returned iterator can also be
    /// cloned to traverse the remaining windows more than once.
    pub fn segment<'a>(&self, table: &'a MotionTable) -> Windows<'a> {
        let span = table.time_span();
        Windows {
            table,
            config: self.config,
            origin: span.map_or(0.0, |(first, _)| first),
            last: span.map(|(_, last)| last),
            next_index: 0,
        }
    }
}

/// Segment a table with the given length and overlap.
pub fn segment(table: &MotionTable, length: f64, overlap: f64) -> Result<Windows<'_>, WindowError> {
    Ok(WindowSegmenter::new(WindowConfig::new(length, overlap)?).segment(table))
}

/// Lazy iterator over the windows of one table.
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    table: &'a MotionTable,
    config: WindowConfig,
    origin: f64,
    last: Option<f64>,
    next_index: usize,
}

impl<'a> Iterator for Windows<'a> {
    type Item = MotionWindow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let last = self.last?;

        // Starts are computed from the origin rather than accumulated so that
        // rounding error does not drift over long recordings.
        let start = self.origin + self.next_index as f64 * self.config.step();
        if start >= last {
            return None;
        }

        // Touching or overlapping windows never leave a rounding gap; with a
        // negative overlap the gap is intended and the end stays put.
        let mut end = start + self.config.length();
        if self.config.overlap() >= 0.0 {
            let next_start = self.origin + (self.next_index + 1) as f64 * self.config.step();
            end = end.max(next_start);
        }
        let window = MotionWindow {
            index: self.next_index,
            start,
            end,
            samples: self.table.range(start, end),
        };
        self.next_index += 1;
        Some(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_at(times: &[f64]) -> MotionTable {
        MotionTable::from_samples(times.iter().map(|&t| MotionSample::at(t)).collect())
    }

    #[test]
    fn test_window_config_validation() {
        assert!(WindowConfig::new(0.1, 0.0).is_ok());
        assert!(WindowConfig::new(1.0, 0.5).is_ok());
        assert_eq!(
            WindowConfig::new(1.0, 1.0),
            Err(WindowError::InvalidWindowConfig {
                length: 1.0,
                overlap: 1.0
            })
        );
        assert!(WindowConfig::new(1.0, 2.0).is_err());
        assert!(WindowConfig::new(0.0, -1.0).is_err());
        assert!(WindowConfig::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_window_contains() {
        let table = table_at(&[0.0, 1.0]);
        let window = segment(&table, 10.0, 0.0).unwrap().next().unwrap();

        assert!(window.contains(0.0));
        assert!(window.contains(5.0));
        assert!(!window.contains(10.0));
        assert!(!window.contains(-1.0));
        assert_eq!(window.duration_secs(), 10.0);
    }

    #[test]
    fn test_empty_table_yields_nothing() {
        let table = MotionTable::default();
        assert_eq!(segment(&table, 1.0, 0.0).unwrap().count(), 0);
    }

    #[test]
    fn test_non_overlapping_windows() {
        let table = table_at(&[0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
        let windows: Vec<_> = segment(&table, 1.0, 0.0).unwrap().collect();

        let starts: Vec<f64> = windows.iter().map(|w| w.start).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.0]);
        let counts: Vec<usize> = windows.iter().map(|w| w.len()).collect();
        assert_eq!(counts, vec![2, 2, 2]);
    }

    #[test]
    fn test_overlapping_windows_share_samples() {
        let table = table_at(&[0.0, 0.5, 1.0, 1.5, 2.0]);
        let windows: Vec<_> = segment(&table, 1.0, 0.5).unwrap().collect();

        let starts: Vec<f64> = windows.iter().map(|w| w.start).collect();
        assert_eq!(starts, vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(windows[1].samples()[0].timestamp, 0.5);
        assert_eq!(windows[0].samples()[1].timestamp, 0.5);
    }

    #[test]
    fn test_negative_overlap_leaves_gaps() {
        let table = table_at(&[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
        let windows: Vec<_> = segment(&table, 1.0, -1.0).unwrap().collect();

        let bounds: Vec<(f64, f64)> = windows.iter().map(|w| (w.start, w.end)).collect();
        assert_eq!(bounds, vec![(0.0, 1.0), (2.0, 3.0)]);
        let times: Vec<Vec<f64>> = windows
            .iter()
            .map(|w| w.samples().iter().map(|s| s.timestamp).collect())
            .collect();
        assert_eq!(times, vec![vec![0.0, 0.5], vec![2.0, 2.5]]);
    }

    #[test]
    fn test_last_sample_is_covered() {
        let table = table_at(&[0.0, 0.25, 0.95]);
        let windows: Vec<_> = segment(&table, 0.3, 0.0).unwrap().collect();

        assert!(windows.iter().any(|w| w.contains(0.95)));
        assert!(windows.last().unwrap().start < 0.95);
    }

    #[test]
    fn test_sample_on_final_start_is_not_windowed() {
        let table = table_at(&[0.0, 0.5, 1.0]);
        let windows: Vec<_> = segment(&table, 1.0, 0.0).unwrap().collect();

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].len(), 2);
    }

    #[test]
    fn test_consecutive_windows_leave_no_gap() {
        let times: Vec<f64> = (0..100).map(|i| i as f64 / 30.0).collect();
        let table = table_at(&times);
        let windows: Vec<_> = segment(&table, 0.1, 0.0).unwrap().collect();

        for pair in windows.windows(2) {
            assert!(pair[0].end >= pair[1].start);
        }
        let covered: usize = windows.iter().map(|w| w.len()).sum();
        assert!(covered >= times.len() - 1);
    }

    #[test]
    fn test_windows_keep_empty_gaps() {
        let table = table_at(&[0.0, 3.5]);
        let windows: Vec<_> = segment(&table, 1.0, 0.0).unwrap().collect();

        assert_eq!(windows.len(), 4);
        assert!(windows[1].is_empty());
        assert!(windows[2].is_empty());
    }

    #[test]
    fn test_segmentation_is_restartable() {
        let table = table_at(&[0.0, 0.1, 0.2, 0.3, 0.4, 0.5]);
        let segmenter = WindowSegmenter::new(WindowConfig::new(0.2, 0.1).unwrap());

        let first: Vec<(usize, f64)> = segmenter.segment(&table).map(|w| (w.index, w.start)).collect();
        let second: Vec<(usize, f64)> = segmenter.segment(&table).map(|w| (w.index, w.start)).collect();
        assert_eq!(first, second);

        let mut iter = segmenter.segment(&table);
        iter.next();
        let fork = iter.clone();
        assert_eq!(iter.count(), fork.count());
    }
}
