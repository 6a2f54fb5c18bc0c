//! Feature extraction from motion windows.
//!
//! Each tracked column contributes five summary statistics, always in the
//! order max, min, mean, sample standard deviation, median. A window that
//! cannot produce the full vector is discarded rather than padded.

use crate::core::windowing::MotionWindow;
use crate::ingest::Column;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

/// Statistics computed per tracked column.
pub const STATS_PER_COLUMN: usize = 5;

/// Names of the per-column statistics, in vector order.
pub const STAT_NAMES: [&str; STATS_PER_COLUMN] = ["max", "min", "mean", "std", "median"];

/// Ordered summary statistics for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every value is a finite number.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Reduces windows to feature vectors over a fixed column set.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    columns: Vec<Column>,
}

impl FeatureExtractor {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Length every valid vector from this extractor must have.
    pub fn expected_len(&self) -> usize {
        STATS_PER_COLUMN * self.columns.len()
    }

    /// Feature labels such as `headPosition.x_max`, in vector order.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|column| STAT_NAMES.iter().map(move |stat| format!("{column}_{stat}")))
            .collect()
    }

    /// Compute the feature vector for a window.
    pub fn extract(&self, window: &MotionWindow<'_>) -> Option<FeatureVector> {
        extract_features(window, &self.columns)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(Column::HEAD_POSE.to_vec())
    }
}

/// Compute the feature vector of a window over the given columns.
///
/// Returns `None` when the window is empty, when a column has no value in
/// any of its samples, or when the result does not have exactly
/// [`STATS_PER_COLUMN`] values per column.
pub fn extract_features(window: &MotionWindow<'_>, columns: &[Column]) -> Option<FeatureVector> {
    if window.is_empty() || columns.is_empty() {
        return None;
    }

    let mut features = Vec::with_capacity(STATS_PER_COLUMN * columns.len());
    for column in columns {
        let present: Vec<f64> = window
            .samples()
            .iter()
            .filter_map(|sample| column.value(sample))
            .collect();

        if present.is_empty() {
            tracing::debug!(window = window.index, %column, "Column missing from window");
            return None;
        }

        features.extend(column_summary(&present));
    }

    if features.len() != STATS_PER_COLUMN * columns.len() {
        tracing::debug!(
            window = window.index,
            len = features.len(),
            "Discarding window with unexpected feature count"
        );
        return None;
    }

    Some(FeatureVector(features))
}

/// Max, min, mean, sample standard deviation and median of non-empty data.
///
/// The standard deviation of a single value is NaN, matching the n-1
/// estimator; [`FeatureMatrix::push`] refuses such vectors.
fn column_summary(values: &[f64]) -> [f64; STATS_PER_COLUMN] {
    let max = Statistics::max(values);
    let min = Statistics::min(values);
    let mean = values.mean();
    let std = values.std_dev();
    let median = Data::new(values.to_vec()).median();
    [max, min, mean, std, median]
}

/// Feature vectors of one session, all of the same width.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureMatrix {
    width: usize,
    rows: Vec<FeatureVector>,
}

impl FeatureMatrix {
    /// Create an empty matrix whose rows must have `width` values.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            rows: Vec::new(),
        }
    }

    /// Append a row. Rows of the wrong width or with a NaN or infinite
    /// value are refused, so a classifier only ever sees finite input.
    pub fn push(&mut self, row: FeatureVector) -> bool {
        if row.len() != self.width || !row.is_finite() {
            return false;
        }
        self.rows.push(row);
        true
    }

    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::windowing::segment;
    use crate::ingest::{MotionSample, MotionTable, Vec3};

    fn head_sample(t: f64, x: f64) -> MotionSample {
        let mut sample = MotionSample::at(t);
        sample.head_position = Some(Vec3::new(x, 2.0 * x, 1.0));
        sample.head_rotation = Some(Vec3::new(0.0, 10.0, -x));
        sample
    }

    fn single_window(table: &MotionTable) -> MotionWindow<'_> {
        segment(table, 10.0, 0.0).unwrap().next().unwrap()
    }

    #[test]
    fn test_column_summary_order() {
        let summary = column_summary(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(summary[0], 9.0);
        assert_eq!(summary[1], 2.0);
        assert_eq!(summary[2], 5.0);
        // Sample standard deviation: sqrt(32 / 7)
        assert!((summary[3] - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(summary[4], 4.5);
    }

    #[test]
    fn test_single_value_std_is_nan() {
        let summary = column_summary(&[3.0]);
        assert_eq!(summary[0], 3.0);
        assert!(summary[3].is_nan());
        assert_eq!(summary[4], 3.0);
    }

    #[test]
    fn test_head_pose_vector_length() {
        let table = MotionTable::from_samples(vec![
            head_sample(0.0, 1.0),
            head_sample(0.1, 2.0),
            head_sample(0.2, 3.0),
        ]);
        let extractor = FeatureExtractor::default();
        let features = extractor.extract(&single_window(&table)).unwrap();

        assert_eq!(features.len(), 30);
        assert_eq!(features.len(), extractor.expected_len());
        // headPosition.x: max, min, mean, std, median
        assert_eq!(&features.values()[0..5], &[3.0, 1.0, 2.0, 1.0, 2.0]);
        // headRotation.y is constant
        assert_eq!(&features.values()[20..25], &[10.0, 10.0, 10.0, 0.0, 10.0]);
    }

    #[test]
    fn test_missing_column_discards_window() {
        let mut partial = MotionSample::at(0.0);
        partial.head_position = Some(Vec3::new(0.0, 0.0, 0.0));
        let table = MotionTable::from_samples(vec![partial.clone(), MotionSample { timestamp: 0.1, ..partial }]);

        assert!(FeatureExtractor::default().extract(&single_window(&table)).is_none());
    }

    #[test]
    fn test_partially_missing_column_uses_present_values() {
        let mut sparse = MotionSample::at(0.1);
        sparse.head_rotation = Some(Vec3::new(0.0, 0.0, 0.0));
        let table = MotionTable::from_samples(vec![
            head_sample(0.0, 1.0),
            sparse,
            head_sample(0.2, 3.0),
        ]);

        let features = FeatureExtractor::default().extract(&single_window(&table)).unwrap();
        assert_eq!(features.values()[2], 2.0); // mean of x over the two present values
    }

    #[test]
    fn test_empty_window_discarded() {
        let table = MotionTable::from_samples(vec![head_sample(0.0, 1.0), head_sample(3.0, 1.0)]);
        let windows: Vec<_> = segment(&table, 1.0, 0.0).unwrap().collect();

        assert!(windows[1].is_empty());
        assert!(extract_features(&windows[1], &Column::HEAD_POSE).is_none());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let table = MotionTable::from_samples((0..20).map(|i| head_sample(i as f64 * 0.01, (i % 7) as f64)).collect());
        let extractor = FeatureExtractor::default();
        let window = single_window(&table);

        assert_eq!(extractor.extract(&window), extractor.extract(&window));
    }

    #[test]
    fn test_feature_names() {
        let names = FeatureExtractor::default().feature_names();
        assert_eq!(names.len(), 30);
        assert_eq!(names[0], "headPosition.x_max");
        assert_eq!(names[29], "headRotation.z_median");
    }

    #[test]
    fn test_matrix_refuses_bad_rows() {
        let mut matrix = FeatureMatrix::new(2);
        assert!(matrix.push(FeatureVector(vec![1.0, 2.0])));
        assert!(!matrix.push(FeatureVector(vec![1.0])));
        assert!(!matrix.push(FeatureVector(vec![f64::NAN, 2.0])));
        assert!(!matrix.push(FeatureVector(vec![1.0, f64::INFINITY])));

        assert_eq!(matrix.len(), 1);
        assert!(matrix.rows().iter().all(FeatureVector::is_finite));
    }
}
