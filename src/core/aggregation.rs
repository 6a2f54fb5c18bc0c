//! Session-level aggregation of per-window predictions.
//!
//! The session label is the most frequent window label. Agreement metrics
//! compare every window prediction against the session's ground truth
//! repeated once per window, so the truth side always holds a single class.

use serde::{Deserialize, Serialize};

/// Outcome of classifying one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Majority label, `None` when no window could be classified
    pub predicted: Option<String>,
    /// Ground-truth label (the session id)
    pub actual: Option<String>,
    pub balanced_accuracy: Option<f64>,
    pub weighted_f1_score: Option<f64>,
    /// Number of windows that were classified
    pub windows_classified: usize,
}

impl ClassificationResult {
    /// Whether the session produced no usable windows at all.
    pub fn has_no_usable_windows(&self) -> bool {
        self.windows_classified == 0
    }
}

/// Combine per-window predictions into a session result.
pub fn aggregate(predictions: &[String], ground_truth: Option<&str>) -> ClassificationResult {
    let predicted = majority_vote(predictions).cloned();

    let (balanced_accuracy, weighted_f1_score) = match ground_truth {
        Some(truth) if !predictions.is_empty() => {
            let y_true = vec![truth.to_string(); predictions.len()];
            (
                Some(balanced_accuracy(&y_true, predictions)),
                Some(weighted_f1(&y_true, predictions)),
            )
        }
        _ => (None, None),
    };

    ClassificationResult {
        predicted,
        actual: ground_truth.map(str::to_string),
        balanced_accuracy,
        weighted_f1_score,
        windows_classified: predictions.len(),
    }
}

/// Most frequent label; ties go to the label seen first.
pub fn majority_vote<L: PartialEq>(labels: &[L]) -> Option<&L> {
    let mut tally: Vec<(&L, usize)> = Vec::new();
    for label in labels {
        match tally.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => tally.push((label, 1)),
        }
    }

    let mut best: Option<(&L, usize)> = None;
    for (label, count) in tally {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}

/// Distinct labels in first-seen order across both slices.
fn label_set<'a, L: PartialEq>(a: &'a [L], b: &'a [L]) -> Vec<&'a L> {
    let mut labels: Vec<&L> = Vec::new();
    for label in a.iter().chain(b) {
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// Mean per-class recall over the classes present in `y_true`.
///
/// Labels that only appear in `y_pred` have no recall and do not count.
pub fn balanced_accuracy<L: PartialEq>(y_true: &[L], y_pred: &[L]) -> f64 {
    let classes = label_set(y_true, &[]);
    if classes.is_empty() {
        return 0.0;
    }

    let recall_sum: f64 = classes
        .iter()
        .map(|class| {
            let support = y_true.iter().filter(|t| t == class).count();
            let hits = y_true
                .iter()
                .zip(y_pred)
                .filter(|(t, p)| t == class && p == class)
                .count();
            hits as f64 / support as f64
        })
        .sum();

    recall_sum / classes.len() as f64
}

/// Support-weighted mean of per-class F1 scores.
///
/// Precision of a class that was never predicted counts as zero.
pub fn weighted_f1<L: PartialEq>(y_true: &[L], y_pred: &[L]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }

    let weighted: f64 = label_set(y_true, y_pred)
        .into_iter()
        .map(|class| {
            let support = y_true.iter().filter(|t| *t == class).count();
            let predicted = y_pred.iter().filter(|p| *p == class).count();
            let hits = y_true
                .iter()
                .zip(y_pred)
                .filter(|(t, p)| *t == class && *p == class)
                .count();

            let precision = if predicted == 0 { 0.0 } else { hits as f64 / predicted as f64 };
            let recall = if support == 0 { 0.0 } else { hits as f64 / support as f64 };
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            f1 * support as f64
        })
        .sum();

    weighted / y_true.len() as f64
}
