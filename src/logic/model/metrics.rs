//! Evaluation metrics
//!
//! Per-class precision/recall/F1 at a 0.5 cut, plus ranking metrics (AUC-ROC,
//! AUC-PR) computed from the raw probabilities. Ratios with a zero
//! denominator are reported as 0.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::logic::error::{RiskError, RiskResult};

/// Probability above which a row counts as predicted positive
pub const DECISION_CUTOFF: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassMetrics {
    fn from_counts(hit: usize, predicted: usize, actual: usize) -> Self {
        let precision = ratio(hit, predicted);
        let recall = ratio(hit, actual);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            support: actual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub accuracy: f64,
    pub negative: ClassMetrics,
    pub positive: ClassMetrics,
    pub confusion: ConfusionMatrix,
    /// `None` when only one class is present
    pub roc_auc: Option<f64>,
    /// `None` when there are no positives
    pub pr_auc: Option<f64>,
}

impl EvaluationReport {
    pub fn from_scores(scores: &[f64], labels: &[bool]) -> RiskResult<Self> {
        if scores.len() != labels.len() {
            return Err(RiskError::ShapeMismatch {
                scores: scores.len(),
                outcomes: labels.len(),
            });
        }

        let mut cm = ConfusionMatrix::default();
        for (&s, &label) in scores.iter().zip(labels) {
            match (s > DECISION_CUTOFF, label) {
                (true, true) => cm.true_positive += 1,
                (true, false) => cm.false_positive += 1,
                (false, false) => cm.true_negative += 1,
                (false, true) => cm.false_negative += 1,
            }
        }

        let positive = ClassMetrics::from_counts(
            cm.true_positive,
            cm.true_positive + cm.false_positive,
            cm.true_positive + cm.false_negative,
        );
        let negative = ClassMetrics::from_counts(
            cm.true_negative,
            cm.true_negative + cm.false_negative,
            cm.true_negative + cm.false_positive,
        );

        Ok(Self {
            samples: scores.len(),
            accuracy: ratio(cm.true_positive + cm.true_negative, scores.len()),
            negative,
            positive,
            confusion: cm,
            roc_auc: roc_auc(scores, labels),
            pr_auc: pr_auc(scores, labels),
        })
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1", "support")?;
        for (name, m) in [("no_rescue", &self.negative), ("rescue", &self.positive)] {
            writeln!(
                f,
                "{:>12} {:>9.3} {:>9.3} {:>9.3} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f, "{:>12} {:>29.3} {:>9}", "accuracy", self.accuracy, self.samples)?;

        let fmt_opt = |v: Option<f64>| v.map_or("n/a".to_string(), |v| format!("{:.4}", v));
        write!(f, "AUC-ROC: {}  AUC-PR: {}", fmt_opt(self.roc_auc), fmt_opt(self.pr_auc))
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Cumulative (tp, fp) at each distinct score, highest score first
fn ranked_counts(scores: &[f64], labels: &[bool]) -> Vec<(f64, f64)> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut points = Vec::new();
    let (mut tp, mut fp) = (0.0, 0.0);
    for (k, &i) in order.iter().enumerate() {
        if labels[i] {
            tp += 1.0;
        } else {
            fp += 1.0;
        }
        let last_of_tie = order
            .get(k + 1)
            .map_or(true, |&next| scores[next] != scores[i]);
        if last_of_tie {
            points.push((tp, fp));
        }
    }
    points
}

fn trapezoid(xs: &[f64], ys: &[f64]) -> f64 {
    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum()
}

/// Area under the ROC curve; `None` unless both classes are present
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    let positives = labels.iter().filter(|l| **l).count() as f64;
    let negatives = labels.len() as f64 - positives;
    if positives == 0.0 || negatives == 0.0 {
        return None;
    }

    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    for (tp, fp) in ranked_counts(scores, labels) {
        fpr.push(fp / negatives);
        tpr.push(tp / positives);
    }
    Some(trapezoid(&fpr, &tpr))
}

/// Area under the precision-recall curve; `None` without positives.
///
/// Curve points stop at the first threshold reaching full recall and start
/// from (recall 0, precision 1).
pub fn pr_auc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    let positives = labels.iter().filter(|l| **l).count() as f64;
    if positives == 0.0 {
        return None;
    }

    let mut recall = vec![0.0];
    let mut precision = vec![1.0];
    for (tp, fp) in ranked_counts(scores, labels) {
        recall.push(tp / positives);
        precision.push(tp / (tp + fp));
        if tp >= positives {
            break;
        }
    }
    Some(trapezoid(&recall, &precision))
}
