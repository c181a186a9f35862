//! Classifier capability
//!
//! The predictor depends only on "probability of the positive class for each
//! row of a fixed-width matrix". Concrete learners sit behind `Classifier`.

use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::forest::{ForestConfig, RandomForest};
use super::logistic::{LogisticConfig, LogisticRegression};
use crate::logic::error::{RiskError, RiskResult};

/// A fitted binary classifier emitting positive-class probabilities
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Human-readable learner name
    fn name(&self) -> &'static str;

    /// Fit on `x` (rows x features) with one label per row.
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[bool]) -> RiskResult<()>;

    /// P(positive) per row, each in [0, 1]
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> RiskResult<Vec<f64>>;

    /// Width of the matrix the learner was fitted on, `None` before `fit`
    fn n_features(&self) -> Option<usize>;
}

// ============================================================================
// MODEL KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    RandomForest,
    Logistic,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::Logistic => "logistic",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "random_forest" | "randomforest" | "rf" => Ok(ModelKind::RandomForest),
            "logistic" | "logistic_regression" | "lr" => Ok(ModelKind::Logistic),
            other => Err(RiskError::UnsupportedModel(other.to_string())),
        }
    }
}

// ============================================================================
// MODEL CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub kind: ModelKind,
    /// Share of the latest rows held out for evaluation
    pub test_fraction: f64,
    pub forest: ForestConfig,
    pub logistic: LogisticConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::default(),
            test_fraction: crate::constants::DEFAULT_TEST_FRACTION,
            forest: ForestConfig::default(),
            logistic: LogisticConfig::default(),
        }
    }
}

impl ModelConfig {
    /// Fresh, unfitted learner of the configured kind
    pub fn build(&self) -> Box<dyn Classifier> {
        match self.kind {
            ModelKind::RandomForest => Box::new(RandomForest::new(self.forest.clone())),
            ModelKind::Logistic => Box::new(LogisticRegression::new(self.logistic.clone())),
        }
    }
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Balanced class weights: `n / (classes_present * n_class)`, as `(negative, positive)`.
///
/// A class absent from `y` gets weight 0.
pub fn balanced_weights(y: &[bool]) -> (f64, f64) {
    let n = y.len() as f64;
    let positives = y.iter().filter(|v| **v).count() as f64;
    let negatives = n - positives;
    let present = [negatives, positives].iter().filter(|c| **c > 0.0).count() as f64;

    let weight = |count: f64| if count > 0.0 { n / (present * count) } else { 0.0 };
    (weight(negatives), weight(positives))
}

/// Common input checks for `fit`
pub(crate) fn check_fit_input(x: &ArrayView2<'_, f64>, y: &[bool]) -> RiskResult<()> {
    if x.nrows() == 0 {
        return Err(RiskError::InsufficientData("no training rows".into()));
    }
    if x.nrows() != y.len() {
        return Err(RiskError::Schema(format!(
            "{} training rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(RiskError::Schema("training matrix contains non-finite values".into()));
    }
    Ok(())
}

/// Common input checks for `predict_proba`
pub(crate) fn check_predict_input(x: &ArrayView2<'_, f64>, n_features: Option<usize>) -> RiskResult<()> {
    let expected = n_features.ok_or(RiskError::ModelNotTrained)?;
    if x.ncols() != expected {
        return Err(RiskError::Schema(format!(
            "expected {} feature columns, got {}",
            expected,
            x.ncols()
        )));
    }
    if let Some((row, _)) = x
        .outer_iter()
        .enumerate()
        .find(|(_, r)| r.iter().any(|v| !v.is_finite()))
    {
        return Err(RiskError::Schema(format!("row {} contains non-finite values", row)));
    }
    Ok(())
}
