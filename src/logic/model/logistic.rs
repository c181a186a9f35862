//! Logistic regression baseline
//!
//! Full-batch gradient descent on the class-weighted log loss with L2
//! regularization. Inputs are standardized with the training means and
//! deviations, which are kept for prediction.

use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::classifier::{balanced_weights, check_fit_input, check_predict_input, Classifier};
use crate::logic::error::RiskResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    pub l2: f64,
    pub balanced: bool,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            epochs: 500,
            l2: 1e-4,
            balanced: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: LogisticConfig,
    weights: Vec<f64>,
    bias: f64,
    means: Vec<f64>,
    scales: Vec<f64>,
    fitted: bool,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            bias: 0.0,
            means: Vec::new(),
            scales: Vec::new(),
            fitted: false,
        }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.weights
    }

    fn standardize(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    fn score(&self, z: &[f64]) -> f64 {
        let dot: f64 = self.weights.iter().zip(z).map(|(w, x)| w * x).sum();
        sigmoid(dot + self.bias)
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[bool]) -> RiskResult<()> {
        check_fit_input(&x, y)?;

        let n_features = x.ncols();
        let means: Array1<f64> = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_features));
        let scales: Vec<f64> = x
            .std_axis(Axis(0), 0.0)
            .iter()
            .map(|s| if *s > 1e-12 { *s } else { 1.0 })
            .collect();
        self.means = means.to_vec();
        self.scales = scales;
        self.weights = vec![0.0; n_features];
        self.bias = 0.0;

        let rows: Vec<Vec<f64>> = x.rows().into_iter().map(|r| self.standardize(&r.to_vec())).collect();

        let (w_neg, w_pos) = if self.config.balanced {
            balanced_weights(y)
        } else {
            (1.0, 1.0)
        };
        let sample_weight: Vec<f64> = y.iter().map(|&l| if l { w_pos } else { w_neg }).collect();
        let total_weight: f64 = sample_weight.iter().sum::<f64>().max(f64::EPSILON);

        for _ in 0..self.config.epochs {
            let mut grad_w = vec![0.0; n_features];
            let mut grad_b = 0.0;

            for ((z, &label), &sw) in rows.iter().zip(y).zip(&sample_weight) {
                let target = if label { 1.0 } else { 0.0 };
                // d(log loss)/dz = p - y
                let err = sw * (self.score(z) - target);
                for (g, xi) in grad_w.iter_mut().zip(z) {
                    *g += err * xi;
                }
                grad_b += err;
            }

            for (w, g) in self.weights.iter_mut().zip(&grad_w) {
                *w -= self.config.learning_rate * (g / total_weight + self.config.l2 * *w);
            }
            self.bias -= self.config.learning_rate * grad_b / total_weight;
        }

        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> RiskResult<Vec<f64>> {
        check_predict_input(&x, self.n_features())?;

        Ok(x.rows()
            .into_iter()
            .map(|r| self.score(&self.standardize(&r.to_vec())))
            .collect())
    }

    fn n_features(&self) -> Option<usize> {
        self.fitted.then_some(self.weights.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::error::RiskError;
    use ndarray::array;

    #[test]
    fn test_separates_linear_data() {
        let x = array![[0.0, 1.0], [1.0, 1.0], [2.0, 1.0], [8.0, 1.0], [9.0, 1.0], [10.0, 1.0]];
        let y = [false, false, false, true, true, true];
        let mut model = LogisticRegression::new(LogisticConfig::default());

        model.fit(x.view(), &y).unwrap();
        let probs = model.predict_proba(x.view()).unwrap();

        assert!(probs[0] < 0.5);
        assert!(probs[5] > 0.5);
        assert!(model.coefficients()[0] > 0.0);
        // Constant column carries no signal
        assert_eq!(model.coefficients()[1], 0.0);
    }

    #[test]
    fn test_rejects_non_finite_rows() {
        let x = array![[0.0], [1.0], [9.0], [10.0]];
        let y = [false, false, true, true];
        let mut model = LogisticRegression::new(LogisticConfig::default());
        model.fit(x.view(), &y).unwrap();

        let bad = array![[5.0], [f64::NAN]];
        assert!(matches!(
            model.predict_proba(bad.view()),
            Err(RiskError::Schema(msg)) if msg.contains("row 1")
        ));
        let inf = array![[f64::INFINITY]];
        assert!(model.predict_proba(inf.view()).is_err());
    }

    #[test]
    fn test_unfitted_reports_no_width() {
        let model = LogisticRegression::new(LogisticConfig::default());
        assert_eq!(model.n_features(), None);
    }
}
