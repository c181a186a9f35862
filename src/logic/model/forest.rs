//! Random Forest
//!
//! Bagged CART trees with per-split feature sampling (`sqrt(n_features)` by
//! default) and balanced class weights. Tree `t` draws from its own
//! `StdRng` seeded with `seed + t`, so a fit is reproducible end to end.

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::classifier::{balanced_weights, check_fit_input, check_predict_input, Classifier};
use super::tree::{DecisionTree, TreeConfig};
use crate::constants;
use crate::logic::error::RiskResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features per split, `None` for `floor(sqrt(n_features))`
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    /// Weight classes by `n / (2 * n_class)`
    pub balanced: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: constants::DEFAULT_N_ESTIMATORS,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            balanced: true,
            seed: constants::DEFAULT_RANDOM_SEED,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    n_features: Option<usize>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_features: None,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn tree_config(&self, n_features: usize) -> TreeConfig {
        let sqrt = ((n_features as f64).sqrt().floor() as usize).max(1);
        TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            max_features: Some(self.config.max_features.unwrap_or(sqrt)),
        }
    }
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[bool]) -> RiskResult<()> {
        check_fit_input(&x, y)?;

        let n = x.nrows();
        let (w_neg, w_pos) = if self.config.balanced {
            balanced_weights(y)
        } else {
            (1.0, 1.0)
        };
        let class_weight: Vec<f64> = y.iter().map(|&l| if l { w_pos } else { w_neg }).collect();
        let tree_config = self.tree_config(x.ncols());

        let mut trees = Vec::with_capacity(self.config.n_estimators.max(1));
        for t in 0..self.config.n_estimators.max(1) {
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(t as u64));

            let weights: Vec<f64> = if self.config.bootstrap {
                let mut counts = vec![0u32; n];
                for _ in 0..n {
                    counts[rng.gen_range(0..n)] += 1;
                }
                counts
                    .iter()
                    .zip(&class_weight)
                    .map(|(&c, &w)| c as f64 * w)
                    .collect()
            } else {
                class_weight.clone()
            };

            let mut tree = DecisionTree::new(tree_config.clone());
            tree.fit_weighted(x.view(), y, &weights, &mut rng);
            trees.push(tree);
        }

        self.trees = trees;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> RiskResult<Vec<f64>> {
        check_predict_input(&x, self.n_features)?;

        let n_trees = self.trees.len().max(1) as f64;
        let probabilities = x
            .rows()
            .into_iter()
            .map(|row| {
                let row = row.to_vec();
                let sum: f64 = self.trees.iter().map(|t| t.predict_row(&row)).sum();
                (sum / n_trees).clamp(0.0, 1.0)
            })
            .collect();

        Ok(probabilities)
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }
}
