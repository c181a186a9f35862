//! CART decision tree (weighted Gini)
//!
//! Building block of the random forest. Leaves store the weighted share of
//! positive samples that reached them, so a single tree already emits a
//! probability.

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split, `None` for all
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Weighted class totals of a node
#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    pos: f64,
    neg: f64,
}

impl Totals {
    fn add(&mut self, label: bool, weight: f64) {
        if label {
            self.pos += weight;
        } else {
            self.neg += weight;
        }
    }

    fn weight(&self) -> f64 {
        self.pos + self.neg
    }

    fn gini(&self) -> f64 {
        let w = self.weight();
        if w <= 0.0 {
            return 0.0;
        }
        let p = self.pos / w;
        let q = self.neg / w;
        1.0 - p * p - q * q
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    nodes: Vec<Node>,
    n_features: Option<usize>,
}

impl DecisionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            n_features: None,
        }
    }

    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], i: usize) -> usize {
            match &nodes[i] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Fit on the rows with positive `weights`. Callers validate shapes.
    pub fn fit_weighted(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: &[bool],
        weights: &[f64],
        rng: &mut StdRng,
    ) {
        self.nodes.clear();
        self.n_features = Some(x.ncols());

        let indices: Vec<usize> = (0..x.nrows()).filter(|&i| weights[i] > 0.0).collect();
        if indices.is_empty() {
            self.nodes.push(Node::Leaf { value: 0.0 });
            return;
        }
        self.build(&x, y, weights, indices, 0, rng);
    }

    /// P(positive) for one row
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut i = 0;
        loop {
            match self.nodes.get(i) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split { feature, threshold, left, right }) => {
                    i = if row[*feature] <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    fn build(
        &mut self,
        x: &ArrayView2<'_, f64>,
        y: &[bool],
        weights: &[f64],
        indices: Vec<usize>,
        depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let mut totals = Totals::default();
        for &i in &indices {
            totals.add(y[i], weights[i]);
        }

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: leaf_value(&totals, &indices, y),
        });

        let depth_reached = self.config.max_depth.map_or(false, |d| depth >= d);
        let pure = totals.pos <= 0.0 || totals.neg <= 0.0;
        if depth_reached || pure || indices.len() < self.config.min_samples_split.max(2) {
            return id;
        }

        let Some(best) = self.best_split(x, y, weights, &indices, &totals, rng) else {
            return id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[[i, best.feature]] <= best.threshold);

        let left = self.build(x, y, weights, left_idx, depth + 1, rng);
        let right = self.build(x, y, weights, right_idx, depth + 1, rng);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    fn best_split(
        &self,
        x: &ArrayView2<'_, f64>,
        y: &[bool],
        weights: &[f64],
        indices: &[usize],
        totals: &Totals,
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let n_features = x.ncols();
        if n_features == 0 {
            return None;
        }
        let k = self
            .config
            .max_features
            .unwrap_or(n_features)
            .clamp(1, n_features);
        let candidates = rand::seq::index::sample(rng, n_features, k).into_vec();

        let min_leaf = self.config.min_samples_leaf.max(1);
        let mut best: Option<BestSplit> = None;
        let mut order = indices.to_vec();

        for feature in candidates {
            order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

            let mut left = Totals::default();
            for pos in 0..order.len() - 1 {
                let i = order[pos];
                left.add(y[i], weights[i]);

                let here = x[[i, feature]];
                let next = x[[order[pos + 1], feature]];
                if here >= next {
                    continue;
                }
                let n_left = pos + 1;
                if n_left < min_leaf || order.len() - n_left < min_leaf {
                    continue;
                }

                let right = Totals {
                    pos: totals.pos - left.pos,
                    neg: totals.neg - left.neg,
                };
                let impurity = left.weight() * left.gini() + right.weight() * right.gini();

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    let mut threshold = here + (next - here) / 2.0;
                    // Midpoint can round up to `next`
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }
}

fn leaf_value(totals: &Totals, indices: &[usize], y: &[bool]) -> f64 {
    let w = totals.weight();
    if w > 0.0 {
        totals.pos / w
    } else {
        indices.iter().filter(|&&i| y[i]).count() as f64 / indices.len().max(1) as f64
    }
}
