//! Dynamic Threshold Configuration
//!
//! Converts a rescue probability into alert / no-alert. The cut-off is
//! recomputed from the most recent (score, outcome) pairs:
//! - at least one rescue in the window → lower percentile (catch more)
//! - no rescue in the window → upper percentile (stay quiet)
//! - empty window → configured initial value

use serde::{Deserialize, Serialize};

use super::buffer::{BufferStatus, RollingWindow};
use crate::constants;
use crate::logic::error::{RiskError, RiskResult};

/// Threshold Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Threshold before any outcome is reported (0.0 - 1.0)
    pub initial_threshold: f64,

    /// Number of recent (score, outcome) pairs kept
    pub window_size: usize,

    /// Percentile used when the window holds a rescue
    pub positive_percentile: f64,

    /// Percentile used when the window holds none
    pub quiet_percentile: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            initial_threshold: constants::DEFAULT_INITIAL_THRESHOLD,
            window_size: constants::DEFAULT_THRESHOLD_WINDOW,
            positive_percentile: constants::DEFAULT_POSITIVE_PERCENTILE,
            quiet_percentile: constants::DEFAULT_QUIET_PERCENTILE,
        }
    }
}

impl ThresholdConfig {
    pub fn new(initial: f64) -> Self {
        Self {
            initial_threshold: initial,
            ..Default::default()
        }
    }

    /// Defaults with `RESCUE_INITIAL_THRESHOLD` / `RESCUE_THRESHOLD_WINDOW` applied
    pub fn from_env() -> Self {
        Self {
            initial_threshold: constants::get_initial_threshold(),
            window_size: constants::get_threshold_window(),
            ..Default::default()
        }
    }
}

/// Percentile with linear interpolation between closest ranks.
///
/// `p` is in [0, 100]; `None` for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Dynamic Threshold - Adjusts based on reported outcomes
#[derive(Debug, Clone)]
pub struct DynamicThreshold {
    config: ThresholdConfig,
    scores: RollingWindow<f64>,
    outcomes: RollingWindow<bool>,
    current_threshold: f64,
    updates: u64,
}

impl DynamicThreshold {
    pub fn new(config: ThresholdConfig) -> Self {
        let initial = config.initial_threshold;
        Self {
            scores: RollingWindow::new(config.window_size),
            outcomes: RollingWindow::new(config.window_size),
            config,
            current_threshold: initial,
            updates: 0,
        }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Append observed pairs and recompute. Returns the new threshold.
    ///
    /// Mismatched lengths or non-finite scores leave the state untouched.
    pub fn update(&mut self, scores: &[f64], outcomes: &[bool]) -> RiskResult<f64> {
        if scores.len() != outcomes.len() {
            return Err(RiskError::ShapeMismatch {
                scores: scores.len(),
                outcomes: outcomes.len(),
            });
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(RiskError::Schema(format!("score {} is not finite", bad)));
        }

        self.scores.extend(scores.iter().copied());
        self.outcomes.extend(outcomes.iter().copied());
        self.updates += 1;

        let previous = self.current_threshold;
        self.recalculate();

        if (self.current_threshold - previous).abs() > f64::EPSILON {
            log::info!(
                "Rescue threshold {:.4} -> {:.4} (window {}, positives {})",
                previous,
                self.current_threshold,
                self.scores.len(),
                self.positives()
            );
        }

        Ok(self.current_threshold)
    }

    fn recalculate(&mut self) {
        let window = self.scores.to_vec();
        let p = if self.positives() > 0 {
            self.config.positive_percentile
        } else {
            self.config.quiet_percentile
        };

        self.current_threshold = percentile(&window, p).unwrap_or(self.config.initial_threshold);
    }

    /// Get current threshold
    pub fn get_threshold(&self) -> f64 {
        self.current_threshold
    }

    /// Alert when the score reaches the threshold
    pub fn determine_action(&self, score: f64) -> bool {
        score >= self.current_threshold
    }

    fn positives(&self) -> usize {
        self.outcomes.iter().filter(|o| **o).count()
    }

    /// Clear history and return to the initial threshold
    pub fn reset(&mut self) {
        self.scores.clear();
        self.outcomes.clear();
        self.current_threshold = self.config.initial_threshold;
        self.updates = 0;
    }

    pub fn window_status(&self) -> BufferStatus {
        self.scores.status()
    }

    /// Get statistics
    pub fn stats(&self) -> ThresholdStats {
        let n = self.scores.len();
        let mean = if n > 0 {
            self.scores.iter().sum::<f64>() / n as f64
        } else {
            0.0
        };

        ThresholdStats {
            current: self.current_threshold,
            initial: self.config.initial_threshold,
            mean_score: mean,
            sample_count: n,
            positive_count: self.positives(),
            update_count: self.updates,
        }
    }
}

impl Default for DynamicThreshold {
    fn default() -> Self {
        Self::new(ThresholdConfig::default())
    }
}

/// Threshold statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStats {
    pub current: f64,
    pub initial: f64,
    pub mean_score: f64,
    pub sample_count: usize,
    pub positive_count: usize,
    pub update_count: u64,
}
