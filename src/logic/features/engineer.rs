//! Feature Engineering
//!
//! Turns a preprocessed `TimeSeriesFrame` into rows following `FEATURE_LAYOUT`.
//! The first `WARMUP_TICKS` ticks are never emitted: their lag and rolling
//! windows are incomplete.

use serde::{Deserialize, Serialize};

use super::calendar::CalendarFeatures;
use super::layout::{self, FEATURE_COUNT};
use super::vector::{FeatureFrame, FeatureRow};
use super::window::{lag, rolling};
use crate::constants::{self, COLLATERAL_COLUMN, DEBT_COLUMN, WARMUP_TICKS};
use crate::logic::error::{RiskError, RiskResult};
use crate::logic::ingest::TimeSeriesFrame;

const SHORT_LAG: usize = 1;
const LONG_LAG: usize = 7;
const ROLLING_WINDOW: usize = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Added to debt before dividing
    pub ratio_epsilon: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            ratio_epsilon: constants::RATIO_EPSILON,
        }
    }
}

/// Derive features with the default configuration
pub fn engineer_features(frame: &TimeSeriesFrame) -> RiskResult<FeatureFrame> {
    FeatureEngineer::default().engineer(frame)
}

#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn engineer(&self, frame: &TimeSeriesFrame) -> RiskResult<FeatureFrame> {
        let collateral: Vec<f64> = frame
            .column(COLLATERAL_COLUMN)
            .ok_or_else(|| RiskError::MissingColumn(COLLATERAL_COLUMN.to_string()))?
            .to_vec();
        let debt: Vec<f64> = frame
            .column(DEBT_COLUMN)
            .ok_or_else(|| RiskError::MissingColumn(DEBT_COLUMN.to_string()))?
            .to_vec();

        let collateral_flags = flags_as_f64(frame, COLLATERAL_COLUMN);
        let debt_flags = flags_as_f64(frame, DEBT_COLUMN);
        let ratio = self.collateral_to_debt_ratio(&collateral, &debt);

        let mut rows = Vec::with_capacity(frame.len().saturating_sub(WARMUP_TICKS));

        for (i, &timestamp) in frame.timestamps().iter().enumerate().skip(WARMUP_TICKS) {
            let (Some(c1), Some(d1), Some(c7), Some(d7)) = (
                lag(&collateral, i, SHORT_LAG),
                lag(&debt, i, SHORT_LAG),
                lag(&collateral, i, LONG_LAG),
                lag(&debt, i, LONG_LAG),
            ) else {
                continue;
            };
            let (Some(c_roll), Some(d_roll)) = (
                rolling(&collateral, i, ROLLING_WINDOW),
                rolling(&debt, i, ROLLING_WINDOW),
            ) else {
                continue;
            };

            let mut values = Vec::with_capacity(FEATURE_COUNT);
            values.extend_from_slice(&[
                collateral[i],
                debt[i],
                collateral_flags[i],
                debt_flags[i],
                c1,
                d1,
                c7,
                d7,
                c_roll.mean,
                c_roll.std,
                d_roll.mean,
                d_roll.std,
            ]);
            values.extend_from_slice(&CalendarFeatures::from_timestamp(timestamp).to_array());
            values.push(ratio[i]);

            rows.push(FeatureRow::new(timestamp, values));
        }

        log::debug!(
            "Engineered {} feature rows from {} ticks ({} warm-up ticks dropped)",
            rows.len(),
            frame.len(),
            frame.len() - rows.len()
        );

        FeatureFrame::new(layout::layout_columns(), rows)
    }

    /// `collateral / (debt + ε)`; non-finite results take the finite mean
    pub fn collateral_to_debt_ratio(&self, collateral: &[f64], debt: &[f64]) -> Vec<f64> {
        let mut ratio: Vec<f64> = collateral
            .iter()
            .zip(debt)
            .map(|(c, d)| c / (d + self.config.ratio_epsilon))
            .collect();

        let finite: Vec<f64> = ratio.iter().copied().filter(|r| r.is_finite()).collect();
        let fill = if finite.is_empty() {
            0.0
        } else {
            finite.iter().sum::<f64>() / finite.len() as f64
        };

        for r in ratio.iter_mut().filter(|r| !r.is_finite()) {
            *r = fill;
        }
        ratio
    }
}

fn flags_as_f64(frame: &TimeSeriesFrame, name: &str) -> Vec<f64> {
    frame
        .outlier_flags(name)
        .map(|flags| flags.iter().map(|f| if *f { 1.0 } else { 0.0 }).collect())
        .unwrap_or_else(|| vec![0.0; frame.len()])
}
