//! Dataset Module - Labeled training data
//!
//! Feature rows joined with the `is_rescue_needed` outcome. The label never
//! lives among the feature columns; it is a separate vector aligned by row.
//! Rows are strictly chronological, which the chronological split relies on.

pub mod record;
pub mod io;

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::constants::LABEL_COLUMN;
use crate::logic::error::{RiskError, RiskResult};
use crate::logic::features::{FeatureFrame, FeatureRow};

pub use io::{
    default_dataset_dir, list_dataset_files, read_dataset_dir, read_jsonl, write_jsonl, DatasetWriter,
};
pub use record::LabeledRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    features: FeatureFrame,
    labels: Vec<bool>,
}

impl LabeledDataset {
    pub fn new(features: FeatureFrame, labels: Vec<bool>) -> RiskResult<Self> {
        if features.len() != labels.len() {
            return Err(RiskError::Schema(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if features.column_index(LABEL_COLUMN).is_some() {
            return Err(RiskError::Schema(format!(
                "label column '{}' must not be a feature column",
                LABEL_COLUMN
            )));
        }
        if let Some(pair) = features.rows().windows(2).find(|p| p[0].timestamp >= p[1].timestamp) {
            return Err(RiskError::Schema(format!(
                "rows out of chronological order at {}",
                pair[1].timestamp
            )));
        }

        Ok(Self { features, labels })
    }

    /// Split a table whose columns include `label_column` into features and labels.
    ///
    /// Label cells must be 0 or 1.
    pub fn from_table(
        columns: Vec<String>,
        rows: Vec<FeatureRow>,
        label_column: &str,
    ) -> RiskResult<Self> {
        let label_idx = columns
            .iter()
            .position(|c| c == label_column)
            .ok_or_else(|| RiskError::MissingLabel(label_column.to_string()))?;

        let mut feature_columns = columns;
        feature_columns.remove(label_idx);

        let mut labels = Vec::with_capacity(rows.len());
        let mut feature_rows = Vec::with_capacity(rows.len());
        for mut row in rows {
            if row.values.len() != feature_columns.len() + 1 {
                return Err(RiskError::Schema(format!(
                    "row at {} has {} values for {} columns",
                    row.timestamp,
                    row.values.len(),
                    feature_columns.len() + 1
                )));
            }
            let label = row.values.remove(label_idx);
            labels.push(parse_label(label, row.timestamp)?);
            feature_rows.push(row);
        }

        Self::new(FeatureFrame::new(feature_columns, feature_rows)?, labels)
    }

    /// Build from stored records. Every record must carry a label and share one column list.
    pub fn from_records(records: &[LabeledRecord]) -> RiskResult<Self> {
        let Some(first) = records.first() else {
            return Err(RiskError::InsufficientData("no labeled records".into()));
        };
        let columns = first.resolve_columns().ok_or_else(|| {
            RiskError::Schema(format!("unknown feature layout {:08x}", first.layout_hash))
        })?;

        let mut rows = Vec::with_capacity(records.len());
        let mut labels = Vec::with_capacity(records.len());
        for record in records {
            let label = record
                .is_rescue_needed
                .ok_or_else(|| RiskError::MissingLabel(format!("{} at {}", LABEL_COLUMN, record.timestamp)))?;
            if record.resolve_columns().as_deref() != Some(columns.as_slice()) {
                return Err(RiskError::Schema(format!(
                    "record at {} uses a different feature layout",
                    record.timestamp
                )));
            }
            rows.push(record.to_row());
            labels.push(label);
        }

        Self::new(FeatureFrame::new(columns, rows)?, labels)
    }

    /// Inner join of engineered rows with timestamped outcomes.
    ///
    /// Rows without an outcome are dropped.
    pub fn join_labels(
        features: &FeatureFrame,
        outcomes: &[(DateTime<Utc>, bool)],
    ) -> RiskResult<Self> {
        let by_time: HashMap<DateTime<Utc>, bool> = outcomes.iter().copied().collect();

        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for row in features.rows() {
            if let Some(label) = by_time.get(&row.timestamp) {
                rows.push(row.clone());
                labels.push(*label);
            }
        }

        if rows.is_empty() {
            return Err(RiskError::InsufficientData(
                "no feature rows matched a labeled timestamp".into(),
            ));
        }
        log::debug!(
            "Joined {} of {} feature rows with outcomes",
            rows.len(),
            features.len()
        );

        Self::new(FeatureFrame::new(features.columns().to_vec(), rows)?, labels)
    }

    pub fn features(&self) -> &FeatureFrame {
        &self.features
    }

    pub fn labels(&self) -> &[bool] {
        &self.labels
    }

    pub fn columns(&self) -> &[String] {
        self.features.columns()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|l| **l).count()
    }

    /// Index of the first test row: `floor(n * (1 - test_fraction))`
    pub fn split_index(&self, test_fraction: f64) -> usize {
        let n = self.len();
        let fraction = test_fraction.clamp(0.0, 1.0);
        // Guard against 1000 * 0.8 landing at 799.999..
        ((n as f64 * (1.0 - fraction) + 1e-9).floor() as usize).min(n)
    }

    /// Earliest rows for training, latest rows for testing. Never shuffled.
    pub fn chronological_split(&self, test_fraction: f64) -> (Self, Self) {
        let cut = self.split_index(test_fraction);
        let n = self.len();
        (
            Self {
                features: self.features.slice(0..cut),
                labels: self.labels[..cut].to_vec(),
            },
            Self {
                features: self.features.slice(cut..n),
                labels: self.labels[cut..].to_vec(),
            },
        )
    }

    pub fn to_records(&self) -> Vec<LabeledRecord> {
        let current = self.features.is_current_layout();
        self.features
            .rows()
            .iter()
            .zip(&self.labels)
            .map(|(row, label)| {
                let record = LabeledRecord::from_row(row, Some(*label));
                if current {
                    record
                } else {
                    record.with_columns(self.features.columns())
                }
            })
            .collect()
    }
}

fn parse_label(value: f64, at: DateTime<Utc>) -> RiskResult<bool> {
    if value == 1.0 {
        Ok(true)
    } else if value == 0.0 {
        Ok(false)
    } else {
        Err(RiskError::Schema(format!("label {} at {} is not 0 or 1", value, at)))
    }
}
